use clap::Parser;
use serde::Serialize;
use tanakh_ingest::{Config, VerseRef};
use tanakh_ingest::canon::hebrew_bible;
use tanakh_ingest::db::Db;
use tanakh_ingest::store::{get_verse, StoredWord};
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "tanakh-verse")]
#[command(about = "Look up a stored verse by reference, e.g. Gen.1.1")]
struct Args {
    /// Book.Chapter.Verse
    reference: String,

    /// Print JSON instead of a word table
    #[arg(long)]
    json: bool,
}

/// Same shape the web layer's verse route returns.
#[derive(Serialize)]
struct VerseResponse<'a> {
    reference: &'a str,
    book: &'a str,
    chapter: u32,
    verse: u32,
    text: &'a str,
    words: &'a [StoredWord],
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "warn")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let reference: VerseRef = args.reference.parse()?;
    let resolved = reference.resolve(&hebrew_bible())?;
    log::debug!("{} -> {}", args.reference, resolved);

    let verse = get_verse(&db, &resolved.book, resolved.chapter, resolved.verse).await?;

    if args.json {
        let response = VerseResponse {
            reference: &args.reference,
            book: &verse.book,
            chapter: verse.chapter,
            verse: verse.verse,
            text: &verse.text,
            words: &verse.words,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{} {}:{}", verse.book, verse.chapter, verse.verse);
    println!("{}", verse.text);
    println!();
    for word in &verse.words {
        println!(
            "{:>3}  {:<20} {:<16} {:<10} {}",
            word.position, word.text, word.lemma, word.strongs, word.morph
        );
    }

    Ok(())
}
