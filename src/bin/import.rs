use clap::Parser;
use tanakh_ingest::Config;
use tanakh_ingest::canon::{hebrew_bible, select_books};
use tanakh_ingest::db::{Db, migrate};
use tanakh_ingest::fetch::HttpFetcher;
use tanakh_ingest::import::{ImportOptions, Importer};
use std::time::Duration;
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "tanakh-import")]
#[command(about = "Import the Hebrew Bible from USFM into the database (unchanged books are skipped)")]
struct Args {
    /// Import only this book (name or abbreviation); repeatable
    #[arg(short, long = "book")]
    books: Vec<String>,

    /// Re-write books even if the source document is unchanged
    #[arg(short, long)]
    force: bool,

    /// Books fetched and written at once (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Pause between books in milliseconds (overrides config)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.import.log_level.as_str())
    ).init();

    log::info!("Starting Hebrew Bible import");
    log::info!("Database path: {}", config.db_path().display());
    log::info!("Source: {}", config.source.base_url);

    let db = Db::new(config.db_path());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    log::info!("Database initialized");

    let books = select_books(&hebrew_bible(), &args.books)?;

    let mut options = ImportOptions::from_config(&config);
    options.force = args.force;
    if let Some(concurrency) = args.concurrency {
        anyhow::ensure!(concurrency >= 1, "--concurrency must be at least 1");
        options.concurrency = concurrency;
    }
    if let Some(delay_ms) = args.delay_ms {
        options.book_delay = Duration::from_millis(delay_ms);
    }

    let fetcher = HttpFetcher::new(&config.source)?;
    let importer = Importer::new(db, fetcher, options);
    let report = importer.run(&books).await?;

    report.log_summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
