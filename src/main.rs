use tanakh_ingest::Config;
use tanakh_ingest::db::{Db, migrate};
use tanakh_ingest::error::IngestError;
use tanakh_ingest::store::count_rows;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "verify" => run_schema_verification().await?,
        other => {
            log::error!("Unknown command '{}'. Available: verify", other);
            std::process::exit(2);
        }
    }

    Ok(())
}

/// Apply migrations, check the schema and print row counts
async fn run_schema_verification() -> Result<()> {
    log::info!("Starting tanakh-ingest v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Source: {}", config.source.base_url);

    let db = Db::new(config.db_path());
    log::info!("Database path: {}", db.path().display());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    log::info!("Database initialized successfully");

    verify_database_schema(&db).await?;

    let counts = count_rows(&db).await?;
    println!("books:  {}", counts.books);
    println!("verses: {}", counts.verses);
    println!("words:  {}", counts.words);

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'index') ORDER BY name")?;
        let objects: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected = [
            "books",
            "verses",
            "words",
            "schema_migrations",
            "idx_verses_book_chapter",
            "idx_words_strongs",
            "idx_words_lemma",
        ];

        let missing: Vec<_> = expected
            .iter()
            .filter(|name| !objects.iter().any(|o| o == *name))
            .collect();

        for name in &missing {
            log::error!("Missing schema object: {}", name);
        }
        if !missing.is_empty() {
            return Err(IngestError::Migration("schema is incomplete".to_string()));
        }

        for name in &expected {
            log::debug!("✓ {}", name);
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::info!("Applied migrations: {:?}", applied);

        Ok(())
    }).await?;

    log::info!("Database schema verified");
    Ok(())
}
