use thiserror::Error;

/// Main error type for the ingestion pipeline
#[derive(Error, Debug)]
pub enum IngestError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema migration failures
    #[error("Migration error: {0}")]
    Migration(String),

    /// Remote source answered with a non-success status
    #[error("HTTP {status}: {url}")]
    Fetch { status: u16, url: String },

    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Whole-document markup failure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Book not present in the canon or the store
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// Verse not present in the store
    #[error("Verse not found: {0}")]
    VerseNotFound(String),

    /// A verse write failed; `reference` names the verse
    #[error("Failed to store {reference}: {source}")]
    Store {
        reference: String,
        #[source]
        source: Box<IngestError>,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl IngestError {
    /// Whether a fetch attempt that failed with this error is worth repeating.
    ///
    /// Transport failures, rate limiting and server errors are retryable;
    /// everything else (404 in particular) is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Network { .. } => true,
            IngestError::Fetch { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

/// Convenient Result type using IngestError
pub type Result<T> = std::result::Result<T, IngestError>;
