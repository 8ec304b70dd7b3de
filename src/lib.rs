pub mod canon;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod import;
pub mod reference;
pub mod store;
pub mod usfm;

pub use config::Config;
pub use error::{IngestError, Result};
pub use import::{ImportOptions, ImportReport, Importer};
pub use reference::VerseRef;
