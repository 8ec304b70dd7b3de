//! Whole-canon import: fetch → segment → tokenize → upsert, book by book.
//!
//! Only a failed book upsert aborts the run. Fetch and parse failures skip
//! the book; a failed verse write marks it failed; either way the next book
//! is still imported.

use chrono::Utc;
use futures_util::{StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::canon::BookSpec;
use crate::config::Config;
use crate::db::Db;
use crate::error::{IngestError, Result};
use crate::fetch::BookFetcher;
use crate::store::{self, BookHandle, VerseInput};
use crate::usfm::{tokenize_verse, RegexTokenizer, SegmentedBook, Segmenter, WordTokenizer};

pub mod report;

pub use report::{BookReport, BookStatus, DropCounts, ImportReport, ImportTotals};

/// Knobs for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Re-write books even when the source document is unchanged
    pub force: bool,
    pub book_delay: Duration,
    pub concurrency: usize,
    pub max_retries: usize,
    pub retry_base_delay: Duration,
}

impl ImportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            force: false,
            book_delay: config.book_delay(),
            concurrency: config.import.concurrency.max(1),
            max_retries: config.source.max_retries,
            retry_base_delay: Duration::from_millis(config.source.retry_base_delay_ms),
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            force: false,
            book_delay: Duration::from_millis(500),
            concurrency: 1,
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

pub struct Importer<F: BookFetcher> {
    db: Db,
    fetcher: F,
    segmenter: Segmenter,
    tokenizer: Box<dyn WordTokenizer>,
    options: ImportOptions,
}

impl<F: BookFetcher> Importer<F> {
    pub fn new(db: Db, fetcher: F, options: ImportOptions) -> Self {
        Self {
            db,
            fetcher,
            segmenter: Segmenter::new(),
            tokenizer: Box::new(RegexTokenizer::new()),
            options,
        }
    }

    /// Swap the word-matching strategy.
    pub fn with_tokenizer(mut self, tokenizer: Box<dyn WordTokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Import `books` in order, at most `concurrency` at a time.
    ///
    /// Returns `Err` only when a book record cannot be upserted.
    pub async fn run(&self, books: &[BookSpec]) -> Result<ImportReport> {
        let started_at = Utc::now();
        let total = books.len();
        log::info!(
            "Importing {} book(s), {} at a time{}",
            total,
            self.options.concurrency,
            if self.options.force { " (forced)" } else { "" }
        );

        let reports: Vec<BookReport> = futures_util::stream::iter(books.iter().enumerate())
            .map(|(idx, book)| async move {
                let report = self.import_book(book, idx, total).await?;
                if idx + 1 < total && !self.options.book_delay.is_zero() {
                    tokio::time::sleep(self.options.book_delay).await;
                }
                Ok::<BookReport, IngestError>(report)
            })
            .buffered(self.options.concurrency.max(1))
            .try_collect()
            .await?;

        Ok(ImportReport {
            started_at,
            finished_at: Utc::now(),
            books: reports,
        })
    }

    async fn import_book(&self, book: &BookSpec, idx: usize, total: usize) -> Result<BookReport> {
        log::info!("[{}/{}] {} ({} chapters)", idx + 1, total, book.name, book.chapters);

        let handle = store::upsert_book(&self.db, book).await.map_err(|e| {
            log::error!("Cannot upsert book {}: {}", book.name, e);
            IngestError::Store {
                reference: book.name.clone(),
                source: Box::new(e),
            }
        })?;

        let mut report = BookReport::new(&book.name);

        let document = match self.fetch_with_retry(book).await {
            Ok(document) => document,
            Err(e) => {
                log::error!("✗ {}: {}; skipping to next book", book.name, e);
                report.status = BookStatus::Skipped { reason: e.to_string() };
                return Ok(report);
            }
        };

        let source_hash = compute_source_hash(&document, book.chapters);
        if !self.options.force && handle.source_hash.as_deref() == Some(source_hash.as_str()) {
            log::info!("{} unchanged since last import, nothing to write", book.name);
            report.status = BookStatus::Unchanged;
            return Ok(report);
        }

        let segmented = match self.segmenter.segment(&document) {
            Ok(segmented) => segmented,
            Err(e) => {
                log::error!("✗ {}: {}; skipping to next book", book.name, e);
                report.status = BookStatus::Skipped { reason: e.to_string() };
                return Ok(report);
            }
        };
        report.drops.absorb_segment_stats(&segmented.stats);
        log::debug!(
            "{}: {} verse(s) in {} chapter marker(s), {} verse marker(s), {} ignored line(s)",
            book.name,
            segmented.verse_count(),
            segmented.stats.chapter_markers,
            segmented.stats.verse_markers,
            segmented.stats.ignored_lines
        );

        for chapter in unexpected_chapters(&segmented, book.chapters) {
            log::warn!(
                "{} chapter {} is outside the expected 1..={}, not imported",
                book.name,
                chapter,
                book.chapters
            );
            report.drops.unexpected_chapters += 1;
        }

        if let Err(e) = store::clear_source_hash(&self.db, &handle).await {
            log::error!("✗ {}: cannot clear source hash: {}", book.name, e);
            report.status = BookStatus::Failed { reason: e.to_string() };
            return Ok(report);
        }

        for chapter in 1..=book.chapters {
            if let Err(e) = self.import_chapter(&handle, &segmented, chapter, &mut report).await {
                log::error!("✗ {}: {}; continuing with next book", book.name, e);
                report.status = BookStatus::Failed { reason: e.to_string() };
                return Ok(report);
            }
        }

        if let Err(e) = store::record_source_hash(&self.db, &handle, &source_hash).await {
            log::error!("✗ {}: cannot record source hash: {}", book.name, e);
            report.status = BookStatus::Failed { reason: e.to_string() };
            return Ok(report);
        }

        log::info!(
            "✓ {} ({} chapters, {} verses, {} words)",
            book.name,
            report.chapters,
            report.verses,
            report.words
        );
        Ok(report)
    }

    async fn import_chapter(
        &self,
        book: &BookHandle,
        segmented: &SegmentedBook,
        chapter: u32,
        report: &mut BookReport,
    ) -> Result<()> {
        let Some(verses) = segmented.chapters.get(&chapter) else {
            log::warn!("{} chapter {} not found in source, skipping", book.name, chapter);
            report.drops.missing_chapters += 1;
            return Ok(());
        };

        let mut inputs = Vec::with_capacity(verses.len());
        for (&verse, fragment) in verses {
            let content = tokenize_verse(self.tokenizer.as_ref(), fragment);
            report.drops.empty_tokens += content.dropped_empty;

            if content.is_empty() {
                log::warn!("{} {}:{} has no tagged words, not stored", book.name, chapter, verse);
                report.drops.zero_word_verses += 1;
                continue;
            }
            inputs.push(VerseInput { verse, content });
        }

        let writes = store::upsert_chapter(&self.db, book, chapter, inputs).await?;

        report.chapters += 1;
        report.verses += writes.len();
        report.words += writes.iter().map(|w| w.words).sum::<usize>();
        log::debug!("{} chapter {}: {} verse(s) written", book.name, chapter, writes.len());
        Ok(())
    }

    /// One fetch plus up to `max_retries` repeats for retryable failures,
    /// doubling the pause each time.
    async fn fetch_with_retry(&self, book: &BookSpec) -> Result<String> {
        let mut attempt = 0;
        let mut delay = self.options.retry_base_delay;

        loop {
            match self.fetcher.fetch(book).await {
                Ok(document) => return Ok(document),
                Err(e) if attempt < self.options.max_retries && e.is_retryable() => {
                    attempt += 1;
                    log::warn!(
                        "{}: retry {}/{} after error: {}",
                        book.name,
                        attempt,
                        self.options.max_retries,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// SHA-256 over a source document and the chapter count it was imported
/// against, hex encoded. Declaring more chapters changes the hash.
pub fn compute_source_hash(document: &str, chapters: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    hasher.update(chapters.to_be_bytes());
    format!("{:x}", hasher.finalize())
}

fn unexpected_chapters(segmented: &SegmentedBook, expected: u32) -> Vec<u32> {
    segmented
        .chapters
        .keys()
        .copied()
        .filter(|&c| c == 0 || c > expected)
        .collect()
}
