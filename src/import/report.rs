use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::usfm::SegmentStats;

/// How a single book's import ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BookStatus {
    /// Every declared chapter that the markup contained was written
    Imported,
    /// Source document identical to the last full import; nothing written
    Unchanged,
    /// Fetch or whole-document parse failed; nothing written
    Skipped { reason: String },
    /// A store write failed part-way; earlier verses are committed
    Failed { reason: String },
}

/// Everything that was dropped on the way from markup to store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    /// Declared chapters absent from the markup
    pub missing_chapters: usize,
    /// Chapters in the markup outside 1..=expected
    pub unexpected_chapters: usize,
    /// Verses whose fragment held no usable word
    pub zero_word_verses: usize,
    /// Tagged words with an empty surface
    pub empty_tokens: usize,
    pub ignored_lines: usize,
    pub empty_verses: usize,
    pub duplicate_verses: usize,
}

impl DropCounts {
    pub fn absorb_segment_stats(&mut self, stats: &SegmentStats) {
        self.ignored_lines += stats.ignored_lines;
        self.empty_verses += stats.empty_verses;
        self.duplicate_verses += stats.duplicate_verses;
    }

    pub fn add(&mut self, other: &DropCounts) {
        self.missing_chapters += other.missing_chapters;
        self.unexpected_chapters += other.unexpected_chapters;
        self.zero_word_verses += other.zero_word_verses;
        self.empty_tokens += other.empty_tokens;
        self.ignored_lines += other.ignored_lines;
        self.empty_verses += other.empty_verses;
        self.duplicate_verses += other.duplicate_verses;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookReport {
    pub name: String,
    #[serde(flatten)]
    pub status: BookStatus,
    pub chapters: usize,
    pub verses: usize,
    pub words: usize,
    pub drops: DropCounts,
}

impl BookReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: BookStatus::Imported,
            chapters: 0,
            verses: 0,
            words: 0,
            drops: DropCounts::default(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, BookStatus::Skipped { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportTotals {
    pub books: usize,
    pub chapters: usize,
    pub verses: usize,
    pub words: usize,
}

/// Outcome of one import run, books in canonical order.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub books: Vec<BookReport>,
}

impl ImportReport {
    /// Totals reduced from the per-book reports after all workers joined.
    pub fn totals(&self) -> ImportTotals {
        self.books.iter().fold(ImportTotals::default(), |mut acc, book| {
            acc.books += 1;
            acc.chapters += book.chapters;
            acc.verses += book.verses;
            acc.words += book.words;
            acc
        })
    }

    pub fn drops(&self) -> DropCounts {
        let mut total = DropCounts::default();
        for book in &self.books {
            total.add(&book.drops);
        }
        total
    }

    pub fn book(&self, name: &str) -> Option<&BookReport> {
        self.books.iter().find(|b| b.name == name)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &BookReport> {
        self.books.iter().filter(|b| b.is_skipped())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BookReport> {
        self.books
            .iter()
            .filter(|b| matches!(b.status, BookStatus::Failed { .. }))
    }

    pub fn count_status(&self, wanted: fn(&BookStatus) -> bool) -> usize {
        self.books.iter().filter(|b| wanted(&b.status)).count()
    }

    /// Write the end-of-run summary to the log.
    pub fn log_summary(&self) {
        let totals = self.totals();
        let drops = self.drops();
        let imported = self.count_status(|s| matches!(s, BookStatus::Imported));
        let unchanged = self.count_status(|s| matches!(s, BookStatus::Unchanged));

        log::info!("=== Import Complete ===");
        log::info!("Books: {} (imported: {}, unchanged: {}, skipped: {}, failed: {})",
            totals.books, imported, unchanged, self.skipped().count(), self.failed().count());
        log::info!("Chapters: {}", totals.chapters);
        log::info!("Verses: {}", totals.verses);
        log::info!("Words: {}", totals.words);
        log::info!("Time: {}s", (self.finished_at - self.started_at).num_seconds());

        if drops != DropCounts::default() {
            log::info!(
                "Dropped: missing chapters={}, unexpected chapters={}, zero-word verses={}, empty tokens={}, ignored lines={}, empty verses={}, duplicate verses={}",
                drops.missing_chapters,
                drops.unexpected_chapters,
                drops.zero_word_verses,
                drops.empty_tokens,
                drops.ignored_lines,
                drops.empty_verses,
                drops.duplicate_verses,
            );
        }

        for book in self.skipped().chain(self.failed()) {
            match &book.status {
                BookStatus::Skipped { reason } => log::warn!("Skipped {}: {}", book.name, reason),
                BookStatus::Failed { reason } => log::warn!("Failed {}: {}", book.name, reason),
                _ => {}
            }
        }
    }
}
