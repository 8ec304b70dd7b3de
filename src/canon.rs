//! The canonical book list: every book the import knows how to fetch, in
//! canonical order, with its source file code and expected chapter count.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::IngestError;

/// Which half of the Bible a book belongs to. Stored as `OT` / `NT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Testament {
    #[serde(rename = "OT")]
    Old,
    #[serde(rename = "NT")]
    New,
}

impl Testament {
    pub fn as_str(&self) -> &'static str {
        match self {
            Testament::Old => "OT",
            Testament::New => "NT",
        }
    }
}

impl fmt::Display for Testament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Testament {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OT" => Ok(Testament::Old),
            "NT" => Ok(Testament::New),
            other => Err(IngestError::InvalidInput(format!("unknown testament '{}'", other))),
        }
    }
}

/// One entry of the canonical book table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSpec {
    /// Short reference abbreviation, e.g. `Gen`
    pub abbreviation: String,
    /// File stem on the remote source, e.g. `01-GEN`
    pub source_code: String,
    /// Canonical English name; the book's identity in the store
    pub name: String,
    pub testament: Testament,
    pub chapters: u32,
}

impl BookSpec {
    pub fn new(
        abbreviation: &str,
        source_code: &str,
        name: &str,
        testament: Testament,
        chapters: u32,
    ) -> Self {
        Self {
            abbreviation: abbreviation.to_string(),
            source_code: source_code.to_string(),
            name: name.to_string(),
            testament,
            chapters,
        }
    }
}

const HEBREW_BIBLE: [(&str, &str, &str, u32); 39] = [
    ("Gen", "01-GEN", "Genesis", 50),
    ("Exod", "02-EXO", "Exodus", 40),
    ("Lev", "03-LEV", "Leviticus", 27),
    ("Num", "04-NUM", "Numbers", 36),
    ("Deut", "05-DEU", "Deuteronomy", 34),
    ("Josh", "06-JOS", "Joshua", 24),
    ("Judg", "07-JDG", "Judges", 21),
    ("Ruth", "08-RUT", "Ruth", 4),
    ("1Sam", "09-1SA", "1 Samuel", 31),
    ("2Sam", "10-2SA", "2 Samuel", 24),
    ("1Kgs", "11-1KI", "1 Kings", 22),
    ("2Kgs", "12-2KI", "2 Kings", 25),
    ("1Chr", "13-1CH", "1 Chronicles", 29),
    ("2Chr", "14-2CH", "2 Chronicles", 36),
    ("Ezra", "15-EZR", "Ezra", 10),
    ("Neh", "16-NEH", "Nehemiah", 13),
    ("Esth", "17-EST", "Esther", 10),
    ("Job", "18-JOB", "Job", 42),
    ("Psa", "19-PSA", "Psalms", 150),
    ("Prov", "20-PRO", "Proverbs", 31),
    ("Eccles", "21-ECC", "Ecclesiastes", 12),
    ("Song", "22-SNG", "Song of Solomon", 8),
    ("Isa", "23-ISA", "Isaiah", 66),
    ("Jer", "24-JER", "Jeremiah", 52),
    ("Lam", "25-LAM", "Lamentations", 5),
    ("Ezek", "26-EZK", "Ezekiel", 48),
    ("Dan", "27-DAN", "Daniel", 12),
    ("Hos", "28-HOS", "Hosea", 14),
    ("Joel", "29-JOL", "Joel", 3),
    ("Amos", "30-AMO", "Amos", 9),
    ("Obad", "31-OBA", "Obadiah", 1),
    ("Jonah", "32-JON", "Jonah", 4),
    ("Mic", "33-MIC", "Micah", 7),
    ("Nahum", "34-NAM", "Nahum", 3),
    ("Hab", "35-HAB", "Habakkuk", 3),
    ("Zeph", "36-ZEP", "Zephaniah", 3),
    ("Hag", "37-HAG", "Haggai", 2),
    ("Zech", "38-ZEC", "Zechariah", 14),
    ("Mal", "39-MAL", "Malachi", 4),
];

/// The 39 books of the Hebrew Bible in canonical order.
pub fn hebrew_bible() -> Vec<BookSpec> {
    HEBREW_BIBLE
        .iter()
        .map(|(abbr, code, name, chapters)| BookSpec::new(abbr, code, name, Testament::Old, *chapters))
        .collect()
}

/// Find a book by canonical name or abbreviation, case-insensitively.
pub fn find_book<'a>(books: &'a [BookSpec], query: &str) -> Option<&'a BookSpec> {
    let query = query.trim();
    books.iter().find(|b| {
        b.name.eq_ignore_ascii_case(query) || b.abbreviation.eq_ignore_ascii_case(query)
    })
}

/// Restrict `books` to the requested names/abbreviations, keeping canonical order.
///
/// An empty selection means every book. Unknown names are an error so a typo
/// on the command line does not silently import nothing.
pub fn select_books(books: &[BookSpec], selection: &[String]) -> Result<Vec<BookSpec>, IngestError> {
    if selection.is_empty() {
        return Ok(books.to_vec());
    }

    let mut wanted = Vec::with_capacity(selection.len());
    for query in selection {
        let book = find_book(books, query)
            .ok_or_else(|| IngestError::BookNotFound(query.clone()))?;
        wanted.push(book.name.clone());
    }

    Ok(books
        .iter()
        .filter(|b| wanted.contains(&b.name))
        .cloned()
        .collect())
}
