//! `Book.Chapter.Verse` references such as `Gen.1.1` or `1Sam.3.10`.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::canon::{find_book, BookSpec};
use crate::error::IngestError;

/// A single-verse reference. `book` is whatever the caller wrote until
/// [`VerseRef::resolve`] maps it onto a canonical book name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerseRef {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
}

impl VerseRef {
    /// Replace an abbreviation (or differently-cased name) with the canonical name.
    pub fn resolve(&self, books: &[BookSpec]) -> Result<VerseRef, IngestError> {
        let book = find_book(books, &self.book)
            .ok_or_else(|| IngestError::BookNotFound(self.book.clone()))?;
        Ok(VerseRef {
            book: book.name.clone(),
            ..self.clone()
        })
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.book, self.chapter, self.verse)
    }
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([1-3]?[A-Za-z]+)\.(\d{1,3})\.(\d{1,3})$").expect("Invalid reference pattern")
    })
}

impl FromStr for VerseRef {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<VerseRef, Self::Err> {
        let caps = reference_pattern()
            .captures(s.trim())
            .ok_or_else(|| invalid_reference(s))?;

        let number = |idx: usize| -> Result<u32, IngestError> {
            caps[idx].parse().map_err(|_| invalid_reference(s))
        };

        Ok(VerseRef {
            book: caps[1].to_string(),
            chapter: number(2)?,
            verse: number(3)?,
        })
    }
}

fn invalid_reference(s: &str) -> IngestError {
    IngestError::InvalidInput(format!(
        "invalid reference '{}'; use Book.Chapter.Verse (e.g. Gen.1.1)",
        s
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::hebrew_bible;

    #[test]
    fn test_parse() {
        vec![
            ("Gen.1.1", "Gen", 1, 1),
            ("1Sam.3.10", "1Sam", 3, 10),
            ("Psa.119.176", "Psa", 119, 176),
            ("Ruth.2.4", "Ruth", 2, 4),
            (" Mal.4.6 ", "Mal", 4, 6),
        ]
        .into_iter()
        .for_each(|(raw, book, chapter, verse)| {
            assert_eq!(
                raw.parse::<VerseRef>().unwrap(),
                VerseRef { book: book.to_string(), chapter, verse }
            );
        });
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for raw in ["Gen 1:1", "Gen.1", "Gen.1.1.1", "Song of Solomon.1.1", "Gen.x.1", ""] {
            let err = raw.parse::<VerseRef>().unwrap_err();
            assert!(matches!(err, IngestError::InvalidInput(_)), "{raw} parsed");
        }
    }

    #[test]
    fn test_resolve_abbreviation() {
        let books = hebrew_bible();
        let r: VerseRef = "1Sam.3.10".parse().unwrap();
        let resolved = r.resolve(&books).unwrap();
        assert_eq!(resolved.book, "1 Samuel");
        assert_eq!(resolved.to_string(), "1 Samuel.3.10");

        let r: VerseRef = "genesis.1.1".parse().unwrap();
        assert_eq!(r.resolve(&books).unwrap().book, "Genesis");
    }

    #[test]
    fn test_resolve_unknown_book() {
        let r: VerseRef = "Matt.1.1".parse().unwrap();
        match r.resolve(&hebrew_bible()) {
            Err(IngestError::BookNotFound(name)) => assert_eq!(name, "Matt"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
