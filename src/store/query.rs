//! Read side of the store: what the web layer asks for.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::canon::Testament;
use crate::db::Db;
use crate::error::{IngestError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBook {
    pub id: i64,
    pub name: String,
    pub testament: Testament,
    pub chapter_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredWord {
    pub position: u32,
    pub text: String,
    pub lemma: String,
    pub morph: String,
    pub gloss: String,
    pub strongs: String,
}

/// A verse with its words in position order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredVerse {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub words: Vec<StoredWord>,
}

impl FromSql for Testament {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: IngestError| FromSqlError::Other(Box::new(e)))
    }
}

/// Row totals across the three tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub books: i64,
    pub verses: i64,
    pub words: i64,
}

/// Load one verse by (book name, chapter, verse).
pub async fn get_verse(db: &Db, book_name: &str, chapter: u32, verse: u32) -> Result<StoredVerse> {
    let book_name = book_name.to_string();
    db.with_connection(move |conn| {
        let found = conn
            .query_row(
                r#"
                SELECT v.id, b.name, v.text
                FROM verses v
                JOIN books b ON b.id = v.book_id
                WHERE b.name = ?1 AND v.chapter = ?2 AND v.verse = ?3
                "#,
                params![book_name, chapter, verse],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        let (verse_id, book, text) = found.ok_or_else(|| {
            IngestError::VerseNotFound(format!("{} {}:{}", book_name, chapter, verse))
        })?;

        let mut stmt = conn.prepare(
            r#"
            SELECT position, text, lemma, morph, gloss, strongs
            FROM words
            WHERE verse_id = ?1
            ORDER BY position ASC
            "#,
        )?;
        let words = stmt
            .query_map(params![verse_id], |row| {
                Ok(StoredWord {
                    position: row.get(0)?,
                    text: row.get(1)?,
                    lemma: row.get(2)?,
                    morph: row.get(3)?,
                    gloss: row.get(4)?,
                    strongs: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        Ok(StoredVerse { book, chapter, verse, text, words })
    })
    .await
}

/// All stored books in insertion (canonical import) order.
pub async fn list_books(db: &Db) -> Result<Vec<StoredBook>> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, name, testament, chapter_count FROM books ORDER BY id ASC",
        )?;
        let books = stmt
            .query_map([], |row| {
                Ok(StoredBook {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    testament: row.get(2)?,
                    chapter_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(books)
    })
    .await
}

/// A book and its chapter numbers 1..=chapter_count, matched case-insensitively.
pub async fn book_chapters(db: &Db, book_name: &str) -> Result<(StoredBook, Vec<u32>)> {
    let book_name = book_name.to_string();
    db.with_connection(move |conn| {
        let book = conn
            .query_row(
                r#"
                SELECT id, name, testament, chapter_count
                FROM books
                WHERE name = ?1 COLLATE NOCASE
                "#,
                params![book_name],
                |row| {
                    Ok(StoredBook {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        testament: row.get(2)?,
                        chapter_count: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| IngestError::BookNotFound(book_name.clone()))?;

        let chapters = (1..=book.chapter_count).collect();
        Ok((book, chapters))
    })
    .await
}

pub async fn count_rows(db: &Db) -> Result<StoreCounts> {
    db.with_connection(|conn| {
        let count = |table: &str| -> Result<i64> {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            Ok(conn.query_row(&sql, [], |row| row.get(0))?)
        };
        Ok(StoreCounts {
            books: count("books")?,
            verses: count("verses")?,
            words: count("words")?,
        })
    })
    .await
}
