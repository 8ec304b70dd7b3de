//! Store gateway: idempotent upserts of books, verses and words.
//!
//! A verse and its word set are always written in one transaction, so a
//! reader sees either the previous word set or the new one, never a mix.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::canon::BookSpec;
use crate::db::Db;
use crate::error::{IngestError, Result};
use crate::usfm::{TokenizedVerse, WordRecord};

pub mod query;

pub use query::{
    book_chapters, count_rows, get_verse, list_books, StoreCounts, StoredBook, StoredVerse,
    StoredWord,
};

/// Identity of a stored book, handed back by [`upsert_book`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookHandle {
    pub id: i64,
    pub name: String,
    /// Hash of the last document fully imported for this book
    pub source_hash: Option<String>,
}

/// Result of writing one verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseWrite {
    pub verse_id: i64,
    pub words: usize,
}

/// One verse of a chapter batch.
#[derive(Debug, Clone)]
pub struct VerseInput {
    pub verse: u32,
    pub content: TokenizedVerse,
}

/// Create the book, or update its testament and chapter count if it exists.
pub async fn upsert_book(db: &Db, book: &BookSpec) -> Result<BookHandle> {
    let name = book.name.clone();
    let testament = book.testament.as_str();
    let chapters = book.chapters;

    db.with_connection(move |conn| {
        conn.execute(
            r#"
            INSERT INTO books (name, testament, chapter_count, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(name) DO UPDATE SET
                testament = excluded.testament,
                chapter_count = excluded.chapter_count,
                updated_at = excluded.updated_at
            "#,
            params![name, testament, chapters, Utc::now().to_rfc3339()],
        )?;

        let (id, source_hash) = conn.query_row(
            "SELECT id, source_hash FROM books WHERE name = ?1",
            params![name],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?)),
        )?;

        Ok(BookHandle { id, name, source_hash })
    })
    .await
}

/// Remember which document a book was last fully imported from.
pub async fn record_source_hash(db: &Db, book: &BookHandle, hash: &str) -> Result<()> {
    set_source_hash(db, book.id, Some(hash.to_string())).await
}

/// Forget the stored hash; called before a book's verses are rewritten.
pub async fn clear_source_hash(db: &Db, book: &BookHandle) -> Result<()> {
    set_source_hash(db, book.id, None).await
}

async fn set_source_hash(db: &Db, book_id: i64, hash: Option<String>) -> Result<()> {
    db.with_connection(move |conn| {
        conn.execute(
            "UPDATE books SET source_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![hash, Utc::now().to_rfc3339(), book_id],
        )?;
        Ok(())
    })
    .await
}

/// Create or update a verse and replace its whole word set.
pub async fn upsert_verse(
    db: &Db,
    book: &BookHandle,
    chapter: u32,
    verse: u32,
    content: TokenizedVerse,
) -> Result<VerseWrite> {
    let book_id = book.id;
    db.with_connection(move |conn| write_verse(conn, book_id, chapter, verse, &content))
        .await
}

/// Write every verse of one chapter on a single connection.
///
/// Each verse still gets its own transaction; the first failure stops the
/// batch and is returned with the verse reference attached.
pub async fn upsert_chapter(
    db: &Db,
    book: &BookHandle,
    chapter: u32,
    verses: Vec<VerseInput>,
) -> Result<Vec<VerseWrite>> {
    let book_id = book.id;
    let book_name = book.name.clone();
    db.with_connection(move |conn| {
        let mut writes = Vec::with_capacity(verses.len());
        for input in &verses {
            let write = write_verse(conn, book_id, chapter, input.verse, &input.content)
                .map_err(|e| IngestError::Store {
                    reference: format!("{} {}:{}", book_name, chapter, input.verse),
                    source: Box::new(e),
                })?;
            writes.push(write);
        }
        Ok(writes)
    })
    .await
}

fn write_verse(
    conn: &mut Connection,
    book_id: i64,
    chapter: u32,
    verse: u32,
    content: &TokenizedVerse,
) -> Result<VerseWrite> {
    validate_words(&content.words)?;

    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    tx.execute(
        r#"
        INSERT INTO verses (book_id, chapter, verse, text, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(book_id, chapter, verse) DO UPDATE SET
            text = excluded.text,
            updated_at = excluded.updated_at
        "#,
        params![book_id, chapter, verse, content.text, now],
    )?;

    let verse_id: i64 = tx.query_row(
        "SELECT id FROM verses WHERE book_id = ?1 AND chapter = ?2 AND verse = ?3",
        params![book_id, chapter, verse],
        |row| row.get(0),
    )?;

    tx.execute("DELETE FROM words WHERE verse_id = ?1", params![verse_id])?;

    {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO words (verse_id, position, text, lemma, morph, gloss, strongs)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )?;
        for word in &content.words {
            stmt.execute(params![
                verse_id,
                word.position,
                word.text,
                word.lemma,
                word.morph,
                word.gloss,
                word.strongs,
            ])?;
        }
    }

    tx.commit()?;

    Ok(VerseWrite {
        verse_id,
        words: content.words.len(),
    })
}

/// Positions must run 1..N with no gaps and every word must have text.
fn validate_words(words: &[WordRecord]) -> Result<()> {
    for (idx, word) in words.iter().enumerate() {
        let expected = idx as u32 + 1;
        if word.position != expected {
            return Err(IngestError::InvalidInput(format!(
                "word position {} where {} was expected",
                word.position, expected
            )));
        }
        if word.text.trim().is_empty() {
            return Err(IngestError::InvalidInput(format!(
                "word at position {} has no text",
                word.position
            )));
        }
    }
    Ok(())
}
