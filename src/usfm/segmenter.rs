use regex::Regex;
use std::collections::BTreeMap;

use crate::error::{IngestError, Result};

/// chapter → verse → raw fragment (word tags still embedded)
pub type ChapterMap = BTreeMap<u32, BTreeMap<u32, String>>;

/// Things the segmenter dropped or overrode while walking a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStats {
    pub chapter_markers: usize,
    pub verse_markers: usize,
    /// Markup lines inside an open verse that were neither text nor words
    pub ignored_lines: usize,
    /// Verse markers whose buffer was empty when flushed
    pub empty_verses: usize,
    /// Verse numbers seen twice in one chapter; the later fragment wins
    pub duplicate_verses: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentedBook {
    pub chapters: ChapterMap,
    pub stats: SegmentStats,
}

impl SegmentedBook {
    pub fn verse_count(&self) -> usize {
        self.chapters.values().map(|verses| verses.len()).sum()
    }
}

/// Splits a whole USFM book into chapter/verse fragments.
pub struct Segmenter {
    chapter: Regex,
    verse: Regex,
    markup: Regex,
    word_line: Regex,
}

/// Scan state for one document; lives only for one `segment` call.
#[derive(Default)]
struct ScanState {
    chapter: Option<u32>,
    verse: Option<u32>,
    buffer: String,
    book: SegmentedBook,
}

impl ScanState {
    fn flush(&mut self) {
        let (Some(chapter), Some(verse)) = (self.chapter, self.verse) else {
            self.buffer.clear();
            return;
        };

        let text = self.buffer.trim();
        if text.is_empty() {
            log::debug!("Dropping empty verse {}:{}", chapter, verse);
            self.book.stats.empty_verses += 1;
        } else {
            let verses = self.book.chapters.entry(chapter).or_default();
            if verses.insert(verse, text.to_string()).is_some() {
                log::warn!("Duplicate verse marker {}:{}, keeping the later one", chapter, verse);
                self.book.stats.duplicate_verses += 1;
            }
        }
        self.buffer.clear();
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            chapter: Regex::new(r"^\\c\s+(\d+)").expect("Invalid chapter pattern"),
            verse: Regex::new(r"^\\v\s+(\d+)\s*(.*)$").expect("Invalid verse pattern"),
            markup: Regex::new(r"^\\[a-z]").expect("Invalid markup pattern"),
            word_line: Regex::new(r"^\\w\s").expect("Invalid word line pattern"),
        }
    }

    /// Segment one book's markup.
    ///
    /// Only a chapter or verse number too large to represent fails the
    /// document; everything else unrecognized is dropped.
    pub fn segment(&self, document: &str) -> Result<SegmentedBook> {
        let mut state = ScanState::default();
        let document = document.strip_prefix('\u{feff}').unwrap_or(document);

        for (idx, raw_line) in document.split('\n').enumerate() {
            let line = raw_line.trim_end_matches('\r');

            if let Some(cap) = self.chapter.captures(line) {
                state.flush();
                state.verse = None;
                state.chapter = Some(parse_number(&cap[1], idx)?);
                state.book.stats.chapter_markers += 1;
                continue;
            }

            if let Some(cap) = self.verse.captures(line) {
                state.flush();
                state.verse = Some(parse_number(&cap[1], idx)?);
                state.buffer.push_str(&cap[2]);
                state.book.stats.verse_markers += 1;
                continue;
            }

            if state.chapter.is_none() || state.verse.is_none() {
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if !self.markup.is_match(line) || self.word_line.is_match(line) {
                state.buffer.push(' ');
                state.buffer.push_str(trimmed);
            } else {
                state.book.stats.ignored_lines += 1;
            }
        }

        state.flush();
        Ok(state.book)
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number(digits: &str, line_idx: usize) -> Result<u32> {
    digits.parse().map_err(|_| {
        IngestError::Parse(format!(
            "line {}: marker number '{}' is out of range",
            line_idx + 1,
            digits
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"\id GEN unfoldingWord Hebrew Bible
\h בְּרֵאשִׁית
\mt בְּרֵאשִׁית

\c 1
\p
\v 1 \w בְּ/רֵאשִׁ֖ית|lemma="רֵאשִׁית" strong="b:H7225" x-morph="He,R:Ncfsa"\w*
\w בָּרָ֣א|lemma="בָּרָא" strong="H1254a" x-morph="He,Vqp3ms"\w*
\w אֱלֹהִ֑ים|lemma="אֱלֹהִים" strong="H430" x-morph="He,Ncmpa"\w*׃
\v 2
\w וְ/הָ/אָ֗רֶץ|lemma="אֶרֶץ" strong="c:d:H776" x-morph="He,C:Td:Ncbsa"\w*
\f + \ft footnote line\f*
\c 2
\p
\v 1 \w וַ/יְכֻלּ֛וּ|lemma="כָּלָה" strong="c:H3615" x-morph="He,C:Vpw3mp"\w*
"#;

    #[test]
    fn test_chapters_and_verses() {
        let book = Segmenter::new().segment(SAMPLE).unwrap();

        assert_eq!(book.chapters.len(), 2);
        assert_eq!(book.chapters[&1].len(), 2);
        assert_eq!(book.chapters[&2].len(), 1);
        assert_eq!(book.verse_count(), 3);
        assert_eq!(book.stats.chapter_markers, 2);
        assert_eq!(book.stats.verse_markers, 3);

        let v1 = &book.chapters[&1][&1];
        assert!(v1.starts_with(r"\w בְּ/רֵאשִׁ֖ית"));
        assert!(v1.contains("בָּרָ֣א"));
        assert!(v1.contains("אֱלֹהִ֑ים"));
    }

    #[test]
    fn test_no_leak_across_chapter_boundary() {
        let book = Segmenter::new().segment(SAMPLE).unwrap();

        let last_of_ch1 = &book.chapters[&1][&2];
        assert!(last_of_ch1.contains("אָ֗רֶץ"));
        assert!(!last_of_ch1.contains("יְכֻלּ֛וּ"));
        assert!(book.chapters[&2][&1].contains("יְכֻלּ֛וּ"));
    }

    #[test]
    fn test_structural_lines_ignored() {
        let book = Segmenter::new().segment(SAMPLE).unwrap();

        // Only the footnote inside 1:2 counts; the "\p" lines sit between a
        // chapter marker and its first verse.
        assert_eq!(book.stats.ignored_lines, 1);
        assert!(!book.chapters[&1][&2].contains("footnote"));
    }

    #[test]
    fn test_plain_continuation_text_appended() {
        let doc = "\\c 3\n\\v 4 first part\nsecond part\n\\v 5 next\n";
        let book = Segmenter::new().segment(doc).unwrap();
        assert_eq!(book.chapters[&3][&4], "first part second part");
        assert_eq!(book.chapters[&3][&5], "next");
    }

    #[test]
    fn test_chapter_without_verses_has_no_entries() {
        let doc = "\\c 1\n\\p\n\\c 2\n\\v 1 text\n";
        let book = Segmenter::new().segment(doc).unwrap();

        assert!(!book.chapters.contains_key(&1));
        assert_eq!(book.chapters[&2][&1], "text");
        assert_eq!(book.stats.empty_verses, 0);
    }

    #[test]
    fn test_empty_verse_dropped_and_counted() {
        let doc = "\\c 1\n\\v 1\n\\p\n\\v 2 words\n";
        let book = Segmenter::new().segment(doc).unwrap();

        assert!(!book.chapters[&1].contains_key(&1));
        assert_eq!(book.chapters[&1][&2], "words");
        assert_eq!(book.stats.empty_verses, 1);
        assert_eq!(book.stats.ignored_lines, 1);
    }

    #[test]
    fn test_duplicate_verse_later_wins() {
        let doc = "\\c 1\n\\v 7 old\n\\v 7 new\n";
        let book = Segmenter::new().segment(doc).unwrap();
        assert_eq!(book.chapters[&1][&7], "new");
        assert_eq!(book.stats.duplicate_verses, 1);
    }

    #[test]
    fn test_text_before_first_chapter_ignored() {
        let doc = "\\v 1 orphan\n\\c 1\n\\v 1 kept\n";
        let book = Segmenter::new().segment(doc).unwrap();
        assert_eq!(book.verse_count(), 1);
        assert_eq!(book.chapters[&1][&1], "kept");
    }

    #[test]
    fn test_crlf_and_bom() {
        let doc = "\u{feff}\\c 1\r\n\\v 1 alpha\r\nbeta\r\n";
        let book = Segmenter::new().segment(doc).unwrap();
        assert_eq!(book.chapters[&1][&1], "alpha beta");
    }

    #[test]
    fn test_out_of_range_number_is_parse_error() {
        let doc = "\\c 99999999999\n\\v 1 x\n";
        let err = Segmenter::new().segment(doc).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_empty_document() {
        let book = Segmenter::new().segment("").unwrap();
        assert!(book.chapters.is_empty());
        assert_eq!(book.stats, SegmentStats::default());
    }
}
