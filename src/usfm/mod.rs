//! USFM parsing: a book document is segmented into chapter/verse fragments,
//! and each fragment is tokenized into word records.

pub mod segmenter;
pub mod tokenizer;

pub use segmenter::{ChapterMap, SegmentStats, SegmentedBook, Segmenter};
pub use tokenizer::{
    prepare_words, tokenize_verse, RegexTokenizer, TaggedWord, TokenizedVerse, WordRecord,
    WordTokenizer,
};
