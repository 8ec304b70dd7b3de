use regex::Regex;

/// One `\w ...\w*` span as it appears in the markup, before positions are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaggedWord {
    pub text: String,
    pub lemma: String,
    pub strongs: String,
    pub morph: String,
}

/// A word ready for storage: non-empty text and a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordRecord {
    pub position: u32,
    pub text: String,
    pub lemma: String,
    pub morph: String,
    /// Always empty here; glosses are filled in by a separate process.
    pub gloss: String,
    pub strongs: String,
}

/// The storable form of one verse fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenizedVerse {
    /// Surface texts joined with single spaces, in position order
    pub text: String,
    pub words: Vec<WordRecord>,
    /// Tagged spans whose surface text was empty or whitespace
    pub dropped_empty: usize,
}

impl TokenizedVerse {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Strategy for pulling tagged words out of a raw verse fragment.
///
/// Implementations never fail: anything that is not a recognizable word span
/// is skipped, and unrecognizable attributes come back as empty strings.
pub trait WordTokenizer: Send + Sync {
    fn tokenize(&self, fragment: &str) -> Vec<TaggedWord>;
}

/// Regex-based tokenizer for `\w surface|key="value" ...\w*` spans.
pub struct RegexTokenizer {
    word: Regex,
    attribute: Regex,
}

impl RegexTokenizer {
    pub fn new() -> Self {
        Self {
            // The surface may carry nested character markers (`\+nd ...\+nd*`);
            // any other backslash ends it, so a span with no attribute list
            // cannot swallow the following span.
            word: Regex::new(r"\\w\s+((?:[^|\\]|\\\+[A-Za-z0-9]+\*?)+)(?:\|([^\\]*))?\\w\*")
                .expect("Invalid word pattern"),
            attribute: Regex::new(r#"([A-Za-z][A-Za-z0-9_-]*)\s*=\s*"([^"]*)""#)
                .expect("Invalid attribute pattern"),
        }
    }

    fn parse_attributes(&self, attributes: &str, word: &mut TaggedWord) {
        for cap in self.attribute.captures_iter(attributes) {
            let value = cap[2].trim().to_string();
            match &cap[1] {
                "lemma" => word.lemma = value,
                "strong" => word.strongs = value,
                "x-morph" => word.morph = value,
                _ => {}
            }
        }
    }
}

impl Default for RegexTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl WordTokenizer for RegexTokenizer {
    fn tokenize(&self, fragment: &str) -> Vec<TaggedWord> {
        self.word
            .captures_iter(fragment)
            .map(|cap| {
                let mut word = TaggedWord {
                    text: cap[1].trim().to_string(),
                    ..TaggedWord::default()
                };
                if let Some(attributes) = cap.get(2) {
                    self.parse_attributes(attributes.as_str(), &mut word);
                }
                word
            })
            .collect()
    }
}

/// Drop empty-surface words, number the survivors 1..N and rebuild the verse text.
pub fn prepare_words(tagged: Vec<TaggedWord>) -> TokenizedVerse {
    let mut verse = TokenizedVerse::default();

    for word in tagged {
        if word.text.trim().is_empty() {
            verse.dropped_empty += 1;
            continue;
        }

        if !verse.words.is_empty() {
            verse.text.push(' ');
        }
        verse.text.push_str(&word.text);

        verse.words.push(WordRecord {
            position: verse.words.len() as u32 + 1,
            text: word.text,
            lemma: word.lemma,
            morph: word.morph,
            gloss: String::new(),
            strongs: word.strongs,
        });
    }

    verse
}

/// Tokenize a fragment and prepare it for storage in one step.
pub fn tokenize_verse(tokenizer: &dyn WordTokenizer, fragment: &str) -> TokenizedVerse {
    prepare_words(tokenizer.tokenize(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEN_1_1_WORD: &str =
        r#"\w בְּרֵאשִׁית|lemma="רֵאשִׁית" strong="H7225" x-morph="HR/Ncfsa"\w*"#;

    #[test]
    fn test_single_word_verse() {
        let fragment = format!(r"\v 1 {}", GEN_1_1_WORD);
        let verse = tokenize_verse(&RegexTokenizer::new(), &fragment);

        assert_eq!(verse.words.len(), 1);
        let word = &verse.words[0];
        assert_eq!(word.text, "בְּרֵאשִׁית");
        assert_eq!(word.lemma, "רֵאשִׁית");
        assert_eq!(word.strongs, "H7225");
        assert_eq!(word.morph, "HR/Ncfsa");
        assert_eq!(word.gloss, "");
        assert_eq!(word.position, 1);
        assert_eq!(verse.text, "בְּרֵאשִׁית");
    }

    #[test]
    fn test_words_in_source_order_with_contiguous_positions() {
        let fragment = concat!(
            r#"\w וַיֹּ֣אמֶר|lemma="אָמַר" strong="c:H559" x-morph="He,C:Vqw3ms"\w* "#,
            r#"\w אֱלֹהִ֖ים|lemma="אֱלֹהִים" strong="H430" x-morph="He,Ncmpa"\w* "#,
            r#"\w יְהִ֣י|lemma="הָיָה" strong="H1961" x-morph="He,Vqj3ms"\w* "#,
            r#"\w א֑וֹר|lemma="אוֹר" strong="H216" x-morph="He,Ncbsa"\w*׃"#,
        );
        let verse = tokenize_verse(&RegexTokenizer::new(), fragment);

        let texts: Vec<_> = verse.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["וַיֹּ֣אמֶר", "אֱלֹהִ֖ים", "יְהִ֣י", "א֑וֹר"]);
        let positions: Vec<_> = verse.words.iter().map(|w| w.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert_eq!(verse.text, "וַיֹּ֣אמֶר אֱלֹהִ֖ים יְהִ֣י א֑וֹר");
        assert_eq!(verse.words[0].strongs, "c:H559");
    }

    #[test]
    fn test_missing_attributes_are_empty_strings() {
        let fragment = r#"\w הָאָרֶץ|lemma="אֶרֶץ"\w* \w וְ/אֵת|strong="H853"\w* \w תֹהוּ\w*"#;
        let words = RegexTokenizer::new().tokenize(fragment);

        assert_eq!(words.len(), 3);
        assert_eq!(words[0].lemma, "אֶרֶץ");
        assert_eq!(words[0].strongs, "");
        assert_eq!(words[0].morph, "");
        assert_eq!(words[1].text, "וְ/אֵת");
        assert_eq!(words[1].lemma, "");
        assert_eq!(words[1].strongs, "H853");
        assert_eq!(words[2].text, "תֹהוּ");
        assert_eq!(words[2], TaggedWord { text: "תֹהוּ".into(), ..TaggedWord::default() });
    }

    #[test]
    fn test_nested_character_marker_kept_in_surface() {
        let fragment = concat!(
            r#"\w אֱלֹהִ֑ים|lemma="אֱלֹהִים" strong="H430"\w* "#,
            r#"\w יְהוָ\+nd ה\+nd*|lemma="יהוה" strong="H3068"\w* "#,
            r#"\w אוֹר|lemma="אוֹר" strong="H216"\w*"#,
        );
        let verse = tokenize_verse(&RegexTokenizer::new(), fragment);

        assert_eq!(verse.words.len(), 3);
        assert_eq!(verse.words[1].text, r"יְהוָ\+nd ה\+nd*");
        assert_eq!(verse.words[1].lemma, "יהוה");
        assert_eq!(verse.words[1].strongs, "H3068");
        assert_eq!(verse.words[2].position, 3);
        assert_eq!(verse.words[2].strongs, "H216");
    }

    #[test]
    fn test_malformed_attribute_resolves_to_empty() {
        let fragment = r#"\w בָּרָא|lemma="בָּרָא strong=H1254 x-morph="HVqp3ms"\w*"#;
        let words = RegexTokenizer::new().tokenize(fragment);

        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "בָּרָא");
        assert_eq!(words[0].strongs, "");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let fragment = r#"\w אֵת|x-occurrence="1" lemma="אֵת" x-occurrences="2"\w*"#;
        let words = RegexTokenizer::new().tokenize(fragment);
        assert_eq!(words[0].lemma, "אֵת");
        assert_eq!(words[0].morph, "");
    }

    #[test]
    fn test_untagged_content_discarded() {
        let fragment = r#"\q1 ׃ \w מַיִם|lemma="מַיִם"\w* ׀ \f + \ft note\f* \p"#;
        let verse = tokenize_verse(&RegexTokenizer::new(), fragment);
        assert_eq!(verse.words.len(), 1);
        assert_eq!(verse.text, "מַיִם");
    }

    #[test]
    fn test_empty_surface_dropped_without_position_gap() {
        let tagged = vec![
            TaggedWord { text: "א".into(), ..TaggedWord::default() },
            TaggedWord { text: "   ".into(), lemma: "x".into(), ..TaggedWord::default() },
            TaggedWord { text: "ב".into(), ..TaggedWord::default() },
        ];
        let verse = prepare_words(tagged);

        assert_eq!(verse.dropped_empty, 1);
        let positions: Vec<_> = verse.words.iter().map(|w| w.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(verse.text, "א ב");
    }

    #[test]
    fn test_fragment_without_words() {
        let verse = tokenize_verse(&RegexTokenizer::new(), r"\p \q2 ׃");
        assert!(verse.is_empty());
        assert_eq!(verse.text, "");
    }
}
