use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"(?u)\w+").expect("valid regex");
}

const ENGLISH_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","couldn",
    "d","did","didn","do","does","doesn","doing","don","down","during",
    "each","few","for","from","further",
    "had","hadn","has","hasn","have","haven","having","he","her","here","hers","herself","him","himself","his","how",
    "i","if","in","into","is","isn","it","its","itself",
    "just","ll","m","ma","me","mightn","more","most","mustn","my","myself",
    "needn","no","nor","not","now","o","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
    "re","s","same","shan","she","should","shouldn","so","some","such",
    "t","than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
    "under","until","up","ve","very",
    "was","wasn","we","were","weren","what","when","where","which","while","who","whom","why","will","with","won","wouldn",
    "y","you","your","yours","yourself","yourselves",
];

/// Settings that must be identical at index time and query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Reduce words to their English (Snowball) stem.
    pub stem: bool,
    /// Apply NFKC normalization before lowercasing.
    pub nfkc: bool,
    /// Additional stopwords on top of the built-in English list.
    pub extra_stopwords: Vec<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { stem: true, nfkc: true, extra_stopwords: Vec::new() }
    }
}

/// Turns raw text into index terms. Build once and share by reference.
pub struct Tokenizer {
    config: TokenizerConfig,
    stopwords: HashSet<String>,
    stemmer: Option<Stemmer>,
}

impl Default for Tokenizer {
    fn default() -> Self { Self::new(TokenizerConfig::default()) }
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        let stopwords = ENGLISH_STOPWORDS
            .iter()
            .map(|w| w.to_string())
            .chain(config.extra_stopwords.iter().map(|w| w.to_lowercase()))
            .collect();
        let stemmer = config.stem.then(|| Stemmer::create(Algorithm::English));
        Self { config, stopwords, stemmer }
    }

    pub fn config(&self) -> &TokenizerConfig { &self.config }

    pub fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    /// Lowercase, split into word units, keep purely alphanumeric units,
    /// drop stopwords and stem. Order and duplicates are preserved.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = if self.config.nfkc {
            text.nfkc().collect::<String>().to_lowercase()
        } else {
            text.to_lowercase()
        };
        WORD_RE
            .find_iter(&normalized)
            .map(|m| m.as_str())
            .filter(|unit| unit.chars().all(char::is_alphanumeric))
            .filter(|unit| !self.is_stopword(unit))
            .map(|unit| match &self.stemmer {
                Some(stemmer) => stemmer.stem(unit).into_owned(),
                None => unit.to_string(),
            })
            .collect()
    }

    /// Like [`Tokenizer::tokenize`] for raw bytes. Invalid UTF-8 yields no tokens.
    pub fn tokenize_bytes(&self, bytes: &[u8]) -> Vec<String> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.tokenize(text),
            Err(err) => {
                tracing::warn!(%err, "skipping input with invalid utf-8");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = Tokenizer::default().tokenize("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn positions_follow_surviving_tokens() {
        let t = Tokenizer::default().tokenize("The quick brown fox");
        assert_eq!(t, vec!["quick", "brown", "fox"]);
    }

    #[test]
    fn drops_units_with_underscores() {
        let t = Tokenizer::default().tokenize("snake_case word");
        assert_eq!(t, vec!["word"]);
    }

    #[test]
    fn extra_stopwords_are_case_insensitive() {
        let config = TokenizerConfig { extra_stopwords: vec!["Lorem".into()], ..Default::default() };
        let t = Tokenizer::new(config).tokenize("lorem ipsum");
        assert_eq!(t, vec!["ipsum"]);
    }

    #[test]
    fn stemming_can_be_disabled() {
        let config = TokenizerConfig { stem: false, ..Default::default() };
        let t = Tokenizer::new(config).tokenize("running dogs");
        assert_eq!(t, vec!["running", "dogs"]);
    }

    #[test]
    fn invalid_utf8_yields_nothing() {
        let t = Tokenizer::default().tokenize_bytes(&[0x66, 0x6f, 0xff, 0xfe]);
        assert!(t.is_empty());
    }
}
