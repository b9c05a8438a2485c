use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::{Matches, Regex};
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+(\.?\w+)*").expect("valid regex");
    static ref ENGLISH: Tokenizer = Tokenizer::english();
}

const ENGLISH_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","cannot","could",
    "did","do","does","doing","down","during",
    "each","few","for","from","further",
    "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
    "i","if","in","into","is","it","its","itself",
    "me","more","most","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","should","so","some","such",
    "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
    "under","until","up","very",
    "was","we","were","what","when","where","which","while","who","whom","why","with","would",
    "you","your","yours","yourself","yourselves",
];

/// Reduces a lowercase token to its canonical stem. `None` means the stemmer
/// could not handle the token; callers fall back to the token itself.
pub trait Stem: Send + Sync {
    fn stem(&self, token: &str) -> Option<String>;
}

pub struct SnowballStemmer(Stemmer);

impl SnowballStemmer {
    pub fn english() -> Self {
        Self(Stemmer::create(Algorithm::English))
    }
}

impl Stem for SnowballStemmer {
    fn stem(&self, token: &str) -> Option<String> {
        let stem = self.0.stem(token);
        if stem.is_empty() { None } else { Some(stem.into_owned()) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    pub fn english() -> Self {
        Self(ENGLISH_STOPWORDS.iter().map(|w| w.to_string()).collect())
    }

    /// One stop word per line; blank lines are ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading stop words from {}", path.display()))?;
        Ok(text.lines().collect())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for StopWords {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        )
    }
}

/// Word extraction, lowercasing, stop-word removal and stemming.
pub struct Tokenizer {
    stop_words: StopWords,
    stemmer: Box<dyn Stem>,
}

impl Tokenizer {
    pub fn new(stop_words: StopWords, stemmer: impl Stem + 'static) -> Self {
        Self { stop_words, stemmer: Box::new(stemmer) }
    }

    pub fn english() -> Self {
        Self::new(StopWords::english(), SnowballStemmer::english())
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    /// Stem a lowercase token, falling back to the token when stemming fails.
    pub fn stem(&self, token: &str) -> String {
        match self.stemmer.stem(token) {
            Some(stem) => stem,
            None => {
                tracing::warn!(token, "stemming failed, using token as its own stem");
                token.to_string()
            }
        }
    }

    /// Lazily yields `(stem, position)`; positions are 1-based and count
    /// retained tokens only.
    pub fn tokens<'t>(&'t self, text: &'t str) -> Tokens<'t> {
        Tokens { tokenizer: self, matches: WORD.find_iter(text), position: 0 }
    }

    /// Number of whitespace-separated query words that are not stop words,
    /// counted after the same NFKC normalization documents get.
    pub fn query_length(&self, query: &str) -> usize {
        let query: String = query.nfkc().collect();
        query
            .split_whitespace()
            .filter(|w| !self.stop_words.contains(&w.to_lowercase()))
            .count()
    }
}

pub struct Tokens<'t> {
    tokenizer: &'t Tokenizer,
    matches: Matches<'static, 't>,
    position: u32,
}

impl<'t> Iterator for Tokens<'t> {
    type Item = (String, u32);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let word = self.matches.next()?.as_str().to_lowercase();
            if self.tokenizer.stop_words.contains(&word) {
                continue;
            }
            self.position += 1;
            return Some((self.tokenizer.stem(&word), self.position));
        }
    }
}

/// Tokenize with the built-in English stop list and Snowball stemmer.
pub fn tokenize(text: &str) -> Vec<(String, u32)> {
    ENGLISH.tokens(text).collect()
}
