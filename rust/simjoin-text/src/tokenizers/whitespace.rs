//! Whitespace Tokenizer - splits on Unicode whitespace only.

use std::str::SplitWhitespace;

use super::{DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH, Tokenizer, TokenizerKind, accept_term};

/// Splits values on Unicode whitespace and keeps punctuation attached to the tokens,
/// so `"St."` and `"St"` stay distinct.
pub struct WhitespaceTokenizer {
    max_term_length: usize,
    min_term_length: usize,
}

impl WhitespaceTokenizer {
    pub fn with_lengths(max_term_length: usize, min_term_length: usize) -> Self {
        Self {
            max_term_length,
            min_term_length,
        }
    }

    pub fn new() -> Self {
        Self::with_lengths(DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH)
    }
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WhitespaceTokenIterator<'a> {
    inner: SplitWhitespace<'a>,
    max_term_length: usize,
    min_term_length: usize,
}

impl<'a> Iterator for WhitespaceTokenIterator<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let (min, max) = (self.min_term_length, self.max_term_length);
        self.inner.by_ref().find_map(|term| accept_term(term, min, max))
    }
}

impl Tokenizer for WhitespaceTokenizer {
    type TokenIter<'a> = WhitespaceTokenIterator<'a>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        WhitespaceTokenIterator {
            inner: input.split_whitespace(),
            max_term_length: self.max_term_length,
            min_term_length: self.min_term_length,
        }
    }

    fn kind(&self) -> TokenizerKind {
        TokenizerKind::Whitespace
    }

    fn max_term_length(&self) -> usize {
        self.max_term_length
    }

    fn min_term_length(&self) -> usize {
        self.min_term_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokenizer() {
        let tokenizer = WhitespaceTokenizer::new();

        let terms: Vec<&str> = tokenizer.tokenize("  12 Main St.\tApt 4 ").collect();
        assert_eq!(terms, vec!["12", "Main", "St.", "Apt", "4"]);

        let terms: Vec<&str> = tokenizer.tokenize(" \n\t ").collect();
        assert!(terms.is_empty());
    }

    #[test]
    fn test_whitespace_min_length() {
        let tokenizer = WhitespaceTokenizer::with_lengths(128, 2);
        let terms: Vec<&str> = tokenizer.tokenize("a bb c dd").collect();
        assert_eq!(terms, vec!["bb", "dd"]);
    }
}
