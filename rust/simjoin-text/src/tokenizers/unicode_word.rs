//! Unicode Word Tokenizer - extracts alphanumeric words using Unicode properties.

use std::str::CharIndices;

use super::{DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH, Tokenizer, TokenizerKind, accept_term};

/// Word Tokenizer - extracts alphanumeric words from text.
///
/// Words are the longest continuous sequences of alphanumeric characters; everything
/// else separates them. Words longer than the maximum length are truncated at UTF-8
/// character boundaries, shorter than the minimum length are skipped.
pub struct UnicodeWordTokenizer {
    max_term_length: usize,
    min_term_length: usize,
}

impl UnicodeWordTokenizer {
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

impl Default for UnicodeWordTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator that yields word tokens from a string input.
pub struct WordTokenIterator<'a> {
    input: &'a str,
    char_indices: CharIndices<'a>,
    max_term_length: usize,
    min_term_length: usize,
}

impl<'a> WordTokenIterator<'a> {
    pub fn new(input: &'a str, max_term_length: usize, min_term_length: usize) -> Self {
        Self {
            input,
            char_indices: input.char_indices(),
            max_term_length,
            min_term_length,
        }
    }

    /// Byte range of the next alphanumeric run, if any.
    fn next_word(&mut self) -> Option<(usize, usize)> {
        let start = self
            .char_indices
            .by_ref()
            .find(|(_, ch)| ch.is_alphanumeric())
            .map(|(pos, _)| pos)?;
        let end = self
            .char_indices
            .by_ref()
            .find(|(_, ch)| !ch.is_alphanumeric())
            .map_or(self.input.len(), |(pos, _)| pos);
        Some((start, end))
    }
}

impl<'a> Iterator for WordTokenIterator<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((start, end)) = self.next_word() {
            let word = &self.input[start..end];
            if let Some(term) = accept_term(word, self.min_term_length, self.max_term_length) {
                return Some(term);
            }
        }
        None
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    type TokenIter<'a> = WordTokenIterator<'a>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        WordTokenIterator::new(input, self.max_term_length, self.min_term_length)
    }

    fn kind(&self) -> TokenizerKind {
        TokenizerKind::UnicodeWord
    }

    fn max_term_length(&self) -> usize {
        self.max_term_length
    }

    fn min_term_length(&self) -> usize {
        self.min_term_length
    }
}
