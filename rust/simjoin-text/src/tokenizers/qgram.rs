//! Q-Gram Tokenizer - overlapping windows of grapheme clusters.

use unicode_segmentation::UnicodeSegmentation;

use super::{
    DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH, DEFAULT_QGRAM_SIZE, Tokenizer, TokenizerKind,
    accept_term,
};

/// Splits a value into every run of `q` consecutive grapheme clusters.
///
/// Values with fewer than `q` grapheme clusters produce a single token holding the
/// whole value, so short values still take part in the join. Q-grams tolerate typos
/// that word tokens do not: "Jonh" and "John" share the 2-gram "Jo".
pub struct QGramTokenizer {
    q: usize,
    max_term_length: usize,
    min_term_length: usize,
}

impl QGramTokenizer {
    pub fn with_lengths(q: usize, max_term_length: usize, min_term_length: usize) -> Self {
        Self {
            q: q.max(1),
            max_term_length,
            min_term_length,
        }
    }

    pub fn new(q: usize) -> Self {
        Self::with_lengths(q, DEFAULT_MAX_TERM_LENGTH, DEFAULT_MIN_TERM_LENGTH)
    }

    pub fn q(&self) -> usize {
        self.q
    }
}

impl Default for QGramTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_QGRAM_SIZE)
    }
}

/// Iterator over the q-grams of a value.
pub struct QGramIterator<'a> {
    input: &'a str,
    /// Byte offset of every grapheme boundary, including `input.len()`.
    boundaries: Vec<usize>,
    position: usize,
    q: usize,
    max_term_length: usize,
    min_term_length: usize,
}

impl<'a> QGramIterator<'a> {
    fn new(input: &'a str, q: usize, max_term_length: usize, min_term_length: usize) -> Self {
        let boundaries = input
            .grapheme_indices(true)
            .map(|(pos, _)| pos)
            .chain(std::iter::once(input.len()))
            .collect::<Vec<_>>();
        Self {
            input,
            boundaries,
            position: 0,
            q,
            max_term_length,
            min_term_length,
        }
    }

    fn graphemes(&self) -> usize {
        self.boundaries.len() - 1
    }
}

impl<'a> Iterator for QGramIterator<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let graphemes = self.graphemes();
        if graphemes == 0 {
            return None;
        }
        // Short values yield themselves once.
        let window = self.q.min(graphemes);
        while self.position + window <= graphemes {
            let start = self.boundaries[self.position];
            let end = self.boundaries[self.position + window];
            self.position += 1;
            if let Some(term) = accept_term(
                &self.input[start..end],
                self.min_term_length,
                self.max_term_length,
            ) {
                return Some(term);
            }
        }
        None
    }
}

impl Tokenizer for QGramTokenizer {
    type TokenIter<'a> = QGramIterator<'a>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        QGramIterator::new(input, self.q, self.max_term_length, self.min_term_length)
    }

    fn kind(&self) -> TokenizerKind {
        TokenizerKind::QGram
    }

    fn max_term_length(&self) -> usize {
        self.max_term_length
    }

    fn min_term_length(&self) -> usize {
        self.min_term_length
    }
}
