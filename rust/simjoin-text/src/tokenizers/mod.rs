//! Tokenizers for extracting join tokens from field values.
//!
//! The tokenizers return iterators of string slices borrowed from the input; callers
//! decide whether (and how) to normalize and own the tokens.

pub mod qgram;
pub mod trivial;
pub mod unicode_word;
pub mod whitespace;

use serde::{Deserialize, Serialize};
use simjoin_common::{Result, error::Error, verify_arg};

pub use qgram::QGramTokenizer;
pub use trivial::TrivialTokenizer;
pub use unicode_word::UnicodeWordTokenizer;
pub use whitespace::WhitespaceTokenizer;

/// Default maximum length of a single token in bytes before truncation
pub const DEFAULT_MAX_TERM_LENGTH: usize = 128;

/// Default minimum length of a single token in bytes
pub const DEFAULT_MIN_TERM_LENGTH: usize = 1;

/// Default number of grapheme clusters in a q-gram
pub const DEFAULT_QGRAM_SIZE: usize = 3;

/// A tokenizer extracts tokens from raw string values.
///
/// Tokens longer than the maximum length are truncated at UTF-8 character boundaries.
/// Tokens shorter than the minimum length are excluded entirely.
pub trait Tokenizer: Send + Sync {
    /// The iterator type returned by tokenize.
    type TokenIter<'a>: Iterator<Item = &'a str>
    where
        Self: 'a;

    /// Extract tokens from the input string as an iterator of string slices.
    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a>;

    fn kind(&self) -> TokenizerKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Maximum length of a single token in bytes before truncation.
    fn max_term_length(&self) -> usize;

    /// Minimum length of a single token in bytes before exclusion.
    fn min_term_length(&self) -> usize;
}

/// Creates a tokenizer with default settings from its name.
///
/// # Errors
/// Returns an [`Error::invalid_arg`] if the provided tokenizer name is not recognized.
pub fn create_tokenizer(name: &str) -> Result<TokenizerType> {
    TokenizerParams::new(name.try_into()?).create()
}

/// Truncate a string slice to the maximum allowed length at a codepoint boundary.
pub(crate) fn truncate_str(input: &str, max_term_length: usize) -> &str {
    if input.len() <= max_term_length {
        return input;
    }

    let mut boundary = max_term_length;
    while boundary > 0 && !input.is_char_boundary(boundary) {
        boundary -= 1;
    }

    &input[..boundary]
}

/// Applies the min/max length policy to a candidate token.
#[inline]
pub(crate) fn accept_term(term: &str, min_term_length: usize, max_term_length: usize) -> Option<&str> {
    if term.is_empty() || term.len() < min_term_length {
        None
    } else {
        Some(truncate_str(term, max_term_length))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenizerKind {
    /// The whole value is one token.
    Trivial,
    /// Longest runs of alphanumeric characters.
    UnicodeWord,
    /// Runs of non-whitespace characters, punctuation included.
    Whitespace,
    /// Overlapping windows of `q` grapheme clusters.
    #[serde(rename = "qgram")]
    QGram,
}

impl TryFrom<&str> for TokenizerKind {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        match name {
            "trivial" => Ok(TokenizerKind::Trivial),
            "unicode-word" => Ok(TokenizerKind::UnicodeWord),
            "whitespace" => Ok(TokenizerKind::Whitespace),
            "qgram" => Ok(TokenizerKind::QGram),
            _ => Err(Error::invalid_arg(
                "name",
                format!("Unrecognized tokenizer: {name}"),
            )),
        }
    }
}

impl TokenizerKind {
    pub const fn name(&self) -> &'static str {
        match self {
            TokenizerKind::Trivial => "trivial",
            TokenizerKind::UnicodeWord => "unicode-word",
            TokenizerKind::Whitespace => "whitespace",
            TokenizerKind::QGram => "qgram",
        }
    }
}

/// Serializable tokenizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerParams {
    pub kind: TokenizerKind,
    pub max_term_length: Option<usize>,
    pub min_term_length: Option<usize>,
    /// Q-gram size, only used by [`TokenizerKind::QGram`].
    pub q: Option<usize>,
}

impl Default for TokenizerParams {
    fn default() -> Self {
        TokenizerParams::new(TokenizerKind::UnicodeWord)
    }
}

impl TokenizerParams {
    pub fn new(kind: TokenizerKind) -> TokenizerParams {
        TokenizerParams {
            kind,
            max_term_length: None,
            min_term_length: None,
            q: None,
        }
    }

    pub fn max_term_length(&self) -> usize {
        self.max_term_length.unwrap_or(DEFAULT_MAX_TERM_LENGTH)
    }

    pub fn min_term_length(&self) -> usize {
        self.min_term_length.unwrap_or(DEFAULT_MIN_TERM_LENGTH)
    }

    pub fn q(&self) -> usize {
        self.q.unwrap_or(DEFAULT_QGRAM_SIZE)
    }

    /// Instantiates the configured tokenizer.
    ///
    /// # Errors
    /// Returns an error when the length bounds are inconsistent or `q` is zero.
    pub fn create(&self) -> Result<TokenizerType> {
        let (max, min) = (self.max_term_length(), self.min_term_length());
        verify_arg!(max_term_length, max > 0);
        verify_arg!(min_term_length, min <= max);
        Ok(match self.kind {
            TokenizerKind::Trivial => {
                TokenizerType::Trivial(TrivialTokenizer::with_lengths(max, min))
            }
            TokenizerKind::UnicodeWord => {
                TokenizerType::UnicodeWord(UnicodeWordTokenizer::with_lengths(max, min))
            }
            TokenizerKind::Whitespace => {
                TokenizerType::Whitespace(WhitespaceTokenizer::with_lengths(max, min))
            }
            TokenizerKind::QGram => {
                let q = self.q();
                verify_arg!(q, q > 0);
                TokenizerType::QGram(QGramTokenizer::with_lengths(q, max, min))
            }
        })
    }
}

/// Enum that holds all available tokenizer types.
pub enum TokenizerType {
    Trivial(TrivialTokenizer),
    UnicodeWord(UnicodeWordTokenizer),
    Whitespace(WhitespaceTokenizer),
    QGram(QGramTokenizer),
}

impl Tokenizer for TokenizerType {
    type TokenIter<'a> = Box<dyn Iterator<Item = &'a str> + 'a>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        match self {
            TokenizerType::Trivial(tokenizer) => Box::new(tokenizer.tokenize(input)),
            TokenizerType::UnicodeWord(tokenizer) => Box::new(tokenizer.tokenize(input)),
            TokenizerType::Whitespace(tokenizer) => Box::new(tokenizer.tokenize(input)),
            TokenizerType::QGram(tokenizer) => Box::new(tokenizer.tokenize(input)),
        }
    }

    fn kind(&self) -> TokenizerKind {
        match self {
            TokenizerType::Trivial(tokenizer) => tokenizer.kind(),
            TokenizerType::UnicodeWord(tokenizer) => tokenizer.kind(),
            TokenizerType::Whitespace(tokenizer) => tokenizer.kind(),
            TokenizerType::QGram(tokenizer) => tokenizer.kind(),
        }
    }

    fn max_term_length(&self) -> usize {
        match self {
            TokenizerType::Trivial(tokenizer) => tokenizer.max_term_length(),
            TokenizerType::UnicodeWord(tokenizer) => tokenizer.max_term_length(),
            TokenizerType::Whitespace(tokenizer) => tokenizer.max_term_length(),
            TokenizerType::QGram(tokenizer) => tokenizer.max_term_length(),
        }
    }

    fn min_term_length(&self) -> usize {
        match self {
            TokenizerType::Trivial(tokenizer) => tokenizer.min_term_length(),
            TokenizerType::UnicodeWord(tokenizer) => tokenizer.min_term_length(),
            TokenizerType::Whitespace(tokenizer) => tokenizer.min_term_length(),
            TokenizerType::QGram(tokenizer) => tokenizer.min_term_length(),
        }
    }
}

impl std::fmt::Debug for TokenizerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizerType")
            .field("kind", &self.kind())
            .field("min_term_length", &self.min_term_length())
            .field("max_term_length", &self.max_term_length())
            .finish()
    }
}
