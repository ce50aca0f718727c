//! Tokenizers that turn record field values into join tokens.
//!
//! Both sides of a similarity join must be tokenized the same way for token overlap to
//! be meaningful, so tokenizers are selected by name or by [`TokenizerParams`] and are
//! stateless once created.
//!
//! # Available Tokenizers
//!
//! - **Trivial Tokenizer** (`"trivial"`): the whole value is a single token
//! - **Unicode Word Tokenizer** (`"unicode-word"`): alphanumeric runs
//! - **Whitespace Tokenizer** (`"whitespace"`): runs of non-whitespace characters
//! - **Q-Gram Tokenizer** (`"qgram"`): overlapping sequences of `q` grapheme clusters
//!
//! # Quick Start
//!
//! ```rust
//! use simjoin_text::{create_tokenizer, Tokenizer};
//!
//! let tokenizer = create_tokenizer("unicode-word").unwrap();
//! let tokens: Vec<&str> = tokenizer.tokenize("Acme Corp., Seattle").collect();
//! assert_eq!(tokens, vec!["Acme", "Corp", "Seattle"]);
//! ```

pub mod tokenizers;

pub use tokenizers::{
    QGramTokenizer, Tokenizer, TokenizerKind, TokenizerParams, TokenizerType, TrivialTokenizer,
    UnicodeWordTokenizer, WhitespaceTokenizer, create_tokenizer,
};
