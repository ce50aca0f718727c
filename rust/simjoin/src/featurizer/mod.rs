//! Pluggable similarity functions.
//!
//! A featurizer decides which columns of a record take part in the join, how they are
//! tokenized and when two token sequences are similar. Featurizers that can bound the
//! token overlap a match needs also declare prefix-filtering support, which lets the
//! join probe an index instead of testing every pair.

pub mod edit_distance;
pub mod set_similarity;

use simjoin_common::Result;

use crate::{record::Record, weights::TokenWeights};

pub use edit_distance::{EditDistanceFeaturizer, EditDistanceParams};
pub use set_similarity::{SetMeasure, SetSimilarityFeaturizer, SetSimilarityParams};

/// Relative slack applied to overlap bounds so that rounding in weight sums never
/// prunes a token a match depends on.
pub const OVERLAP_BOUND_TOLERANCE: f64 = 1e-9;

pub trait SimilarityFeaturizer: Send + Sync {
    fn name(&self) -> &str;

    /// Columns read from records of the primary (`A`) or secondary (`B`) side.
    fn cols(&self, primary: bool) -> &[String];

    /// Tokens of the selected columns, in column order. May contain duplicates.
    fn tokenize(&self, record: &Record, cols: &[String]) -> Vec<String>;

    /// Binary similarity test on two token sequences, with its score.
    fn optimized_similarity(
        &self,
        tokens_a: &[String],
        tokens_b: &[String],
        threshold: f64,
        weights: &TokenWeights,
    ) -> (bool, f64);

    /// Tests a primary-side record against a secondary-side record.
    ///
    /// Returns 1.0 for a match and 0.0 otherwise.
    fn featurize(&self, a: &Record, b: &Record, weights: &TokenWeights) -> f64 {
        let Some(threshold) = self.threshold() else {
            return 0.0;
        };
        let tokens_a = self.tokenize(a, self.cols(true));
        let tokens_b = self.tokenize(b, self.cols(false));
        if self
            .optimized_similarity(&tokens_a, &tokens_b, threshold, weights)
            .0
        {
            1.0
        } else {
            0.0
        }
    }

    /// Number of trailing tokens of a rank-sorted sequence that can be dropped before
    /// probing.
    ///
    /// The bound must be sound: any sequence similar to `sorted_tokens` shares at least
    /// one token with the retained prefix.
    fn removed_size(&self, _sorted_tokens: &[String], _threshold: f64, _weights: &TokenWeights) -> usize {
        0
    }

    fn uses_token_prefix_filtering(&self) -> bool {
        false
    }

    /// Minimum number of distinct tokens a record needs to take part in a match.
    fn min_size(&self) -> Option<usize>;

    fn threshold(&self) -> Option<f64>;

    /// Whether similarity is computed over IDF-weighted tokens.
    fn weighted(&self) -> bool {
        false
    }

    /// Checks the featurizer's own settings.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Distinct tokens in lexicographic order.
pub(crate) fn distinct_sorted(tokens: &[String]) -> Vec<&str> {
    let mut distinct = tokens.iter().map(String::as_str).collect::<Vec<_>>();
    distinct.sort_unstable();
    distinct.dedup();
    distinct
}

/// Number of distinct tokens in a sequence.
pub fn distinct_count(tokens: &[String]) -> usize {
    distinct_sorted(tokens).len()
}
