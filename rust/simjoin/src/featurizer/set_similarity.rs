//! Token set similarity: Jaccard, Dice, cosine and overlap, optionally IDF-weighted.

use serde::{Deserialize, Serialize};
use simjoin_common::{Result, error::Error, verify_config};
use simjoin_text::{Tokenizer, TokenizerParams, TokenizerType};

use super::{OVERLAP_BOUND_TOLERANCE, SimilarityFeaturizer, distinct_sorted};
use crate::{record::Record, weights::TokenWeights};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetMeasure {
    /// `w(x ∩ y) / w(x ∪ y)`
    #[default]
    Jaccard,
    /// `2·w(x ∩ y) / (w(x) + w(y))`
    Dice,
    /// `w(x ∩ y) / sqrt(w(x)·w(y))`
    Cosine,
    /// `w(x ∩ y)`, compared against an absolute threshold.
    Overlap,
}

impl SetMeasure {
    pub const fn name(&self) -> &'static str {
        match self {
            SetMeasure::Jaccard => "jaccard",
            SetMeasure::Dice => "dice",
            SetMeasure::Cosine => "cosine",
            SetMeasure::Overlap => "overlap",
        }
    }

    /// Whether scores lie in `[0, 1]`.
    pub const fn is_normalized(&self) -> bool {
        !matches!(self, SetMeasure::Overlap)
    }

    /// Score from the overlap weight and the total weights of both sets. Zero when the
    /// measure is undefined (empty or zero-weight sets).
    pub fn score(&self, overlap: f64, weight_a: f64, weight_b: f64) -> f64 {
        let (numerator, denominator) = match self {
            SetMeasure::Jaccard => (overlap, weight_a + weight_b - overlap),
            SetMeasure::Dice => (2.0 * overlap, weight_a + weight_b),
            SetMeasure::Cosine => (overlap, (weight_a * weight_b).sqrt()),
            SetMeasure::Overlap => return overlap,
        };
        if denominator > 0.0 {
            numerator / denominator
        } else {
            0.0
        }
    }

    /// Lower bound on `w(x ∩ y)` for any `y` reaching `threshold` against a set `x` of
    /// total weight `weight`.
    pub fn min_overlap(&self, threshold: f64, weight: f64) -> f64 {
        match self {
            SetMeasure::Jaccard => threshold * weight,
            SetMeasure::Dice => threshold * weight / (2.0 - threshold),
            SetMeasure::Cosine => threshold * threshold * weight,
            SetMeasure::Overlap => threshold,
        }
    }
}

/// Configuration of a [`SetSimilarityFeaturizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetSimilarityParams {
    pub measure: SetMeasure,
    pub threshold: Option<f64>,
    /// Minimum number of distinct tokens. By default, this parameter is set to 1.
    pub min_size: Option<usize>,
    pub weighted: bool,
    /// Columns of the primary side. Empty selects every field.
    pub primary_cols: Vec<String>,
    /// Columns of the secondary side; `None` reuses `primary_cols`.
    pub secondary_cols: Option<Vec<String>>,
    pub tokenizer: TokenizerParams,
    pub lowercase: bool,
}

impl Default for SetSimilarityParams {
    fn default() -> Self {
        SetSimilarityParams {
            measure: SetMeasure::Jaccard,
            threshold: None,
            min_size: Some(1),
            weighted: false,
            primary_cols: Vec::new(),
            secondary_cols: None,
            tokenizer: TokenizerParams::default(),
            lowercase: true,
        }
    }
}

impl SetSimilarityParams {
    pub fn new(measure: SetMeasure, threshold: f64) -> SetSimilarityParams {
        SetSimilarityParams {
            measure,
            threshold: Some(threshold),
            ..Default::default()
        }
    }

    pub fn with_cols<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.primary_cols = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_secondary_cols<S: Into<String>>(
        mut self,
        cols: impl IntoIterator<Item = S>,
    ) -> Self {
        self.secondary_cols = Some(cols.into_iter().map(Into::into).collect());
        self
    }

    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: TokenizerParams) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

/// Set similarity over the distinct tokens of the selected columns.
///
/// Supports prefix filtering: [`SetMeasure::min_overlap`] bounds the overlap weight a
/// match needs, and every trailing token whose removal keeps the dropped weight below
/// that bound can be skipped when probing.
pub struct SetSimilarityFeaturizer {
    params: SetSimilarityParams,
    secondary_cols: Vec<String>,
    tokenizer: TokenizerType,
    name: String,
}

impl SetSimilarityFeaturizer {
    /// Creates the featurizer and its tokenizer. Threshold and size settings are
    /// checked by [`SimilarityFeaturizer::validate`].
    ///
    /// # Errors
    /// Returns an error when the tokenizer parameters are invalid.
    pub fn new(params: SetSimilarityParams) -> Result<SetSimilarityFeaturizer> {
        let tokenizer = params.tokenizer.create()?;
        let secondary_cols = params
            .secondary_cols
            .clone()
            .unwrap_or_else(|| params.primary_cols.clone());
        let name = format!(
            "{}{}",
            if params.weighted { "weighted-" } else { "" },
            params.measure.name()
        );
        Ok(SetSimilarityFeaturizer {
            params,
            secondary_cols,
            tokenizer,
            name,
        })
    }

    pub fn params(&self) -> &SetSimilarityParams {
        &self.params
    }

    pub fn measure(&self) -> SetMeasure {
        self.params.measure
    }

    fn weight(&self, weights: &TokenWeights, token: &str) -> f64 {
        if self.params.weighted {
            weights.get(token)
        } else {
            1.0
        }
    }
}

impl SimilarityFeaturizer for SetSimilarityFeaturizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn cols(&self, primary: bool) -> &[String] {
        if primary {
            &self.params.primary_cols
        } else {
            &self.secondary_cols
        }
    }

    fn tokenize(&self, record: &Record, cols: &[String]) -> Vec<String> {
        let lowercase = self.params.lowercase;
        record
            .values(cols)
            .into_iter()
            .flat_map(|value| self.tokenizer.tokenize(value))
            .map(|token| {
                if lowercase {
                    token.to_lowercase()
                } else {
                    token.to_string()
                }
            })
            .collect()
    }

    fn optimized_similarity(
        &self,
        tokens_a: &[String],
        tokens_b: &[String],
        threshold: f64,
        weights: &TokenWeights,
    ) -> (bool, f64) {
        let a = distinct_sorted(tokens_a);
        let b = distinct_sorted(tokens_b);
        let min_size = self.params.min_size.unwrap_or(0);
        if a.len() < min_size || b.len() < min_size {
            return (false, 0.0);
        }

        let weight_a = a.iter().map(|t| self.weight(weights, t)).sum::<f64>();
        let weight_b = b.iter().map(|t| self.weight(weights, t)).sum::<f64>();
        let mut overlap = 0.0;
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    overlap += self.weight(weights, a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }

        let score = self.params.measure.score(overlap, weight_a, weight_b);
        (score > 0.0 && score >= threshold, score)
    }

    fn removed_size(&self, sorted_tokens: &[String], threshold: f64, weights: &TokenWeights) -> usize {
        let total = distinct_sorted(sorted_tokens)
            .iter()
            .map(|t| self.weight(weights, t))
            .sum::<f64>();
        let bound = self.params.measure.min_overlap(threshold, total) * (1.0 - OVERLAP_BOUND_TOLERANCE);

        // Equal tokens are adjacent; a run counts once.
        let mut end = sorted_tokens.len();
        let mut dropped = 0.0;
        while end > 0 {
            let token = &sorted_tokens[end - 1];
            let start = sorted_tokens[..end]
                .iter()
                .rposition(|t| t != token)
                .map_or(0, |pos| pos + 1);
            dropped += self.weight(weights, token);
            if dropped >= bound {
                break;
            }
            end = start;
        }
        sorted_tokens.len() - end
    }

    fn uses_token_prefix_filtering(&self) -> bool {
        true
    }

    fn min_size(&self) -> Option<usize> {
        self.params.min_size
    }

    fn threshold(&self) -> Option<f64> {
        self.params.threshold
    }

    fn weighted(&self) -> bool {
        self.params.weighted
    }

    fn validate(&self) -> Result<()> {
        let Some(threshold) = self.params.threshold else {
            return Err(Error::invalid_config("threshold", "threshold is not set"));
        };
        verify_config!(threshold, threshold.is_finite() && threshold > 0.0);
        if self.params.measure.is_normalized() {
            verify_config!(threshold, threshold <= 1.0);
        }
        let Some(min_size) = self.params.min_size else {
            return Err(Error::invalid_config("min_size", "min_size is not set"));
        };
        verify_config!(min_size, min_size >= 1);
        Ok(())
    }
}
