//! Normalized Levenshtein similarity over whole column values.

use serde::{Deserialize, Serialize};
use simjoin_common::{Result, error::Error, verify_config};

use super::SimilarityFeaturizer;
use crate::{record::Record, weights::TokenWeights};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditDistanceParams {
    pub threshold: Option<f64>,
    pub primary_cols: Vec<String>,
    pub secondary_cols: Option<Vec<String>>,
    pub lowercase: bool,
}

impl Default for EditDistanceParams {
    fn default() -> Self {
        EditDistanceParams {
            threshold: None,
            primary_cols: Vec::new(),
            secondary_cols: None,
            lowercase: true,
        }
    }
}

impl EditDistanceParams {
    pub fn new(threshold: f64) -> EditDistanceParams {
        EditDistanceParams {
            threshold: Some(threshold),
            ..Default::default()
        }
    }

    pub fn with_cols<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.primary_cols = cols.into_iter().map(Into::into).collect();
        self
    }
}

/// Matches records whose selected values, joined by a space, are within a normalized
/// edit distance: `1 - levenshtein(a, b) / max(len(a), len(b)) >= threshold`.
///
/// Edit distance has no token-overlap bound, so joins with this featurizer test every
/// pair.
pub struct EditDistanceFeaturizer {
    params: EditDistanceParams,
    secondary_cols: Vec<String>,
}

impl EditDistanceFeaturizer {
    pub fn new(params: EditDistanceParams) -> EditDistanceFeaturizer {
        let secondary_cols = params
            .secondary_cols
            .clone()
            .unwrap_or_else(|| params.primary_cols.clone());
        EditDistanceFeaturizer {
            params,
            secondary_cols,
        }
    }
}

impl SimilarityFeaturizer for EditDistanceFeaturizer {
    fn name(&self) -> &str {
        "edit-distance"
    }

    fn cols(&self, primary: bool) -> &[String] {
        if primary {
            &self.params.primary_cols
        } else {
            &self.secondary_cols
        }
    }

    /// The whole selection is a single token.
    fn tokenize(&self, record: &Record, cols: &[String]) -> Vec<String> {
        let values = record.values(cols);
        if values.is_empty() {
            return Vec::new();
        }
        let joined = values.join(" ");
        vec![if self.params.lowercase {
            joined.to_lowercase()
        } else {
            joined
        }]
    }

    fn optimized_similarity(
        &self,
        tokens_a: &[String],
        tokens_b: &[String],
        threshold: f64,
        _weights: &TokenWeights,
    ) -> (bool, f64) {
        if tokens_a.is_empty() || tokens_b.is_empty() {
            return (false, 0.0);
        }
        let score = strsim::normalized_levenshtein(&tokens_a.join(" "), &tokens_b.join(" "));
        (score >= threshold, score)
    }

    fn min_size(&self) -> Option<usize> {
        None
    }

    fn threshold(&self) -> Option<f64> {
        self.params.threshold
    }

    fn validate(&self) -> Result<()> {
        let Some(threshold) = self.params.threshold else {
            return Err(Error::invalid_config("threshold", "threshold is not set"));
        };
        verify_config!(threshold, (0.0..=1.0).contains(&threshold));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        let f = EditDistanceFeaturizer::new(EditDistanceParams::new(0.75).with_cols(["name"]));
        let weights = TokenWeights::unweighted();
        let john = Record::new().with("name", "John");
        let jonh = Record::new().with("name", "Jonh");
        let jane = Record::new().with("name", "JANE");
        let nameless = Record::new().with("city", "Oslo");

        assert_eq!(f.tokenize(&jane, f.cols(true)), vec!["jane".to_string()]);
        assert!(f.tokenize(&nameless, f.cols(true)).is_empty());

        // Two substitutions out of four characters.
        assert_eq!(f.featurize(&john, &jonh, &weights), 0.0);
        assert_eq!(f.featurize(&john, &john, &weights), 1.0);
        assert_eq!(f.featurize(&john, &nameless, &weights), 0.0);

        let f = EditDistanceFeaturizer::new(EditDistanceParams::new(0.5).with_cols(["name"]));
        assert_eq!(f.featurize(&john, &jonh, &weights), 1.0);
        assert_eq!(f.featurize(&john, &jane, &weights), 0.0);
        assert!(!f.uses_token_prefix_filtering());
    }

    #[test]
    fn test_validate() {
        assert!(EditDistanceFeaturizer::new(EditDistanceParams::new(0.9)).validate().is_ok());
        assert!(
            EditDistanceFeaturizer::new(EditDistanceParams::new(1.5))
                .validate()
                .unwrap_err()
                .is_config_error()
        );
        assert!(
            EditDistanceFeaturizer::new(EditDistanceParams::default())
                .validate()
                .unwrap_err()
                .is_config_error()
        );
    }
}
