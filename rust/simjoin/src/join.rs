//! Join driver: strategy selection, role assignment and result assembly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use simjoin_common::{Result, error::Error};
use simjoin_workflow::Dataset;

use crate::{
    featurizer::SimilarityFeaturizer,
    naive,
    prefix_join::{self, PrefixSettings},
    record::{Record, TokenizedRecord},
    roles::JoinRoles,
    weights::{CorpusStatistics, TokenWeights},
};

pub use crate::roles::{Corpus, Side};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinStrategy {
    /// Prefix filtering when the featurizer supports it, all pairs otherwise.
    #[default]
    Auto,
    /// Test every pair.
    Naive,
    /// Probe a rank-ordered inverted index. Requires featurizer support.
    PrefixFilter,
}

/// Counters describing one join invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    /// The strategy that actually ran.
    pub strategy: JoinStrategy,
    pub self_join: bool,
    pub small_records: u64,
    pub large_records: u64,
    pub corpus_size: u64,
    pub distinct_tokens: u64,
    pub indexed_records: u64,
    pub index_tokens: u64,
    pub published_bytes: u64,
    pub scanned: u64,
    /// Pairs that reached the similarity test.
    pub candidates: u64,
    pub matches: u64,
}

/// The verified pairs of a join, each oriented `(scanned record, indexed record)`.
///
/// Pair order is unspecified.
#[derive(Debug, Clone, Default)]
pub struct MatchedPairs {
    pairs: Vec<(Record, Record)>,
    stats: JoinStats,
}

impl MatchedPairs {
    pub fn stats(&self) -> &JoinStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Record, Record)> {
        self.pairs.iter()
    }

    pub fn into_pairs(self) -> Vec<(Record, Record)> {
        self.pairs
    }
}

impl IntoIterator for MatchedPairs {
    type Item = (Record, Record);
    type IntoIter = std::vec::IntoIter<(Record, Record)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl<'a> IntoIterator for &'a MatchedPairs {
    type Item = &'a (Record, Record);
    type IntoIter = std::slice::Iter<'a, (Record, Record)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

/// Similarity join between two record collections.
///
/// ```
/// use simjoin::{Record, SetMeasure, SetSimilarityFeaturizer, SetSimilarityParams, SimilarityJoin};
/// use simjoin_workflow::ExecutionContext;
///
/// let ctx = ExecutionContext::sequential();
/// let a = ctx.parallelize(vec![Record::new().with("name", "a b c")]);
/// let b = ctx.parallelize(vec![Record::new().with("name", "a b d")]);
///
/// let featurizer = SetSimilarityFeaturizer::new(SetSimilarityParams::new(SetMeasure::Jaccard, 0.5)).unwrap();
/// let pairs = SimilarityJoin::new(featurizer).join(&a, &b, true, true).unwrap();
/// assert_eq!(pairs.len(), 1);
/// ```
#[derive(Clone)]
pub struct SimilarityJoin {
    featurizer: Arc<dyn SimilarityFeaturizer>,
    strategy: JoinStrategy,
}

impl SimilarityJoin {
    pub fn new(featurizer: impl SimilarityFeaturizer + 'static) -> SimilarityJoin {
        SimilarityJoin::from_shared(Arc::new(featurizer))
    }

    pub fn from_shared(featurizer: Arc<dyn SimilarityFeaturizer>) -> SimilarityJoin {
        SimilarityJoin {
            featurizer,
            strategy: JoinStrategy::Auto,
        }
    }

    pub fn with_strategy(mut self, strategy: JoinStrategy) -> SimilarityJoin {
        self.strategy = strategy;
        self
    }

    pub fn featurizer(&self) -> &dyn SimilarityFeaturizer {
        self.featurizer.as_ref()
    }

    pub fn strategy(&self) -> JoinStrategy {
        self.strategy
    }

    /// Validates the configuration and returns the strategy a join would run.
    ///
    /// # Errors
    /// Returns a configuration error when the featurizer settings are invalid, when
    /// prefix filtering would run without a usable threshold or minimum size, or when
    /// prefix filtering is requested from a featurizer that does not support it.
    pub fn resolve_strategy(&self) -> Result<JoinStrategy> {
        let featurizer = self.featurizer();
        featurizer.validate()?;
        let supported = featurizer.uses_token_prefix_filtering();
        let strategy = match self.strategy {
            JoinStrategy::Auto if supported => JoinStrategy::PrefixFilter,
            JoinStrategy::Auto | JoinStrategy::Naive => JoinStrategy::Naive,
            JoinStrategy::PrefixFilter if supported => JoinStrategy::PrefixFilter,
            JoinStrategy::PrefixFilter => {
                return Err(Error::invalid_config(
                    "strategy",
                    format!(
                        "featurizer '{}' does not support prefix filtering",
                        featurizer.name()
                    ),
                ));
            }
        };
        if strategy == JoinStrategy::PrefixFilter {
            prefix_settings(featurizer)?;
        }
        Ok(strategy)
    }

    /// Finds every pair of records from `a` and `b` that the featurizer considers
    /// similar.
    ///
    /// `smaller_a` selects the side that is indexed (`a` when set). With `containment`
    /// the other side is the reference corpus for token frequencies; without it both
    /// sides are. When `containment` is set and `a` and `b` are the same dataset read
    /// through the same columns, the join is a self-join: no record is paired with
    /// itself and each unordered pair is reported once. A separately loaded copy of
    /// a collection has its own source and is joined as a second collection.
    ///
    /// # Errors
    /// Configuration errors (see [`SimilarityJoin::resolve_strategy`]) are reported
    /// before any data is read. A resource-exhausted error is returned when the
    /// published index does not fit the broadcast budget of the execution context.
    pub fn join(
        &self,
        a: &Dataset<Record>,
        b: &Dataset<Record>,
        smaller_a: bool,
        containment: bool,
    ) -> Result<MatchedPairs> {
        let strategy = self.resolve_strategy()?;
        let featurizer = self.featurizer();
        let self_join = containment
            && a.same_source(b)
            && featurizer.cols(true) == featurizer.cols(false);
        let roles = JoinRoles::assign(smaller_a, containment, featurizer.weighted())
            .with_self_join(self_join);
        log::debug!(
            "{} join with {strategy:?}: small={:?}, corpus={:?}, weighted={}, self_join={self_join}",
            featurizer.name(),
            roles.small,
            roles.corpus,
            roles.weighted
        );

        let (size_small, size_large) = match roles.small {
            Side::A => (a.count(), b.count()),
            Side::B => (b.count(), a.count()),
        };
        let mut stats = JoinStats {
            strategy,
            self_join,
            small_records: size_small as u64,
            large_records: size_large as u64,
            ..Default::default()
        };
        if a.is_empty() || b.is_empty() {
            log::info!("{} join: empty input, no matches", featurizer.name());
            return Ok(MatchedPairs {
                pairs: Vec::new(),
                stats,
            });
        }

        let needs_statistics = strategy == JoinStrategy::PrefixFilter || roles.weighted;
        let (tokenized, corpus) = if needs_statistics {
            let tokenized_a = tokenize(featurizer, a, true);
            let tokenized_b = if self_join {
                tokenized_a.clone()
            } else {
                tokenize(featurizer, b, false)
            };
            let corpus = CorpusStatistics::compute(&tokenized_a, &tokenized_b, &roles);
            stats.corpus_size = corpus.corpus_size;
            stats.distinct_tokens = corpus.frequencies.len() as u64;
            (Some((tokenized_a, tokenized_b)), corpus)
        } else {
            (None, CorpusStatistics::default())
        };
        let weights = TokenWeights::for_roles(&corpus, &roles);

        let pairs = match (strategy, tokenized) {
            (JoinStrategy::PrefixFilter, Some((tokenized_a, tokenized_b))) => {
                let settings = prefix_settings(featurizer)?;
                let outcome = prefix_join::join(
                    featurizer,
                    &tokenized_a,
                    &tokenized_b,
                    &roles,
                    &corpus,
                    weights,
                    settings,
                )?;
                stats.indexed_records = outcome.indexed_records;
                stats.index_tokens = outcome.index_tokens;
                stats.published_bytes = outcome.published_bytes;
                stats.scanned = outcome.scanned;
                stats.candidates = outcome.candidates;
                outcome.pairs
            }
            _ => {
                let outcome = naive::join(featurizer, a, b, &roles, &weights);
                stats.scanned = (if self_join { size_small } else { size_large }) as u64;
                stats.candidates = outcome.tested;
                outcome.pairs.into_vec()
            }
        };
        stats.matches = pairs.len() as u64;

        log::info!(
            "{} join ({:?}): scanned={}, candidates={}, matches={}",
            featurizer.name(),
            stats.strategy,
            stats.scanned,
            stats.candidates,
            stats.matches
        );
        Ok(MatchedPairs { pairs, stats })
    }
}

impl std::fmt::Debug for SimilarityJoin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityJoin")
            .field("featurizer", &self.featurizer.name())
            .field("strategy", &self.strategy)
            .finish()
    }
}

fn tokenize(
    featurizer: &dyn SimilarityFeaturizer,
    records: &Dataset<Record>,
    primary: bool,
) -> Dataset<TokenizedRecord> {
    let cols = featurizer.cols(primary);
    records.map(|record| (featurizer.tokenize(record, cols), record.clone()))
}

fn prefix_settings(featurizer: &dyn SimilarityFeaturizer) -> Result<PrefixSettings> {
    let threshold = match featurizer.threshold() {
        Some(threshold) if threshold.is_finite() && threshold > 0.0 => threshold,
        Some(threshold) => {
            return Err(Error::invalid_config(
                "threshold",
                format!("prefix filtering needs a positive threshold, got {threshold}"),
            ));
        }
        None => {
            return Err(Error::invalid_config(
                "threshold",
                "prefix filtering needs a threshold",
            ));
        }
    };
    let min_size = match featurizer.min_size() {
        Some(min_size) if min_size >= 1 => min_size,
        _ => {
            return Err(Error::invalid_config(
                "min_size",
                "prefix filtering needs a minimum token set size of at least 1",
            ));
        }
    };
    Ok(PrefixSettings {
        threshold,
        min_size,
    })
}

#[cfg(test)]
mod tests {
    use simjoin_workflow::ExecutionContext;

    use super::*;
    use crate::featurizer::{
        EditDistanceFeaturizer, EditDistanceParams, SetMeasure, SetSimilarityFeaturizer,
        SetSimilarityParams,
    };

    /// Declares prefix filtering but leaves its settings to the caller.
    struct Unbounded {
        threshold: Option<f64>,
        min_size: Option<usize>,
    }

    impl SimilarityFeaturizer for Unbounded {
        fn name(&self) -> &str {
            "unbounded"
        }

        fn cols(&self, _primary: bool) -> &[String] {
            &[]
        }

        fn tokenize(&self, record: &Record, cols: &[String]) -> Vec<String> {
            record.values(cols).into_iter().map(str::to_string).collect()
        }

        fn optimized_similarity(
            &self,
            a: &[String],
            b: &[String],
            _threshold: f64,
            _weights: &TokenWeights,
        ) -> (bool, f64) {
            (a == b, 1.0)
        }

        fn uses_token_prefix_filtering(&self) -> bool {
            true
        }

        fn min_size(&self) -> Option<usize> {
            self.min_size
        }

        fn threshold(&self) -> Option<f64> {
            self.threshold
        }
    }

    #[test]
    fn test_strategy_resolution() {
        let jaccard = SetSimilarityFeaturizer::new(SetSimilarityParams::new(SetMeasure::Jaccard, 0.5)).unwrap();
        let join = SimilarityJoin::new(jaccard);
        assert_eq!(join.resolve_strategy().unwrap(), JoinStrategy::PrefixFilter);
        let join = join.with_strategy(JoinStrategy::Naive);
        assert_eq!(join.resolve_strategy().unwrap(), JoinStrategy::Naive);

        let edit = SimilarityJoin::new(EditDistanceFeaturizer::new(EditDistanceParams::new(0.5)));
        assert_eq!(edit.resolve_strategy().unwrap(), JoinStrategy::Naive);
        let err = edit
            .with_strategy(JoinStrategy::PrefixFilter)
            .resolve_strategy()
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_prefix_settings_are_required() {
        for (threshold, min_size) in [
            (None, Some(1)),
            (Some(0.0), Some(1)),
            (Some(f64::INFINITY), Some(1)),
            (Some(0.5), None),
            (Some(0.5), Some(0)),
        ] {
            let join = SimilarityJoin::new(Unbounded {
                threshold,
                min_size,
            });
            let err = join.resolve_strategy().unwrap_err();
            assert!(err.is_config_error(), "{threshold:?} {min_size:?}");

            // Reported before any data is read.
            let ctx = ExecutionContext::sequential();
            let a = ctx.parallelize(vec![Record::new().with("x", "1")]);
            assert!(join.join(&a, &a, true, true).unwrap_err().is_config_error());
        }

        let join = SimilarityJoin::new(Unbounded {
            threshold: Some(1.0),
            min_size: Some(1),
        });
        assert_eq!(join.resolve_strategy().unwrap(), JoinStrategy::PrefixFilter);
    }

    #[test]
    fn test_empty_input() {
        let ctx = ExecutionContext::sequential();
        let a = ctx.parallelize(vec![
            Record::new().with("name", "a"),
            Record::new().with("name", "b"),
            Record::new().with("name", "c"),
        ]);
        let b = ctx.parallelize(Vec::<Record>::new());
        let featurizer =
            SetSimilarityFeaturizer::new(SetSimilarityParams::new(SetMeasure::Jaccard, 0.5)).unwrap();
        let join = SimilarityJoin::new(featurizer);
        for strategy in [JoinStrategy::Naive, JoinStrategy::PrefixFilter] {
            let join = join.clone().with_strategy(strategy);
            for (smaller_a, containment) in [(true, true), (false, true), (true, false), (false, false)] {
                let pairs = join.join(&a, &b, smaller_a, containment).unwrap();
                assert!(pairs.is_empty());
                let pairs = join.join(&b, &a, smaller_a, containment).unwrap();
                assert!(pairs.is_empty());
            }
        }
    }
}
