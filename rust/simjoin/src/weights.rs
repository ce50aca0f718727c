//! Document frequencies and IDF-style token weights.

use ahash::AHashMap;
use simjoin_workflow::{Dataset, EstimateSize};

use crate::{
    record::TokenizedRecord,
    roles::{Corpus, JoinRoles, Side},
};

/// Document frequencies over the weighting corpus of a join.
#[derive(Debug, Clone, Default)]
pub struct CorpusStatistics {
    /// Token -> number of corpus records containing it at least once.
    pub frequencies: AHashMap<String, u64>,
    pub corpus_size: u64,
}

impl CorpusStatistics {
    /// Counts document frequencies over the corpus selected by `roles`.
    ///
    /// Every record contributes one per distinct token. Counting runs per partition and
    /// the partial maps are merged afterwards.
    pub fn compute(
        a: &Dataset<TokenizedRecord>,
        b: &Dataset<TokenizedRecord>,
        roles: &JoinRoles,
    ) -> CorpusStatistics {
        let frequencies = match roles.corpus {
            Corpus::Only(Side::A) => document_frequencies(a),
            Corpus::Only(Side::B) => document_frequencies(b),
            Corpus::Union => {
                let mut frequencies = document_frequencies(a);
                for (token, count) in document_frequencies(b) {
                    *frequencies.entry(token).or_default() += count;
                }
                frequencies
            }
        };
        let corpus_size = roles.corpus_size(a.count(), b.count());
        log::debug!(
            "corpus {:?}: {corpus_size} records, {} distinct tokens",
            roles.corpus,
            frequencies.len()
        );
        CorpusStatistics {
            frequencies,
            corpus_size,
        }
    }
}

pub fn document_frequencies(records: &Dataset<TokenizedRecord>) -> AHashMap<String, u64> {
    records.reduce_by_key(
        |(tokens, _)| {
            let mut distinct = tokens.iter().collect::<Vec<_>>();
            distinct.sort_unstable();
            distinct.dedup();
            distinct
                .into_iter()
                .map(|token| (token.clone(), 1u64))
                .collect::<Vec<_>>()
        },
        |acc, count| *acc += count,
    )
}

/// Per-token weights, `log10(corpus_size / document_frequency)`.
///
/// An unweighted map answers 1.0 for every token. A weighted map answers
/// `log10(corpus_size)` for tokens that never occur in the corpus, as if they
/// occurred once.
#[derive(Debug, Clone)]
pub struct TokenWeights {
    weighted: bool,
    corpus_size: u64,
    weights: AHashMap<String, f64>,
}

impl TokenWeights {
    pub fn unweighted() -> TokenWeights {
        TokenWeights {
            weighted: false,
            corpus_size: 0,
            weights: AHashMap::new(),
        }
    }

    pub fn from_statistics(stats: &CorpusStatistics) -> TokenWeights {
        let corpus_size = stats.corpus_size as f64;
        let weights = stats
            .frequencies
            .iter()
            .map(|(token, &df)| (token.clone(), (corpus_size / df.max(1) as f64).log10()))
            .collect();
        TokenWeights {
            weighted: true,
            corpus_size: stats.corpus_size,
            weights,
        }
    }

    /// Weights for the policy of `roles`: empty unless the join is weighted.
    pub fn for_roles(stats: &CorpusStatistics, roles: &JoinRoles) -> TokenWeights {
        if roles.weighted {
            TokenWeights::from_statistics(stats)
        } else {
            TokenWeights::unweighted()
        }
    }

    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    pub fn corpus_size(&self) -> u64 {
        self.corpus_size
    }

    /// Number of explicitly weighted tokens; zero for an unweighted map.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[inline]
    pub fn get(&self, token: &str) -> f64 {
        if !self.weighted {
            return 1.0;
        }
        self.weights
            .get(token)
            .copied()
            .unwrap_or_else(|| (self.corpus_size.max(1) as f64).log10())
    }
}

impl EstimateSize for TokenWeights {
    fn heap_size(&self) -> u64 {
        self.weights.heap_size()
    }
}

/// Computes the token weights of a join over `a` and `b`.
///
/// With `containment`, frequencies are counted over the larger side only (`b` when
/// `smaller_a`, else `a`); otherwise over both. Unweighted joins get an empty map.
pub fn compute_weights(
    a: &Dataset<TokenizedRecord>,
    b: &Dataset<TokenizedRecord>,
    smaller_a: bool,
    containment: bool,
    weighted: bool,
) -> TokenWeights {
    let roles = JoinRoles::assign(smaller_a, containment, weighted);
    if !weighted {
        return TokenWeights::unweighted();
    }
    TokenWeights::from_statistics(&CorpusStatistics::compute(a, b, &roles))
}
