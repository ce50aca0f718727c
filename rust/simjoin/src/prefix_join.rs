//! Broadcast prefix-filtering join.
//!
//! The small side is numbered, ranked and indexed once; the index, the numbered rows
//! and the token weights are published as one immutable snapshot. Every scanned
//! record then sorts its tokens rarest first, drops the suffix the featurizer proves
//! irrelevant and probes the index with what is left. Only the records found that
//! way are verified with the full similarity test.

use simjoin_common::Result;
use simjoin_workflow::{Dataset, EstimateSize};

use crate::{
    featurizer::{SimilarityFeaturizer, distinct_count},
    index::InvertedIndex,
    rank::TokenRanks,
    record::{Record, RecordId, TokenizedRecord},
    roles::{JoinRoles, Side},
    weights::{CorpusStatistics, TokenWeights},
};

/// Settings a prefix-filtering join cannot run without.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PrefixSettings {
    pub threshold: f64,
    pub min_size: usize,
}

/// State shared read-only by every scan task.
struct PublishedState {
    index: InvertedIndex,
    /// Small-side rows, indexed by their `RecordId`.
    rows: Vec<TokenizedRecord>,
    weights: TokenWeights,
    ranks: TokenRanks,
}

impl EstimateSize for PublishedState {
    fn heap_size(&self) -> u64 {
        self.index.heap_size()
            + self.rows.heap_size()
            + self.weights.heap_size()
            + self.ranks.heap_size()
    }
}

#[derive(Debug, Clone, Default)]
struct ProbeOutcome {
    candidates: u64,
    matches: Vec<(Record, Record)>,
}

#[derive(Debug, Default)]
pub(crate) struct PrefixJoinOutcome {
    pub pairs: Vec<(Record, Record)>,
    pub indexed_records: u64,
    pub index_tokens: u64,
    pub published_bytes: u64,
    pub scanned: u64,
    pub candidates: u64,
}

pub(crate) fn join(
    featurizer: &dyn SimilarityFeaturizer,
    a: &Dataset<TokenizedRecord>,
    b: &Dataset<TokenizedRecord>,
    roles: &JoinRoles,
    corpus: &CorpusStatistics,
    weights: TokenWeights,
    settings: PrefixSettings,
) -> Result<PrefixJoinOutcome> {
    let (small, large) = match roles.small {
        Side::A => (a, b),
        Side::B => (b, a),
    };
    let PrefixSettings {
        threshold,
        min_size,
    } = settings;

    let ranks = TokenRanks::from_frequencies(&corpus.frequencies);
    let numbered = small.zip_with_unique_id();
    let index = InvertedIndex::build(&numbered, &ranks, min_size);
    let rows = numbered
        .iter()
        .map(|(_, row)| row.clone())
        .collect::<Vec<_>>();
    log::debug!(
        "index: {} records, {} tokens, {} postings",
        index.indexed_records(),
        index.len(),
        index.postings_count()
    );

    let mut outcome = PrefixJoinOutcome {
        indexed_records: index.indexed_records() as u64,
        index_tokens: index.len() as u64,
        ..Default::default()
    };
    let state = small.context().broadcast(
        "prefix join state",
        PublishedState {
            index,
            rows,
            weights,
            ranks,
        },
    )?;
    outcome.published_bytes = state.charged_size();

    let large_is_primary = roles.large.is_primary();
    let probe = |self_id: Option<RecordId>, tokens: &[String], row: &Record| {
        if distinct_count(tokens) < min_size {
            return ProbeOutcome::default();
        }
        let mut sorted = tokens.to_vec();
        state.ranks.sort_tokens(&mut sorted);
        let removed = featurizer
            .removed_size(&sorted, threshold, &state.weights)
            .min(sorted.len());
        let prefix = &sorted[..sorted.len() - removed];

        let mut candidates = prefix
            .iter()
            .flat_map(|token| state.index.get(token))
            .copied()
            .filter(|&id2| self_id.is_none_or(|id1| id2 < id1))
            .collect::<Vec<_>>();
        candidates.sort_unstable();
        candidates.dedup();

        let matches = candidates
            .iter()
            .filter_map(|&id2| {
                let (other_tokens, other_row) = state.rows.get(id2 as usize)?;
                let (primary, secondary) = if large_is_primary {
                    (tokens, other_tokens.as_slice())
                } else {
                    (other_tokens.as_slice(), tokens)
                };
                featurizer
                    .optimized_similarity(primary, secondary, threshold, &state.weights)
                    .0
                    .then(|| (row.clone(), other_row.clone()))
            })
            .collect();
        ProbeOutcome {
            candidates: candidates.len() as u64,
            matches,
        }
    };

    // A self-join scans the numbered small side against itself.
    let probes = if roles.self_join {
        numbered.map_partitions(|part| {
            part.iter()
                .map(|(id, (tokens, row))| probe(Some(*id), tokens, row))
                .collect()
        })
    } else {
        large.map_partitions(|part| {
            part.iter()
                .map(|(tokens, row)| probe(None, tokens, row))
                .collect()
        })
    };

    for probe in probes.into_vec() {
        outcome.scanned += 1;
        outcome.candidates += probe.candidates;
        outcome.pairs.extend(probe.matches);
    }
    Ok(outcome)
}
