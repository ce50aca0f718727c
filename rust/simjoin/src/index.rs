//! Inverted index over the rank-sorted token sets of the small side.

use ahash::AHashMap;
use simjoin_workflow::{Dataset, EstimateSize};

use crate::{
    rank::TokenRanks,
    record::{RecordId, TokenizedRecord},
};

/// Token -> ascending, distinct list of the records whose token set contains it.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    postings: AHashMap<String, Vec<RecordId>>,
}

impl InvertedIndex {
    /// Builds the index over `records`.
    ///
    /// Records with fewer than `min_size` distinct tokens cannot match and are left out.
    /// Every token of an indexed record is posted, not only a prefix: the probing side
    /// prunes its own tokens, so the index must cover complete sets.
    pub fn build(
        records: &Dataset<(RecordId, TokenizedRecord)>,
        ranks: &TokenRanks,
        min_size: usize,
    ) -> InvertedIndex {
        let mut postings = records.group_by_key(|(id, (tokens, _))| {
            let mut sorted = tokens.clone();
            ranks.sort_tokens(&mut sorted);
            sorted.dedup();
            if sorted.len() < min_size {
                sorted.clear();
            }
            sorted.into_iter().map(|token| (token, *id)).collect::<Vec<_>>()
        });
        for ids in postings.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        InvertedIndex { postings }
    }

    pub fn get(&self, token: &str) -> &[RecordId] {
        self.postings.get(token).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct indexed tokens.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Total number of postings.
    pub fn postings_count(&self) -> usize {
        self.postings.values().map(Vec::len).sum()
    }

    /// Number of distinct records present in the index.
    pub fn indexed_records(&self) -> usize {
        let mut ids = self.postings.values().flatten().collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

impl EstimateSize for InvertedIndex {
    fn heap_size(&self) -> u64 {
        self.postings.heap_size()
    }
}
