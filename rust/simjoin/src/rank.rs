//! Global rarity ranking of tokens.

use std::cmp::Ordering;

use ahash::AHashMap;
use simjoin_workflow::EstimateSize;

/// Token -> rank, where rarer tokens (lower document frequency) get lower ranks.
///
/// Ties on frequency are broken by the token text, so the mapping depends only on the
/// frequency counts. Tokens missing from the ranking order before every ranked token
/// and among themselves by text: they were never seen in the corpus, so they are the
/// rarest of all.
#[derive(Debug, Clone, Default)]
pub struct TokenRanks {
    ranks: AHashMap<String, usize>,
}

impl TokenRanks {
    pub fn from_frequencies(frequencies: &AHashMap<String, u64>) -> TokenRanks {
        let mut by_rarity = frequencies.iter().collect::<Vec<_>>();
        by_rarity.sort_unstable_by(|(t1, df1), (t2, df2)| df1.cmp(df2).then_with(|| t1.cmp(t2)));
        let ranks = by_rarity
            .into_iter()
            .enumerate()
            .map(|(rank, (token, _))| (token.clone(), rank))
            .collect();
        TokenRanks { ranks }
    }

    pub fn rank(&self, token: &str) -> Option<usize> {
        self.ranks.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Total order used to sort token sequences, rarest first.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(ra), Some(rb)) => ra.cmp(&rb),
            (None, None) => a.cmp(b),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        }
    }

    /// Sorts `tokens` rarest first. Equal tokens end up adjacent.
    pub fn sort_tokens(&self, tokens: &mut [String]) {
        tokens.sort_by(|a, b| self.compare(a, b));
    }
}

impl EstimateSize for TokenRanks {
    fn heap_size(&self) -> u64 {
        self.ranks.heap_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frequencies(counts: &[(&str, u64)]) -> AHashMap<String, u64> {
        counts.iter().map(|(t, c)| (t.to_string(), *c)).collect()
    }

    #[test]
    fn test_ranks_increase_with_frequency() {
        let ranks = TokenRanks::from_frequencies(&frequencies(&[
            ("common", 10),
            ("rare", 1),
            ("mid-b", 5),
            ("mid-a", 5),
        ]));
        assert_eq!(ranks.rank("rare"), Some(0));
        assert_eq!(ranks.rank("mid-a"), Some(1));
        assert_eq!(ranks.rank("mid-b"), Some(2));
        assert_eq!(ranks.rank("common"), Some(3));
        assert_eq!(ranks.rank("unseen"), None);
    }

    #[test]
    fn test_sort_tokens_rarest_first() {
        let ranks = TokenRanks::from_frequencies(&frequencies(&[("a", 3), ("b", 2), ("c", 1)]));
        let mut tokens = ["a", "b", "zz", "c", "a", "yy"]
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>();
        ranks.sort_tokens(&mut tokens);
        assert_eq!(tokens, vec!["yy", "zz", "c", "b", "a", "a"]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        fastrand::seed(4411);
        let counts = (0..500)
            .map(|i| (format!("t{i}"), fastrand::u64(1..20)))
            .collect::<AHashMap<_, _>>();
        let first = TokenRanks::from_frequencies(&counts);
        let second = TokenRanks::from_frequencies(&counts.clone().into_iter().collect());
        for token in counts.keys() {
            assert_eq!(first.rank(token), second.rank(token));
        }
        let mut ordered = counts.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|(token, _)| first.rank(token));
        assert!(ordered.windows(2).all(|w| w[0].1 <= w[1].1));
    }
}
