//! All-pairs join: the reference result and the fallback for featurizers without an
//! overlap bound.

use simjoin_workflow::Dataset;

use crate::{
    featurizer::SimilarityFeaturizer,
    record::Record,
    roles::{JoinRoles, Side},
    weights::TokenWeights,
};

pub(crate) struct NaiveOutcome {
    pub pairs: Dataset<(Record, Record)>,
    pub tested: u64,
}

/// Tests every pair of the cross product with [`SimilarityFeaturizer::featurize`].
///
/// Pairs are oriented `(large-side record, small-side record)`. A self-join numbers the
/// records and only tests `(id1, id2)` with `id2 < id1`.
pub(crate) fn join(
    featurizer: &dyn SimilarityFeaturizer,
    a: &Dataset<Record>,
    b: &Dataset<Record>,
    roles: &JoinRoles,
    weights: &TokenWeights,
) -> NaiveOutcome {
    let (large, small) = match roles.large {
        Side::A => (a, b),
        Side::B => (b, a),
    };
    let large_is_primary = roles.large.is_primary();
    let matches = |scanned: &Record, other: &Record| {
        let (primary, secondary) = if large_is_primary {
            (scanned, other)
        } else {
            (other, scanned)
        };
        featurizer.featurize(primary, secondary, weights) == 1.0
    };

    if roles.self_join {
        let numbered = small.zip_with_unique_id();
        let n = numbered.count() as u64;
        log::debug!("naive self-join over {n} records");
        let pairs = numbered.cartesian_filter_map(&numbered, |(id1, row1), (id2, row2)| {
            (id2 < id1 && matches(row1, row2)).then(|| (row1.clone(), row2.clone()))
        });
        NaiveOutcome {
            pairs,
            tested: n * n.saturating_sub(1) / 2,
        }
    } else {
        log::debug!(
            "naive join: {} x {} records",
            large.count(),
            small.count()
        );
        let pairs = large.cartesian_filter_map(small, |scanned, other| {
            matches(scanned, other).then(|| (scanned.clone(), other.clone()))
        });
        NaiveOutcome {
            pairs,
            tested: large.count() as u64 * small.count() as u64,
        }
    }
}
