//! Exact set-similarity joins over partitioned record collections.
//!
//! [`SimilarityJoin`] finds every pair of records whose selected columns are similar
//! according to a [`SimilarityFeaturizer`]. Featurizers that can bound the token
//! overlap a match requires are joined with prefix filtering: the smaller collection
//! is indexed by rarity-ranked tokens, the index is published to every worker, and
//! each record of the larger collection probes it with the rare head of its token
//! set. Other featurizers fall back to testing the full cross product. Both
//! strategies return the same pairs.

pub mod featurizer;
pub mod index;
pub mod join;
mod naive;
mod prefix_join;
pub mod rank;
pub mod record;
pub mod roles;
pub mod weights;

pub use featurizer::{
    EditDistanceFeaturizer, EditDistanceParams, SetMeasure, SetSimilarityFeaturizer,
    SetSimilarityParams, SimilarityFeaturizer,
};
pub use join::{JoinStats, JoinStrategy, MatchedPairs, SimilarityJoin};
pub use record::{Field, Record, RecordId, TokenizedRecord};
pub use roles::JoinRoles;
pub use weights::{TokenWeights, compute_weights};
