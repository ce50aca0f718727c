//! Assignment of the indexed, scanned and weighting sides of a join.

/// One of the two inputs of a join, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// `true` for the side tokenized with the primary column selection.
    pub fn is_primary(self) -> bool {
        self == Side::A
    }
}

/// The collections whose document frequencies drive ranks and weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corpus {
    Only(Side),
    Union,
}

/// Immutable role decision for one join invocation.
///
/// The small side is indexed and published; the large side is scanned. In a
/// containment join the large side is the reference collection, so document
/// frequencies are counted over it alone. Otherwise both collections form the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRoles {
    pub small: Side,
    pub large: Side,
    pub corpus: Corpus,
    pub weighted: bool,
    pub self_join: bool,
}

impl JoinRoles {
    pub fn assign(smaller_a: bool, containment: bool, weighted: bool) -> JoinRoles {
        let small = if smaller_a { Side::A } else { Side::B };
        let large = small.other();
        let corpus = if containment {
            Corpus::Only(large)
        } else {
            Corpus::Union
        };
        JoinRoles {
            small,
            large,
            corpus,
            weighted,
            self_join: false,
        }
    }

    /// Marks the join as a self-join: both inputs are the same collection tokenized
    /// the same way, so each unordered pair is reported once.
    pub fn with_self_join(mut self, self_join: bool) -> JoinRoles {
        self.self_join = self_join;
        self
    }

    /// Number of documents in the weighting corpus.
    pub fn corpus_size(&self, size_a: usize, size_b: usize) -> u64 {
        let size = |side| match side {
            Side::A => size_a as u64,
            Side::B => size_b as u64,
        };
        match self.corpus {
            Corpus::Only(side) => size(side),
            Corpus::Union => size_a as u64 + size_b as u64,
        }
    }
}
