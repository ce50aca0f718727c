//! Seeded synthetic text generation.
//!
//! Every generator takes an explicit seed so tests are reproducible.

use std::ops::Range;

/// Generates `size` distinct lowercase words.
pub fn vocabulary(size: usize, seed: u64) -> Vec<String> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut words = std::collections::BTreeSet::new();
    while words.len() < size {
        let len = rng.usize(2..8);
        let word = (0..len).map(|_| rng.lowercase()).collect::<String>();
        words.insert(word);
    }
    let mut words = words.into_iter().collect::<Vec<_>>();
    rng.shuffle(&mut words);
    words
}

/// Picks vocabulary entries with a skew towards the front, so some words are common
/// and most are rare.
#[derive(Debug, Clone)]
pub struct SkewedPicker {
    rng: fastrand::Rng,
    size: usize,
}

impl SkewedPicker {
    pub fn new(size: usize, seed: u64) -> SkewedPicker {
        assert_ne!(size, 0);
        SkewedPicker {
            rng: fastrand::Rng::with_seed(seed),
            size,
        }
    }

    pub fn pick(&mut self) -> usize {
        // Squaring a uniform sample concentrates picks on low indices.
        let u = self.rng.f64();
        ((u * u) * self.size as f64) as usize % self.size
    }
}

/// Generates `count` documents of space-separated words drawn from `vocab`.
pub fn documents(count: usize, vocab: &[String], words: Range<usize>, seed: u64) -> Vec<String> {
    assert!(!vocab.is_empty());
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut picker = SkewedPicker::new(vocab.len(), seed.wrapping_add(1));
    (0..count)
        .map(|_| {
            let len = rng.usize(words.clone());
            (0..len)
                .map(|_| vocab[picker.pick()].as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Derives a perturbed copy of every document: each word is kept, dropped or replaced
/// by a random vocabulary word, with probability `edit_rate` of being changed.
pub fn near_duplicates(docs: &[String], vocab: &[String], edit_rate: f64, seed: u64) -> Vec<String> {
    assert!(!vocab.is_empty());
    let mut rng = fastrand::Rng::with_seed(seed);
    docs.iter()
        .map(|doc| {
            doc.split_whitespace()
                .filter_map(|word| {
                    if rng.f64() >= edit_rate {
                        Some(word.to_string())
                    } else if rng.bool() {
                        None
                    } else {
                        Some(vocab[rng.usize(..vocab.len())].clone())
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Mixes `docs` with near-duplicates of a random subset of them and shuffles the result.
pub fn with_duplicates(docs: &[String], vocab: &[String], share: f64, seed: u64) -> Vec<String> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let sources = docs
        .iter()
        .filter(|_| rng.f64() < share)
        .cloned()
        .collect::<Vec<_>>();
    let mut all = docs.to_vec();
    all.extend(near_duplicates(&sources, vocab, 0.2, seed.wrapping_add(7)));
    rng.shuffle(&mut all);
    all
}
