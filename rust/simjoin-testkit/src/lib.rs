//! Test data for similarity joins: seeded vocabularies, documents and fixtures.

pub mod data_gen;
pub mod fixtures;
