//! TES Names — procedural fantasy character names.
//!
//! Builds names from per-race structure templates, filling each token either
//! by weighted literal selection or by sampling a Markov chain trained on a
//! curated name corpus, under syllable and starting-letter constraints.

pub mod core;
pub mod schema;

pub use crate::core::pipeline::{GeneratorError, NameGenerator};
pub use crate::schema::gender::Gender;
pub use crate::schema::params::{GenerationParameters, NameRequest};
