//! Deterministic generation logic.
//!
//! Core modules draw all randomness from the caller's seeded stream and reach
//! the filesystem only through [`values::PathSource`], so the same seed and
//! document always yield the same samples.

pub mod assemble;
pub mod combination;
pub mod invariants;
pub mod model;
pub mod mutator;
pub mod pattern;
pub mod registry;
pub mod rng;
pub mod sample;
pub mod solver;
pub mod validator;
pub mod values;
