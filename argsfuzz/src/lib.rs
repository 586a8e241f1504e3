//! Seeded generator of command-line argument corpora for fuzzing.
//!
//! A JSON document describes a tool's arguments, groups, rules, and
//! subcommands. From it the crate draws argument combinations that respect
//! the rules, synthesizes values for them, optionally corrupts a share of
//! the samples, and writes one command line per sample.
//!
//! - **[`core`]**: Pure logic (model, constraint repair, value synthesis,
//!   mutation, assembly). Every random draw goes through one seeded stream.
//! - **[`io`]**: Side effects (document loading, settings, filesystem scans,
//!   corpus output).
//!
//! [`fuzz`] ties the two together for `argsfuzz generate`.

pub mod core;
pub mod document;
pub mod error;
pub mod exit_codes;
pub mod fuzz;
pub mod io;
pub mod logging;
pub mod plugins;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
