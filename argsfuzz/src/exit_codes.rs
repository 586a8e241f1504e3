//! Stable exit codes for argsfuzz CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid configuration, settings, missing plugin, or output failure.
pub const INVALID: i32 = 1;
/// `argsfuzz generate` finished without writing a single sample.
pub const EMPTY: i32 = 2;
