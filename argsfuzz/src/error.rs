//! Error types surfaced by the generation core.

use thiserror::Error;

/// Fatal errors raised while building the model or generating samples.
///
/// Constraint inconsistencies are never errors; the validator always heals a
/// selection into some rule-consistent state.
#[derive(Debug, Error)]
pub enum FuzzError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("generator '{generator}' not found for '{argument}'{}", available_suffix(.available))]
    PluginNotFound {
        generator: String,
        argument: String,
        available: Vec<String>,
    },

    #[error("failed to write test case {index}: {source}")]
    Output {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}

fn available_suffix(available: &[String]) -> String {
    if available.is_empty() {
        return String::new();
    }
    format!("; available: {}", available.join(", "))
}
