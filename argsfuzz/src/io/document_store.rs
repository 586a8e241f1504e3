//! Configuration document loading with schema + semantic validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::model::Model;
use crate::core::solver::build_model;
use crate::document::Document;

/// JSON Schema shipped with the binary, used when no schema path is given.
pub const EMBEDDED_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/argsfuzz/v1.schema.json"
));

/// Load a document, checking it against `schema_path` (or the embedded schema).
pub fn load_document(config_path: &Path, schema_path: Option<&Path>) -> Result<Document> {
    let contents = fs::read_to_string(config_path)
        .with_context(|| format!("read config {}", config_path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse config {}", config_path.display()))?;
    let schema = load_schema(schema_path)?;
    validate_schema(&schema, &value)?;
    let doc: Document = serde_json::from_value(value)
        .with_context(|| format!("deserialize config {}", config_path.display()))?;
    debug!(tool = %doc.metadata.tool_name, "config document loaded");
    Ok(doc)
}

/// Load a document and build its model; every configuration error surfaces here.
pub fn load_model(config_path: &Path, schema_path: Option<&Path>) -> Result<Model> {
    let doc = load_document(config_path, schema_path)?;
    let model = build_model(&doc).with_context(|| format!("config {}", config_path.display()))?;
    info!(
        tool = %model.tool_name,
        arguments = model.argument_count(),
        subcommands = model.subcommands.len(),
        rules = model.rule_count(),
        "model ready"
    );
    Ok(model)
}

fn load_schema(schema_path: Option<&Path>) -> Result<Value> {
    match schema_path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("read schema {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parse schema {}", path.display()))
        }
        None => serde_json::from_str(EMBEDDED_SCHEMA).context("parse embedded schema"),
    }
}

fn validate_schema(schema: &Value, doc: &Value) -> Result<()> {
    let compiled = validator_for(schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(doc) {
        let messages = compiled
            .iter_errors(doc)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "config schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
