//! Semantic checks not expressible via JSON Schema.

use std::collections::BTreeSet;

use regex::Regex;

use crate::document::{ArgumentSpec, Document, ListSpec, PositionalSpec, ValueSpec};

/// Check document invariants that the schema cannot express:
/// - Unique argument names per scope, unique subcommand names
/// - Non-empty flag lists
/// - Probabilities within `[0, 1]` (subcommand weights only non-negative)
/// - `min <= max` for ranges, counts, and repeat policies
/// - File/directory patterns compile as regular expressions
///
/// Returns stable error messages in document order.
pub fn validate_document(doc: &Document) -> Vec<String> {
    let mut errors = Vec::new();

    check_arguments("arguments", &doc.arguments, &mut errors);
    check_positionals("positional", &doc.positional, &mut errors);

    let mut seen = BTreeSet::new();
    for sub in &doc.subcommands {
        let path = format!("subcommands[{}]", sub.name);
        if !seen.insert(sub.name.as_str()) {
            errors.push(format!("duplicate subcommand '{}'", sub.name));
        }
        if !(sub.probability >= 0.0 && sub.probability.is_finite()) {
            errors.push(format!(
                "{path}: probability {} must be a finite non-negative weight",
                sub.probability
            ));
        }
        check_arguments(&format!("{path}.arguments"), &sub.arguments, &mut errors);
        check_positionals(&format!("{path}.positional"), &sub.positional, &mut errors);
    }

    if !unit_interval(doc.generation.equals_form_probability) {
        errors.push(format!(
            "generation.equals_form_probability {} must be within [0, 1]",
            doc.generation.equals_form_probability
        ));
    }

    errors
}

fn check_arguments(path: &str, arguments: &[ArgumentSpec], errors: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    for arg in arguments {
        let arg_path = format!("{path}[{}]", arg.name);
        if !seen.insert(arg.name.as_str()) {
            errors.push(format!("{path}: duplicate argument '{}'", arg.name));
        }
        if arg.flags.is_empty() {
            errors.push(format!("{arg_path}: flags must not be empty"));
        }
        if !unit_interval(arg.probability) {
            errors.push(format!(
                "{arg_path}: probability {} must be within [0, 1]",
                arg.probability
            ));
        }
        if let Some(repeat) = &arg.repeat_flag {
            if !unit_interval(repeat.probability) {
                errors.push(format!(
                    "{arg_path}: repeat_flag.probability {} must be within [0, 1]",
                    repeat.probability
                ));
            }
            if repeat.min_occurs > repeat.max_occurs {
                errors.push(format!(
                    "{arg_path}: repeat_flag.min_occurs {} exceeds max_occurs {}",
                    repeat.min_occurs, repeat.max_occurs
                ));
            }
        }
        if arg.generator.as_deref().is_some_and(|name| name.trim().is_empty()) {
            errors.push(format!("{arg_path}: generator must not be empty"));
        }
        check_value(&arg_path, &arg.value, errors);
    }
}

fn check_positionals(path: &str, positionals: &[PositionalSpec], errors: &mut Vec<String>) {
    for pos in positionals {
        check_value(&format!("{path}[{}]", pos.name), &pos.value, errors);
    }
}

fn check_value(path: &str, value: &ValueSpec, errors: &mut Vec<String>) {
    match value {
        ValueSpec::Integer { min, max } | ValueSpec::IntegerOptional { min, max } => {
            if min > max {
                errors.push(format!("{path}: value.min {min} exceeds value.max {max}"));
            }
        }
        ValueSpec::Float { min, max } => {
            if !(min.is_finite() && max.is_finite()) || min > max {
                errors.push(format!(
                    "{path}: value range [{min}, {max}] must be finite and ordered"
                ));
            }
        }
        ValueSpec::List(list) => check_list(path, list, errors),
        ValueSpec::File { pattern, .. } | ValueSpec::Directory { pattern, .. } => {
            if let Some(pattern) = pattern.as_deref().filter(|p| !p.is_empty()) {
                if let Err(err) = Regex::new(pattern) {
                    errors.push(format!("{path}: invalid pattern '{pattern}': {err}"));
                }
            }
        }
        ValueSpec::Custom { generator, .. } => {
            if generator.trim().is_empty() {
                errors.push(format!("{path}: value.generator must not be empty"));
            }
        }
        ValueSpec::Flag | ValueSpec::String { .. } | ValueSpec::Enum { .. } => {}
    }
}

fn check_list(path: &str, list: &ListSpec, errors: &mut Vec<String>) {
    if list.min_count > list.max_count {
        errors.push(format!(
            "{path}: value.min_count {} exceeds value.max_count {}",
            list.min_count, list.max_count
        ));
    }
    if list.values.is_empty() && list.min > list.max {
        errors.push(format!(
            "{path}: value.min {} exceeds value.max {}",
            list.min, list.max
        ));
    }
}

fn unit_interval(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}
