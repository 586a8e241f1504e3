//! Builds the [`Model`] from a parsed document.
//!
//! Pure and deterministic: no randomness is consumed here. Group indexes and
//! rule expansions are computed once per scope so the validator's fixpoint
//! loop never touches names.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::core::invariants::validate_document;
use crate::core::model::{
    ArgId, Argument, Dependency, ExpandedRule, GeneratorRef, Model, PositionalArg, Reference,
    RuleKind, Scope, Subcommand,
};
use crate::document::{ArgumentSpec, Document, PositionalSpec, RuleSpec};
use crate::error::FuzzError;

/// Parse a document into the indexed model.
///
/// Fails with [`FuzzError::Config`] listing every semantic violation found.
pub fn build_model(doc: &Document) -> Result<Model, FuzzError> {
    let errors = validate_document(doc);
    if !errors.is_empty() {
        return Err(FuzzError::Config(errors.join("; ")));
    }

    let root = build_scope("<root>", &doc.arguments, &doc.positional, &doc.rules);
    let subcommands = doc
        .subcommands
        .iter()
        .map(|sub| Subcommand {
            name: sub.name.clone(),
            description: sub.description.clone(),
            aliases: sub.aliases.clone(),
            probability: sub.probability,
            scope: build_scope(&sub.name, &sub.arguments, &sub.positional, &doc.rules),
        })
        .collect();

    let mut global_arguments = Vec::new();
    for name in &doc.global_arguments {
        match root.lookup(name) {
            Some(id) => global_arguments.push(id),
            None => warn!(argument = %name, "global argument is not a root argument; ignoring"),
        }
    }
    global_arguments.sort();
    global_arguments.dedup();

    let unknown_rule_types: Vec<String> = doc
        .rules
        .iter()
        .filter(|rule| RuleKind::parse(&rule.rule_type) == RuleKind::Unknown)
        .map(|rule| rule.rule_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    for rule_type in &unknown_rule_types {
        warn!(rule_type = %rule_type, "unknown rule type is recorded but not enforced");
    }

    let model = Model {
        tool_name: doc.metadata.tool_name.clone(),
        root,
        subcommands,
        global_arguments,
        max_args: doc.generation.max_args,
        equals_form_probability: doc.generation.equals_form_probability,
        syntax: doc.syntax.clone(),
        unknown_rule_types,
    };
    debug!(
        arguments = model.argument_count(),
        subcommands = model.subcommands.len(),
        rules = model.rule_count(),
        "model built"
    );
    Ok(model)
}

fn build_scope(
    label: &str,
    arguments: &[ArgumentSpec],
    positionals: &[PositionalSpec],
    rules: &[RuleSpec],
) -> Scope {
    let mut sorted: Vec<&ArgumentSpec> = arguments.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let index: BTreeMap<String, ArgId> = sorted
        .iter()
        .enumerate()
        .map(|(idx, spec)| (spec.name.clone(), ArgId(idx as u32)))
        .collect();

    // Members are pushed in id order, so every member list is already sorted.
    let mut groups: BTreeMap<String, Vec<ArgId>> = BTreeMap::new();
    for (idx, spec) in sorted.iter().enumerate() {
        if let Some(group) = &spec.group {
            groups
                .entry(group.clone())
                .or_default()
                .push(ArgId(idx as u32));
        }
    }

    let arguments = sorted
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            let depends_on = spec
                .depends_on
                .iter()
                .map(|raw| parse_dependency(raw, &index, &groups))
                .collect::<Vec<_>>();
            for dep in &depends_on {
                if let Reference::Unresolved(name) = &dep.target {
                    warn!(
                        scope = label,
                        argument = %spec.name,
                        reference = %name,
                        "dependency names no argument or group in scope"
                    );
                }
            }
            Argument {
                id: ArgId(idx as u32),
                name: spec.name.clone(),
                flags: spec.flags.clone(),
                description: spec.description.clone(),
                probability: spec.probability,
                group: spec.group.clone(),
                depends_on,
                required: spec.required,
                repeat: spec.repeat_flag,
                value: spec.value.clone(),
                generator: spec.generator.as_ref().map(|name| GeneratorRef {
                    name: name.clone(),
                    params: spec.params.clone(),
                }),
            }
        })
        .collect();

    let rules = rules
        .iter()
        .map(|rule| ExpandedRule {
            kind: RuleKind::parse(&rule.rule_type),
            label: rule.rule_type.clone(),
            description: rule.description.clone(),
            members: expand_references(&rule.arguments, &index, &groups),
        })
        .collect();

    let mut positionals: Vec<PositionalArg> = positionals
        .iter()
        .map(|pos| PositionalArg {
            name: pos.name.clone(),
            position: pos.position,
            required: pos.required,
            variadic: pos.variadic,
            value: pos.value.clone(),
        })
        .collect();
    positionals.sort_by_key(|pos| pos.position);

    Scope {
        arguments,
        index,
        groups,
        rules,
        positionals,
    }
}

/// Parse `name` or `name=v1,v2` into a dependency against one scope.
pub fn parse_dependency(
    raw: &str,
    index: &BTreeMap<String, ArgId>,
    groups: &BTreeMap<String, Vec<ArgId>>,
) -> Dependency {
    let (name, condition) = match raw.split_once('=') {
        Some((name, values)) => (
            name.trim(),
            Some(values.split(',').map(|v| v.trim().to_string()).collect()),
        ),
        None => (raw.trim(), None),
    };
    Dependency {
        target: resolve(name, index, groups),
        condition,
    }
}

/// Groups take precedence over arguments of the same name.
fn resolve(
    name: &str,
    index: &BTreeMap<String, ArgId>,
    groups: &BTreeMap<String, Vec<ArgId>>,
) -> Reference {
    if groups.contains_key(name) {
        return Reference::Group(name.to_string());
    }
    match index.get(name) {
        Some(id) => Reference::Argument(*id),
        None => Reference::Unresolved(name.to_string()),
    }
}

/// Flatten argument-or-group references into argument ids.
///
/// References that name nothing in the scope are dropped.
pub fn expand_references(
    references: &[String],
    index: &BTreeMap<String, ArgId>,
    groups: &BTreeMap<String, Vec<ArgId>>,
) -> BTreeSet<ArgId> {
    let mut expanded = BTreeSet::new();
    for name in references {
        if let Some(members) = groups.get(name) {
            expanded.extend(members.iter().copied());
        } else if let Some(id) = index.get(name) {
            expanded.insert(*id);
        }
    }
    expanded
}
