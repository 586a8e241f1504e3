//! Immutable, indexed view of a configuration document.
//!
//! Each scope (root or subcommand) owns an arena of arguments. Ids are handed
//! out in ascending name order, so a `BTreeSet<ArgId>` iterates in the same
//! canonical order as the sorted argument names. Every random draw over
//! arguments relies on that ordering.

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{Params, RepeatSpec, SyntaxSpec, ValueSpec};

/// Stable index of an argument within its scope's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArgId(pub(crate) u32);

impl ArgId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Currently-selected arguments of one sample.
pub type Selection = BTreeSet<ArgId>;

/// Generated argument values, keyed by argument.
pub type ValueMap = BTreeMap<ArgId, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub id: ArgId,
    pub name: String,
    pub flags: Vec<String>,
    pub description: String,
    pub probability: f64,
    pub group: Option<String>,
    pub depends_on: Vec<Dependency>,
    pub required: bool,
    pub repeat: Option<RepeatSpec>,
    pub value: ValueSpec,
    pub generator: Option<GeneratorRef>,
}

impl Argument {
    /// Whether solver machinery (repair, dependencies, padding) may add it.
    pub fn addable(&self) -> bool {
        self.probability > 0.0
    }
}

/// Plugin override attached to an argument.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorRef {
    pub name: String,
    pub params: Option<Params>,
}

/// A parsed `depends_on` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub target: Reference,
    /// `Some` for `name=v1,v2` expressions: allowed values of the target.
    pub condition: Option<Vec<String>>,
}

/// What a dependency or rule entry names within a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Argument(ArgId),
    Group(String),
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionalArg {
    pub name: String,
    pub position: i64,
    pub required: bool,
    pub variadic: bool,
    pub value: ValueSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    MutuallyExclusive,
    OneOfRequired,
    AllOrNone,
    /// Recorded so the document round-trips, never enforced.
    Unknown,
}

impl RuleKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "mutually_exclusive" => RuleKind::MutuallyExclusive,
            "one_of_required" => RuleKind::OneOfRequired,
            "all_or_none" => RuleKind::AllOrNone,
            _ => RuleKind::Unknown,
        }
    }
}

/// A rule flattened against one scope's arguments and groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedRule {
    pub kind: RuleKind,
    pub label: String,
    pub description: Option<String>,
    pub members: BTreeSet<ArgId>,
}

/// Arguments, positionals, groups, and rule expansions of one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub(crate) arguments: Vec<Argument>,
    pub(crate) index: BTreeMap<String, ArgId>,
    pub(crate) groups: BTreeMap<String, Vec<ArgId>>,
    pub(crate) rules: Vec<ExpandedRule>,
    pub(crate) positionals: Vec<PositionalArg>,
}

impl Scope {
    pub fn argument(&self, id: ArgId) -> &Argument {
        &self.arguments[id.index()]
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn lookup(&self, name: &str) -> Option<ArgId> {
        self.index.get(name).copied()
    }

    /// Sorted member ids of a group label, if the label exists in this scope.
    pub fn group(&self, label: &str) -> Option<&[ArgId]> {
        self.groups.get(label).map(Vec::as_slice)
    }

    pub fn rules(&self) -> &[ExpandedRule] {
        &self.rules
    }

    /// Positionals in emission order.
    pub fn positionals(&self) -> &[PositionalArg] {
        &self.positionals
    }

    pub fn names<'a>(&'a self, selection: &'a Selection) -> impl Iterator<Item = &'a str> + 'a {
        selection
            .iter()
            .map(move |id| self.argument(*id).name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subcommand {
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub probability: f64,
    pub scope: Scope,
}

/// Which namespace a sample was generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRef {
    Root,
    Subcommand(usize),
}

/// The whole configuration, built once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub tool_name: String,
    pub root: Scope,
    pub subcommands: Vec<Subcommand>,
    /// Root argument ids emitted before the subcommand token.
    pub global_arguments: Vec<ArgId>,
    pub max_args: usize,
    pub equals_form_probability: f64,
    pub syntax: SyntaxSpec,
    /// Rule types seen in the document that are not enforced.
    pub unknown_rule_types: Vec<String>,
}

impl Model {
    pub fn scope(&self, scope: ScopeRef) -> &Scope {
        match scope {
            ScopeRef::Root => &self.root,
            ScopeRef::Subcommand(idx) => &self.subcommands[idx].scope,
        }
    }

    pub fn subcommand(&self, scope: ScopeRef) -> Option<&Subcommand> {
        match scope {
            ScopeRef::Root => None,
            ScopeRef::Subcommand(idx) => self.subcommands.get(idx),
        }
    }

    /// Every scope with its label, root first.
    pub fn scopes(&self) -> impl Iterator<Item = (&str, &Scope)> {
        std::iter::once(("<root>", &self.root)).chain(
            self.subcommands
                .iter()
                .map(|sub| (sub.name.as_str(), &sub.scope)),
        )
    }

    pub fn argument_count(&self) -> usize {
        self.scopes().map(|(_, scope)| scope.arguments.len()).sum()
    }

    pub fn rule_count(&self) -> usize {
        self.root.rules.len()
    }
}
