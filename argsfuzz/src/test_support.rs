//! Test-only builders for documents, models, and an in-memory filesystem.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::assemble::{Role, Token};
use crate::core::model::{Model, Scope, Selection};
use crate::core::solver::build_model;
use crate::core::values::PathSource;
use crate::document::{ArgumentSpec, Document, RuleSpec, ValueSpec};

/// Argument with a single `--name` flag and probability 0.5.
pub fn argument(name: &str, value: ValueSpec) -> ArgumentSpec {
    ArgumentSpec {
        name: name.to_string(),
        flags: vec![format!("--{name}")],
        description: String::new(),
        probability: 0.5,
        group: None,
        depends_on: Vec::new(),
        required: false,
        repeat_flag: None,
        value,
        generator: None,
        params: None,
    }
}

/// Valueless `--name` switch.
pub fn flag(name: &str) -> ArgumentSpec {
    argument(name, ValueSpec::Flag)
}

pub fn document(arguments: Vec<ArgumentSpec>) -> Document {
    Document {
        arguments,
        ..Document::default()
    }
}

pub fn rule(rule_type: &str, arguments: &[&str]) -> RuleSpec {
    RuleSpec {
        rule_type: rule_type.to_string(),
        arguments: arguments.iter().map(|a| a.to_string()).collect(),
        description: None,
    }
}

pub fn model(doc: &Document) -> Model {
    build_model(doc).expect("test document should build")
}

/// Selection of the named arguments; panics on unknown names.
pub fn selection(scope: &Scope, names: &[&str]) -> Selection {
    names
        .iter()
        .map(|name| scope.lookup(name).unwrap_or_else(|| panic!("unknown argument {name}")))
        .collect()
}

/// Sorted names of a selection.
pub fn names(scope: &Scope, selection: &Selection) -> Vec<String> {
    scope.names(selection).map(str::to_string).collect()
}

/// Tokens with roles read off their shape: `-x` is a flag, a bare word right
/// after a detached flag is its value, anything else is positional.
pub fn tokens(items: &[&str]) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(items.len());
    for item in items {
        let role = if item.starts_with('-') {
            Role::Flag
        } else if out
            .last()
            .is_some_and(|prev| prev.role == Role::Flag && !prev.text.contains('='))
        {
            Role::Value
        } else {
            Role::Positional
        };
        out.push(Token::new(*item, role));
    }
    out
}

pub fn texts(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(|token| token.text.clone()).collect()
}

/// In-memory [`PathSource`]; records every dummy it is asked to create.
#[derive(Debug, Default)]
pub struct MemoryPaths {
    dirs: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
    created: RefCell<Vec<PathBuf>>,
    read_only: bool,
}

impl MemoryPaths {
    pub fn with_dir(mut self, path: &str) -> Self {
        self.dirs.insert(PathBuf::from(path));
        self
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.files.insert(PathBuf::from(path));
        self
    }

    /// Every `touch` and `create_dir` fails with `PermissionDenied`.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn created(&self) -> Vec<PathBuf> {
        self.created.borrow().clone()
    }

    fn record(&self, path: &Path) -> io::Result<()> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only: {}", path.display()),
            ));
        }
        self.created.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

impl PathSource for MemoryPaths {
    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn files(&self, dir: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|file| file.parent() == Some(dir))
            .cloned()
            .collect()
    }

    fn directories<'a>(&'a self, dir: &Path) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        let root = dir.to_path_buf();
        Box::new(
            self.dirs
                .iter()
                .filter(move |candidate| candidate.starts_with(&root) && **candidate != root)
                .cloned(),
        )
    }

    fn temp_dir(&self) -> PathBuf {
        PathBuf::from("/tmp")
    }

    fn touch(&self, path: &Path) -> io::Result<()> {
        self.record(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.record(path)
    }
}
