//! Concrete token synthesis for every value kind.

use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::index;
use regex::Regex;
use tracing::debug;

use crate::core::model::GeneratorRef;
use crate::core::pattern::{strip_metacharacters, synthesize};
use crate::core::registry::GeneratorRegistry;
use crate::core::rng::{chance, pick};
use crate::document::{ListFormat, ListSpec, Params, ValueSpec};
use crate::error::FuzzError;

/// Chance that an `integer_optional` argument is emitted without a value.
pub const OPTIONAL_OMIT_PROBABILITY: f64 = 0.3;

/// Upper bound on directories collected from one recursive scan.
pub const MAX_DIRECTORY_RESULTS: usize = 100;

/// Read-only filesystem view plus the two writes dummy paths may need.
///
/// Every listing comes back in sorted order.
pub trait PathSource {
    fn is_dir(&self, path: &Path) -> bool;

    /// Regular files directly inside `dir`.
    fn files(&self, dir: &Path) -> Vec<PathBuf>;

    /// Directories below `dir`, depth-first.
    fn directories<'a>(&'a self, dir: &Path) -> Box<dyn Iterator<Item = PathBuf> + 'a>;

    fn temp_dir(&self) -> PathBuf;

    fn touch(&self, path: &Path) -> io::Result<()>;

    fn create_dir(&self, path: &Path) -> io::Result<()>;
}

/// Turns a [`ValueSpec`] into a token, consulting plugins when asked to.
pub struct ValueSynthesizer<'a> {
    registry: &'a GeneratorRegistry,
    paths: &'a dyn PathSource,
    create_dummy_files: bool,
}

impl<'a> ValueSynthesizer<'a> {
    pub fn new(
        registry: &'a GeneratorRegistry,
        paths: &'a dyn PathSource,
        create_dummy_files: bool,
    ) -> Self {
        Self {
            registry,
            paths,
            create_dummy_files,
        }
    }

    /// Produce the token for `value`, or `None` when the argument carries no
    /// value this time.
    ///
    /// A plugin override wins over the built-in kind. Override parameters
    /// fall back to the value's own `params` when absent or empty.
    pub fn generate<R: Rng>(
        &self,
        rng: &mut R,
        value: &ValueSpec,
        arg_name: &str,
        generator: Option<&GeneratorRef>,
    ) -> Result<Option<String>, FuzzError> {
        let own_params = match value {
            ValueSpec::Custom { params, .. } => Some(params),
            _ => None,
        };
        if let Some(generator) = generator {
            let params = generator
                .params
                .as_ref()
                .filter(|params| !params.is_empty())
                .or(own_params);
            return self.custom(rng, &generator.name, params, arg_name).map(Some);
        }

        let token = match value {
            ValueSpec::Flag => None,
            ValueSpec::Integer { min, max } => Some(rng.gen_range(*min..=*max).to_string()),
            ValueSpec::IntegerOptional { min, max } => {
                if chance(rng, OPTIONAL_OMIT_PROBABILITY) {
                    None
                } else {
                    Some(rng.gen_range(*min..=*max).to_string())
                }
            }
            ValueSpec::Float { min, max } => Some(format!("{:.2}", rng.gen_range(*min..=*max))),
            ValueSpec::String { pattern } => Some(self.string(rng, pattern.as_deref())),
            ValueSpec::Enum { values } => Some(
                pick(rng, values)
                    .cloned()
                    .unwrap_or_else(|| "default".to_string()),
            ),
            ValueSpec::List(list) => Some(list_value(rng, list)),
            ValueSpec::File { path, pattern } => Some(self.file(rng, path.as_deref(), pattern.as_deref())),
            ValueSpec::Directory { path, pattern } => {
                Some(self.directory(rng, path.as_deref(), pattern.as_deref()))
            }
            ValueSpec::Custom { generator, params } => {
                Some(self.custom(rng, generator, Some(params), arg_name)?)
            }
        };
        Ok(token)
    }

    fn custom<R: Rng>(
        &self,
        rng: &mut R,
        name: &str,
        params: Option<&Params>,
        arg_name: &str,
    ) -> Result<String, FuzzError> {
        let Some(generator) = self.registry.lookup(name) else {
            return Err(FuzzError::PluginNotFound {
                generator: name.to_string(),
                argument: arg_name.to_string(),
                available: self.registry.names(),
            });
        };
        let empty = Params::new();
        Ok(generator(rng, params.unwrap_or(&empty)))
    }

    fn string<R: Rng>(&self, rng: &mut R, pattern: Option<&str>) -> String {
        let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
            return format!("value_{}", rng.gen_range(100..=999));
        };
        if let Some(value) = synthesize(rng, pattern) {
            return value;
        }
        let literal = strip_metacharacters(pattern);
        if literal.is_empty() {
            format!("string_{}", rng.gen_range(1000..=9999))
        } else {
            literal
        }
    }

    fn file<R: Rng>(&self, rng: &mut R, path: Option<&str>, pattern: Option<&str>) -> String {
        let root = path.filter(|p| !p.is_empty()).map(Path::new);
        let pattern = pattern.filter(|p| !p.is_empty());
        if let Some(root) = root.filter(|root| self.paths.is_dir(root)) {
            let matcher = compile(pattern);
            let files: Vec<PathBuf> = self
                .paths
                .files(root)
                .into_iter()
                .filter(|file| matches(matcher.as_ref(), file))
                .collect();
            if let Some(found) = pick(rng, &files) {
                return found.display().to_string();
            }
        }

        let name = match pattern {
            Some(pattern) => synthesize(rng, pattern).unwrap_or_else(|| {
                format!("file_{}.{}", rng.gen_range(1..=9999), extension(pattern))
            }),
            None => format!("file_{}.dat", rng.gen_range(1..=9999)),
        };
        let dummy = self.dummy_base(root).join(name);
        if self.create_dummy_files {
            if let Err(err) = self.paths.touch(&dummy) {
                debug!(path = %dummy.display(), error = %err, "could not create dummy file");
            }
        }
        dummy.display().to_string()
    }

    fn directory<R: Rng>(&self, rng: &mut R, path: Option<&str>, pattern: Option<&str>) -> String {
        let root = path.filter(|p| !p.is_empty()).map(Path::new);
        let pattern = pattern.filter(|p| !p.is_empty());
        if let Some(root) = root.filter(|root| self.paths.is_dir(root)) {
            let matcher = compile(pattern);
            let dirs: Vec<PathBuf> = self
                .paths
                .directories(root)
                .filter(|dir| matches(matcher.as_ref(), dir))
                .take(MAX_DIRECTORY_RESULTS)
                .collect();
            if let Some(found) = pick(rng, &dirs) {
                return found.display().to_string();
            }
        }

        let name = match pattern {
            Some(pattern) => synthesize(rng, pattern).unwrap_or_else(|| {
                let literal = strip_metacharacters(pattern);
                if literal.is_empty() {
                    format!("dir_{}", rng.gen_range(1..=9999))
                } else {
                    literal
                }
            }),
            None => format!("dir_{}", rng.gen_range(1..=9999)),
        };
        let dummy = self.dummy_base(root).join(name);
        if self.create_dummy_files {
            if let Err(err) = self.paths.create_dir(&dummy) {
                debug!(path = %dummy.display(), error = %err, "could not create dummy directory");
            }
        }
        dummy.display().to_string()
    }

    fn dummy_base(&self, root: Option<&Path>) -> PathBuf {
        match root {
            Some(root) if self.paths.is_dir(root) => root.to_path_buf(),
            _ => self.paths.temp_dir(),
        }
    }
}

/// Patterns were checked when the model was built; a failure here only means
/// "match everything".
fn compile(pattern: Option<&str>) -> Option<Regex> {
    pattern.and_then(|p| Regex::new(p).ok())
}

/// Match against the entry name or the full path.
fn matches(matcher: Option<&Regex>, path: &Path) -> bool {
    let Some(matcher) = matcher else {
        return true;
    };
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    matcher.is_match(&name) || matcher.is_match(&path.to_string_lossy())
}

/// Literal extension at the end of a file pattern (`\.ext` or `\.ext$`).
fn extension(pattern: &str) -> &str {
    let body = pattern.strip_suffix('$').unwrap_or(pattern);
    match body.rfind(r"\.") {
        Some(at) => {
            let ext = &body[at + 2..];
            if !ext.is_empty() && ext.chars().all(|c| c.is_alphanumeric() || c == '_') {
                ext
            } else {
                "dat"
            }
        }
        None => "dat",
    }
}

fn list_value<R: Rng>(rng: &mut R, list: &ListSpec) -> String {
    let upper = if list.values.is_empty() {
        list.max_count
    } else {
        list.max_count.min(list.values.len())
    };
    let count = if list.min_count >= upper {
        upper
    } else {
        rng.gen_range(list.min_count..=upper)
    };

    if !list.values.is_empty() {
        let chosen: Vec<&str> = index::sample(rng, list.values.len(), count)
            .into_iter()
            .map(|idx| list.values[idx].as_str())
            .collect();
        return chosen.join(&list.separator);
    }

    let numbers: Vec<i64> = (0..count)
        .map(|_| rng.gen_range(list.min..=list.max))
        .collect();
    match list.format {
        ListFormat::CsvRange => format_csv_range(&numbers),
        ListFormat::Plain => numbers
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(&list.separator),
    }
}

/// Sort, de-duplicate, and collapse consecutive runs: `[5,2,3,9,2]` → `2-3,5,9`.
pub fn format_csv_range(numbers: &[i64]) -> String {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let (mut start, mut prev) = (first, first);
    for n in iter {
        if n == prev + 1 {
            prev = n;
            continue;
        }
        parts.push(render_run(start, prev));
        start = n;
        prev = n;
    }
    parts.push(render_run(start, prev));
    parts.join(",")
}

fn render_run(start: i64, end: i64) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::seeded;
    use crate::test_support::MemoryPaths;
    use serde_json::{Value, json};

    fn synthesizer<'a>(registry: &'a GeneratorRegistry, paths: &'a MemoryPaths) -> ValueSynthesizer<'a> {
        ValueSynthesizer::new(registry, paths, false)
    }

    #[test]
    fn csv_range_examples() {
        assert_eq!(format_csv_range(&[5, 2, 3, 9, 2]), "2-3,5,9");
        assert_eq!(format_csv_range(&[]), "");
        assert_eq!(format_csv_range(&[7]), "7");
        assert_eq!(format_csv_range(&[1, 2, 3, 4]), "1-4");
    }

    #[test]
    fn extension_is_read_from_pattern_tail() {
        assert_eq!(extension(r"^.*\.json$"), "json");
        assert_eq!(extension(r"\.tar"), "tar");
        assert_eq!(extension("data.*"), "dat");
    }

    #[test]
    fn scalar_kinds_stay_in_range() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(10);

        for _ in 0..50 {
            let int = values
                .generate(&mut rng, &ValueSpec::Integer { min: -3, max: 3 }, "n", None)
                .expect("integer")
                .expect("value");
            assert!((-3..=3).contains(&int.parse::<i64>().expect("parse")));

            let float = values
                .generate(&mut rng, &ValueSpec::Float { min: 0.5, max: 1.5 }, "f", None)
                .expect("float")
                .expect("value");
            assert_eq!(float.split('.').nth(1).map(str::len), Some(2), "{float}");
        }
        assert_eq!(
            values
                .generate(&mut rng, &ValueSpec::Flag, "v", None)
                .expect("flag"),
            None
        );
    }

    #[test]
    fn integer_optional_sometimes_omits() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(3);
        let spec = ValueSpec::IntegerOptional { min: 1, max: 2 };
        let outcomes: Vec<Option<String>> = (0..100)
            .map(|_| values.generate(&mut rng, &spec, "n", None).expect("value"))
            .collect();
        assert!(outcomes.iter().any(Option::is_none));
        assert!(outcomes.iter().any(Option::is_some));
    }

    #[test]
    fn enum_without_values_yields_default() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(3);
        let token = values
            .generate(&mut rng, &ValueSpec::Enum { values: Vec::new() }, "mode", None)
            .expect("enum");
        assert_eq!(token.as_deref(), Some("default"));
    }

    #[test]
    fn string_without_pattern_uses_placeholder() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(3);
        let token = values
            .generate(&mut rng, &ValueSpec::String { pattern: None }, "name", None)
            .expect("string")
            .expect("value");
        assert!(token.starts_with("value_") && token.len() == 9, "{token}");
    }

    #[test]
    fn fixed_value_list_samples_without_replacement() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(4);
        let spec = ValueSpec::List(ListSpec {
            values: vec!["a".into(), "b".into()],
            separator: ":".to_string(),
            min_count: 1,
            max_count: 5,
            ..ListSpec::default()
        });
        for _ in 0..20 {
            let token = values
                .generate(&mut rng, &spec, "items", None)
                .expect("list")
                .expect("value");
            let parts: Vec<&str> = token.split(':').collect();
            assert!((1..=2).contains(&parts.len()));
            if parts.len() == 2 {
                assert_ne!(parts[0], parts[1]);
            }
        }
    }

    #[test]
    fn csv_range_list_renders_runs() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(4);
        let spec = ValueSpec::List(ListSpec {
            min: 0,
            max: 3,
            format: ListFormat::CsvRange,
            min_count: 3,
            max_count: 3,
            ..ListSpec::default()
        });
        let token = values
            .generate(&mut rng, &spec, "cpus", None)
            .expect("list")
            .expect("value");
        assert!(
            Regex::new(r"^\d(-\d)?(,\d(-\d)?)*$")
                .expect("regex")
                .is_match(&token),
            "{token}"
        );
    }

    #[test]
    fn missing_plugin_names_argument_and_available() {
        let registry = GeneratorRegistry::with_builtins();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(0);
        let spec = ValueSpec::Custom {
            generator: "mac_address".to_string(),
            params: Params::new(),
        };
        let err = values
            .generate(&mut rng, &spec, "hwaddr", None)
            .expect_err("missing plugin");
        let message = err.to_string();
        assert!(message.contains("'mac_address'"));
        assert!(message.contains("'hwaddr'"));
        assert!(message.contains("date_time, ip_address, port_range, uuid"));
    }

    #[test]
    fn override_params_fall_back_to_value_params() {
        let registry = GeneratorRegistry::with_builtins();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(0);
        let Value::Object(own) = json!({"format": "compact"}) else {
            panic!("object");
        };
        let spec = ValueSpec::Custom {
            generator: "uuid".to_string(),
            params: own,
        };
        let generator = GeneratorRef {
            name: "uuid".to_string(),
            params: Some(Params::new()),
        };
        let token = values
            .generate(&mut rng, &spec, "id", Some(&generator))
            .expect("uuid")
            .expect("value");
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn override_applies_to_builtin_kind() {
        let registry = GeneratorRegistry::with_builtins();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(0);
        let generator = GeneratorRef {
            name: "uuid".to_string(),
            params: None,
        };
        let token = values
            .generate(&mut rng, &ValueSpec::String { pattern: None }, "id", Some(&generator))
            .expect("uuid")
            .expect("value");
        assert_eq!(token.len(), 36);
    }

    #[test]
    fn file_prefers_matching_real_files() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default()
            .with_dir("/data")
            .with_file("/data/a.json")
            .with_file("/data/b.txt");
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(1);
        let spec = ValueSpec::File {
            path: Some("/data".to_string()),
            pattern: Some(r"\.json$".to_string()),
        };
        for _ in 0..10 {
            let token = values
                .generate(&mut rng, &spec, "input", None)
                .expect("file")
                .expect("value");
            assert_eq!(token, "/data/a.json");
        }
    }

    #[test]
    fn file_falls_back_to_dummy_under_temp_dir() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default();
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(1);
        let spec = ValueSpec::File {
            path: Some("/missing".to_string()),
            pattern: None,
        };
        let token = values
            .generate(&mut rng, &spec, "input", None)
            .expect("file")
            .expect("value");
        assert!(token.starts_with("/tmp/file_") && token.ends_with(".dat"), "{token}");
    }

    #[test]
    fn dummy_files_are_created_when_enabled() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default().with_dir("/work");
        let values = ValueSynthesizer::new(&registry, &paths, true);
        let mut rng = seeded(1);
        let spec = ValueSpec::Directory {
            path: Some("/work".to_string()),
            pattern: None,
        };
        // No directories under /work yet, so a dummy is made.
        let token = values
            .generate(&mut rng, &spec, "out", None)
            .expect("dir")
            .expect("value");
        assert!(token.starts_with("/work/dir_"), "{token}");
        assert!(paths.created().contains(&PathBuf::from(&token)));
    }

    #[test]
    fn failed_dummy_writes_still_yield_tokens() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default().with_dir("/work").read_only();
        let values = ValueSynthesizer::new(&registry, &paths, true);
        let mut rng = seeded(4);
        let file = ValueSpec::File {
            path: Some("/work".to_string()),
            pattern: Some(r"trace_\d{2}\.pcap".to_string()),
        };
        let dir = ValueSpec::Directory {
            path: Some("/work".to_string()),
            pattern: None,
        };
        for _ in 0..5 {
            let token = values
                .generate(&mut rng, &file, "trace", None)
                .expect("file")
                .expect("value");
            assert!(token.starts_with("/work/trace_") && token.ends_with(".pcap"), "{token}");
            let token = values
                .generate(&mut rng, &dir, "out", None)
                .expect("dir")
                .expect("value");
            assert!(token.starts_with("/work/dir_"), "{token}");
        }
        assert!(paths.created().is_empty());
    }

    #[test]
    fn directory_scan_matches_nested_entries() {
        let registry = GeneratorRegistry::new();
        let paths = MemoryPaths::default()
            .with_dir("/src")
            .with_dir("/src/build")
            .with_dir("/src/build/cache")
            .with_dir("/src/docs");
        let values = synthesizer(&registry, &paths);
        let mut rng = seeded(6);
        let spec = ValueSpec::Directory {
            path: Some("/src".to_string()),
            pattern: Some("^cache$".to_string()),
        };
        let token = values
            .generate(&mut rng, &spec, "cache", None)
            .expect("dir")
            .expect("value");
        assert_eq!(token, "/src/build/cache");
    }
}
