//! Serde view of a fuzzing configuration document (JSON).
//!
//! These types mirror the document shape one-to-one and carry no derived
//! state. [`crate::core::solver::build_model`] turns them into the indexed
//! [`crate::core::model::Model`] used during generation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form parameters handed to a plugin generator.
pub type Params = Map<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Document {
    pub metadata: Metadata,
    pub arguments: Vec<ArgumentSpec>,
    pub positional: Vec<PositionalSpec>,
    pub subcommands: Vec<SubcommandSpec>,
    pub rules: Vec<RuleSpec>,
    pub global_arguments: Vec<String>,
    pub generation: GenerationSpec,
    pub syntax: SyntaxSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Metadata {
    pub tool_name: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            tool_name: "tool".to_string(),
            version: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub flags: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_probability")]
    pub probability: f64,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub repeat_flag: Option<RepeatSpec>,
    pub value: ValueSpec,
    #[serde(default)]
    pub generator: Option<String>,
    #[serde(default)]
    pub params: Option<Params>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepeatSpec {
    pub probability: f64,
    pub min_occurs: u32,
    pub max_occurs: u32,
}

impl Default for RepeatSpec {
    fn default() -> Self {
        Self {
            probability: 1.0,
            min_occurs: 1,
            max_occurs: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionalSpec {
    pub name: String,
    pub position: i64,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub variadic: bool,
    pub value: ValueSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubcommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_probability")]
    pub probability: f64,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
    #[serde(default)]
    pub positional: Vec<PositionalSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSpec {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub arguments: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSpec {
    pub max_args: usize,
    pub equals_form_probability: f64,
}

impl Default for GenerationSpec {
    fn default() -> Self {
        Self {
            max_args: 20,
            equals_form_probability: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyntaxSpec {
    /// Whether the target tool accepts the same flag more than once.
    pub allow_duplicates: bool,
}

/// Abstract description of the token an argument or positional produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSpec {
    Flag,
    Integer {
        min: i64,
        max: i64,
    },
    IntegerOptional {
        min: i64,
        max: i64,
    },
    Float {
        min: f64,
        max: f64,
    },
    String {
        #[serde(default)]
        pattern: Option<String>,
    },
    Enum {
        #[serde(default)]
        values: Vec<String>,
    },
    List(ListSpec),
    File {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        pattern: Option<String>,
    },
    Directory {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        pattern: Option<String>,
    },
    Custom {
        generator: String,
        #[serde(default)]
        params: Params,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListSpec {
    pub values: Vec<String>,
    pub min: i64,
    pub max: i64,
    pub format: ListFormat,
    pub separator: String,
    pub min_count: usize,
    pub max_count: usize,
}

impl Default for ListSpec {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            min: 0,
            max: 10,
            format: ListFormat::Plain,
            separator: ",".to_string(),
            min_count: 1,
            max_count: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListFormat {
    #[default]
    Plain,
    CsvRange,
}

fn default_probability() -> f64 {
    0.5
}
