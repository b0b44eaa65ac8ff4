//! Serializable definition model for argbind apps.
//!
//! This crate intentionally does **not** depend on the parser itself.
//! The data types here mirror what `argbind::App` can express, and are used for:
//! - storing an app definition as a JSON document
//! - exporting a live app tree (including the current allowed-value sets)

use serde::{Deserialize, Serialize};

/// Current `format-version` written into [`DefinitionV1`].
pub const DEFINITION_FORMAT_VERSION: u32 = 1;

/// Value type names understood by `argbind::App::from_schema`.
pub const VALUE_TYPES: &[&str] = &["TEXT", "INT", "UINT", "FLOAT", "BOOLEAN", "CHAR", "PATH"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct OptionSchema {
    /// Comma separated names, e.g. `-s,--string` or `-i,i`.
    pub names: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Zero-arity boolean flag. `value-type` and arity are ignored when set.
    #[serde(default)]
    pub flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Bind to a vector of `value-type` instead of a single value.
    #[serde(default)]
    pub multiple: bool,
    /// Values per invocation; `-1` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<i32>,
    /// Lower bound when `expected` is a maximum rather than an exact count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_min: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct AppSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub footer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_extras: bool,
    #[serde(default)]
    pub require_subcommand: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<AppSchema>,
}

fn default_true() -> bool {
    true
}

/// JSON document wrapping an [`AppSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DefinitionV1 {
    pub format_version: u32,
    pub app: AppSchema,
}

impl DefinitionV1 {
    pub fn new(app: AppSchema) -> Self {
        Self {
            format_version: DEFINITION_FORMAT_VERSION,
            app,
        }
    }

    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
