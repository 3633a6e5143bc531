//! Strict reader for the parsed pipeline document tree.
//!
//! ```yaml
//! name: SignalChain            # optional, string or number
//! shared_parameters:           # optional, merged under every node's parameters
//!   sample_rate: 48000
//! modules:
//!   - name: sine
//!     type: SineGenerator
//!     parameters: {frequency: 440}
//!     expose: true             # false | true | "label"
//!   - name: gain
//!     type: Gain
//!     depends_on: [sine]
//!     group: processing
//! ```

use crate::error::{shape_of, Error, Result};
use serde_yaml::{Mapping, Value};

const DOCUMENT_FIELDS: &[&str] = &["name", "modules", "shared_parameters"];
const MODULE_FIELDS: &[&str] = &["name", "type", "parameters", "depends_on", "group", "expose"];

/// How a node entry asks for its output to be exposed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExposeDirective {
    /// The entry has no `expose` field
    #[default]
    Unset,
    /// `expose: false`
    Disabled,
    /// `expose: true`
    UseOwnName,
    /// `expose: "label"`
    CustomLabel(String),
}

impl ExposeDirective {
    /// Final exposure label for node `name` whose type declares `declared`.
    ///
    /// The document always wins; the declared default only applies when the
    /// document is silent.
    pub fn resolve(&self, name: &str, declared: Option<&str>) -> Option<String> {
        match self {
            Self::Unset => declared.map(str::to_string),
            Self::Disabled => None,
            Self::UseOwnName => Some(name.to_string()),
            Self::CustomLabel(label) => Some(label.clone()),
        }
    }
}

/// One node entry of the `modules` list
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub type_name: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub depends_on: Vec<String>,
    pub group: Option<String>,
    pub expose: ExposeDirective,
}

#[derive(Debug, Clone)]
pub struct PipelineDocument {
    /// Raw `name` field, validated later against the name override;
    /// `name: ~` counts as absent
    pub name: Option<Value>,
    pub shared_parameters: serde_json::Map<String, serde_json::Value>,
    pub modules: Vec<NodeSpec>,
}

impl PipelineDocument {
    pub fn from_yaml(tree: &Value) -> Result<Self> {
        let location = "document";
        let root = match tree {
            Value::Mapping(root) => root,
            _ => return Err(invalid(location, "<root>", "a mapping")),
        };
        reject_unknown(root, DOCUMENT_FIELDS, location)?;

        let shared_parameters = match root.get("shared_parameters") {
            Some(value) => parameters(value, location, "shared_parameters")?,
            None => serde_json::Map::new(),
        };

        let entries = match root.get("modules") {
            Some(Value::Sequence(entries)) => entries,
            Some(_) => return Err(invalid(location, "modules", "a sequence")),
            None => return Err(missing(location, "modules")),
        };

        let modules = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| NodeSpec::from_yaml(index, entry))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: root.get("name").filter(|name| !name.is_null()).cloned(),
            shared_parameters,
            modules,
        })
    }
}

impl NodeSpec {
    fn from_yaml(index: usize, entry: &Value) -> Result<Self> {
        let entry = match entry {
            Value::Mapping(entry) => entry,
            _ => {
                return Err(invalid(
                    &format!("module #{index}"),
                    "<entry>",
                    "a mapping",
                ))
            }
        };

        let name = match entry.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err(invalid(&format!("module #{index}"), "name", "a string")),
            None => return Err(missing(&format!("module #{index}"), "name")),
        };

        let location = format!("module `{name}`");
        reject_unknown(entry, MODULE_FIELDS, &location)?;

        let type_name = match entry.get("type") {
            Some(Value::String(type_name)) => type_name.clone(),
            Some(_) => return Err(invalid(&location, "type", "a string")),
            None => return Err(missing(&location, "type")),
        };

        let parameters = match entry.get("parameters") {
            Some(value) => parameters(value, &location, "parameters")?,
            None => serde_json::Map::new(),
        };

        let depends_on = match entry.get("depends_on") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(dependency) => Ok(dependency.clone()),
                    _ => Err(invalid(&location, "depends_on", "a sequence of module names")),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(invalid(&location, "depends_on", "a sequence of module names")),
        };

        let group = match entry.get("group") {
            None | Some(Value::Null) => None,
            Some(Value::String(group)) => Some(group.clone()),
            Some(_) => return Err(invalid(&location, "group", "a string")),
        };

        let expose = match entry.get("expose") {
            None => ExposeDirective::Unset,
            Some(Value::Bool(false)) => ExposeDirective::Disabled,
            Some(Value::Bool(true)) => ExposeDirective::UseOwnName,
            Some(Value::String(label)) if !label.is_empty() => {
                ExposeDirective::CustomLabel(label.clone())
            }
            Some(_) => {
                return Err(invalid(
                    &location,
                    "expose",
                    "a boolean or a non-empty label",
                ))
            }
        };

        Ok(Self {
            name,
            type_name,
            parameters,
            depends_on,
            group,
            expose,
        })
    }
}

fn reject_unknown(mapping: &Mapping, known: &[&str], location: &str) -> Result<()> {
    for key in mapping.keys() {
        let field = match key {
            Value::String(field) if known.contains(&field.as_str()) => continue,
            Value::String(field) => field.clone(),
            other => serde_yaml::to_string(other)
                .map(|s| s.trim_end().to_string())
                .unwrap_or_else(|_| shape_of(other).to_string()),
        };
        return Err(Error::UnexpectedField {
            location: location.to_string(),
            field,
        });
    }
    Ok(())
}

/// A parameter mapping converted to the JSON object handed to `on_create`
fn parameters(
    value: &Value,
    location: &str,
    field: &str,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    match value {
        Value::Null => Ok(serde_json::Map::new()),
        Value::Mapping(_) => match serde_json::to_value(value) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            _ => Err(invalid(location, field, "a mapping with string keys")),
        },
        _ => Err(invalid(location, field, "a mapping")),
    }
}

fn missing(location: &str, field: &str) -> Error {
    Error::MissingField {
        location: location.to_string(),
        field: field.to_string(),
    }
}

fn invalid(location: &str, field: &str, expected: &'static str) -> Error {
    Error::InvalidField {
        location: location.to_string(),
        field: field.to_string(),
        expected,
    }
}
