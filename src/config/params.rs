//! Placeholder substitution for raw pipeline documents.
//!
//! Placeholders are written `${NAME}`. Resolution requires the set of
//! placeholders in the text and the set of supplied parameter names to be
//! identical; every occurrence is then replaced by the parameter's scalar text.

use crate::error::{shape_of, Error, Result};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Substitute `parameters` into `raw`.
///
/// `None` means no substitution is expected, so `raw` must contain no
/// placeholders.
pub fn resolve(raw: &str, parameters: Option<&Value>) -> Result<String> {
    let values = match parameters {
        Some(parameters) => scalar_values(parameters)?,
        None => BTreeMap::new(),
    };

    let declared = placeholders(raw);
    let supplied: BTreeSet<&str> = values.keys().map(String::as_str).collect();

    if declared != supplied {
        return Err(Error::TemplateMismatch {
            missing: declared
                .difference(&supplied)
                .map(|s| s.to_string())
                .collect(),
            unused: supplied
                .difference(&declared)
                .map(|s| s.to_string())
                .collect(),
        });
    }

    Ok(substitute(raw, &values))
}

/// Names of all placeholders occurring in `text`
pub fn placeholders(text: &str) -> BTreeSet<&str> {
    scan(text)
        .filter_map(|token| match token {
            Token::Placeholder(name) => Some(name),
            Token::Text(_) => None,
        })
        .collect()
}

/// Validate the parameter argument and render every value to text
fn scalar_values(parameters: &Value) -> Result<BTreeMap<String, String>> {
    let mapping = match parameters {
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(Error::MalformedParameters {
                found: shape_of(other),
            })
        }
    };

    let mut values = BTreeMap::new();
    for (key, value) in mapping {
        let key = match key {
            Value::String(key) => key,
            other => {
                return Err(Error::InvalidParameterValue {
                    key: describe_key(other),
                    reason: format!("parameter names must be strings, got {}", shape_of(other)),
                })
            }
        };

        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(Error::InvalidParameterValue {
                    key: key.clone(),
                    reason: format!(
                        "values must be strings, numbers or booleans, got {}",
                        shape_of(other)
                    ),
                })
            }
        };

        values.insert(key.clone(), text);
    }

    Ok(values)
}

fn describe_key(key: &Value) -> String {
    serde_yaml::to_string(key)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| shape_of(key).to_string())
}

fn substitute(raw: &str, values: &BTreeMap<String, String>) -> String {
    let mut rendered = String::with_capacity(raw.len());
    for token in scan(raw) {
        match token {
            Token::Text(text) => rendered.push_str(text),
            // Every placeholder has a value once the name sets match
            Token::Placeholder(name) => {
                if let Some(value) = values.get(name) {
                    rendered.push_str(value);
                }
            }
        }
    }
    rendered
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn scan(text: &str) -> Scanner<'_> {
    Scanner { rest: text }
}

/// Splits text into literal runs and `${IDENT}` placeholders
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        if let Some(name) = placeholder_at(self.rest) {
            // "${" + name + "}"
            self.rest = &self.rest[name.len() + 3..];
            return Some(Token::Placeholder(name));
        }

        // Literal text up to the next placeholder start (skipping a '$' at 0)
        let mut end = self.rest.len();
        for (i, _) in self.rest.match_indices('$').filter(|(i, _)| *i > 0) {
            if placeholder_at(&self.rest[i..]).is_some() {
                end = i;
                break;
            }
        }

        let (text, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(Token::Text(text))
    }
}

/// The placeholder name if `text` starts with `${IDENT}`
fn placeholder_at(text: &str) -> Option<&str> {
    let body = text.strip_prefix("${")?;
    let close = body.find('}')?;
    let name = &body[..close];

    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(name)
}
