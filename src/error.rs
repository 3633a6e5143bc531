//! Error types for graph assembly and execution.
//!
//! Every failure aborts the operation it occurs in: a failed build returns no
//! pipeline and a failed run returns no results. [`Error::category`] tells
//! configuration problems (fix the document or parameters) apart from wiring
//! problems (fix the graph) and runtime module failures.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which part of a pipeline definition an error points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Document text, schema or parameters
    Configuration,
    /// Module types, dependencies, interfaces and exposure labels
    Wiring,
    /// A module failed while being created or while running
    Runtime,
}

/// Module lifecycle stage at which a module failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Create,
    Process,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Process => f.write_str("process"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("parameters must be a mapping of names to scalar values, got {found}")]
    MalformedParameters { found: &'static str },

    #[error("invalid parameter {key}: {reason}")]
    InvalidParameterValue { key: String, reason: String },

    #[error("placeholders and parameters differ (no value for: {missing:?}, unused parameters: {unused:?})")]
    TemplateMismatch {
        missing: Vec<String>,
        unused: Vec<String>,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unexpected field `{field}` in {location}")]
    UnexpectedField { location: String, field: String },

    #[error("missing required field `{field}` in {location}")]
    MissingField { location: String, field: String },

    #[error("field `{field}` in {location} must be {expected}")]
    InvalidField {
        location: String,
        field: String,
        expected: &'static str,
    },

    #[error("pipeline name must be a string or a number, got {found}")]
    InvalidName { found: &'static str },

    #[error("module name `{name}` is declared more than once")]
    DuplicateModuleName { name: String },

    #[error("module `{module}` uses unknown module type `{type_name}`")]
    UnknownModuleType { module: String, type_name: String },

    #[error("module type `{type_name}` is not finalized and cannot be instantiated")]
    NonFinalizedModule { type_name: String },

    #[error("module `{module}` depends on `{dependency}`, which is not declared before it")]
    UnknownDependency { module: String, dependency: String },

    #[error("module `{module}` cannot depend on `{dependency}`: {reason}")]
    IncompatibleInterface {
        module: String,
        dependency: String,
        reason: String,
    },

    #[error("modules `{first}` and `{second}` both expose `{label}`")]
    DuplicateExposeLabel {
        label: String,
        first: String,
        second: String,
    },

    #[error("module `{module}` failed to {stage}: {source:#}")]
    ModuleFailed {
        module: String,
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("module `{module}` broke its output contract: {reason}")]
    OutputContract { module: String, reason: String },
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedParameters { .. }
            | Self::InvalidParameterValue { .. }
            | Self::TemplateMismatch { .. }
            | Self::Io { .. }
            | Self::Parse(_)
            | Self::UnexpectedField { .. }
            | Self::MissingField { .. }
            | Self::InvalidField { .. }
            | Self::InvalidName { .. } => ErrorCategory::Configuration,

            Self::DuplicateModuleName { .. }
            | Self::UnknownModuleType { .. }
            | Self::NonFinalizedModule { .. }
            | Self::UnknownDependency { .. }
            | Self::IncompatibleInterface { .. }
            | Self::DuplicateExposeLabel { .. } => ErrorCategory::Wiring,

            Self::ModuleFailed { .. } | Self::OutputContract { .. } => ErrorCategory::Runtime,
        }
    }

    pub(crate) fn module_failed(module: impl Into<String>, stage: Stage, source: anyhow::Error) -> Self {
        Self::ModuleFailed {
            module: module.into(),
            stage,
            source,
        }
    }
}

/// Short description of a YAML value's shape, used in error messages
pub(crate) fn shape_of(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
