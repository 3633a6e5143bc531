use super::executor::{self, ExecutionMode, RunReport, RuntimeResults};
use super::state::PipelineState;
use crate::core::{InterfaceType, Module};
use crate::error::{shape_of, Error, Result};
use crate::observability::{MetricsCollector, ModuleMetrics};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Identity label of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PipelineName {
    Text(String),
    Number(serde_yaml::Number),
}

impl PipelineName {
    /// Name given explicitly by the caller: a string or a number
    pub fn from_override(value: serde_yaml::Value) -> Result<Self> {
        match value {
            serde_yaml::Value::String(text) => Ok(Self::Text(text)),
            serde_yaml::Value::Number(number) => Ok(Self::Number(number)),
            other => Err(Error::InvalidName {
                found: shape_of(&other),
            }),
        }
    }

    /// Name read from a document's `name` field; any scalar is kept as written
    pub fn from_document(value: &serde_yaml::Value) -> Result<Self> {
        match value {
            serde_yaml::Value::String(text) => Ok(Self::Text(text.clone())),
            serde_yaml::Value::Number(number) => Ok(Self::Number(number.clone())),
            serde_yaml::Value::Bool(flag) => Ok(Self::Text(flag.to_string())),
            other => Err(Error::InvalidName {
                found: shape_of(other),
            }),
        }
    }

    /// A fresh `Pipeline-<uuid>` name
    pub fn generate() -> Self {
        Self::Text(format!("Pipeline-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for PipelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for PipelineName {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PipelineName {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for PipelineName {
    fn from(number: i64) -> Self {
        Self::Number(number.into())
    }
}

impl From<f64> for PipelineName {
    fn from(number: f64) -> Self {
        Self::Number(number.into())
    }
}

impl PartialEq<str> for PipelineName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for PipelineName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<i64> for PipelineName {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Self::Number(number) if number.as_i64() == Some(*other))
    }
}

/// A module bound to its node entry and resolved wiring
pub struct ModuleInstance {
    name: String,
    type_name: String,
    group: Option<String>,
    interface: Option<&'static InterfaceType>,
    input_modules: Vec<String>,
    /// Positions of `input_modules` in the owning pipeline
    pub(crate) inputs: Vec<usize>,
    exposed: Option<String>,
    pub(crate) module: Arc<dyn Module>,
    pub(crate) metrics: Arc<ModuleMetrics>,
}

impl ModuleInstance {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        type_name: String,
        group: Option<String>,
        interface: Option<&'static InterfaceType>,
        input_modules: Vec<String>,
        inputs: Vec<usize>,
        exposed: Option<String>,
        module: Box<dyn Module>,
    ) -> Self {
        let metrics = Arc::new(ModuleMetrics::new(&name));
        Self {
            name,
            type_name,
            group,
            interface,
            input_modules,
            inputs,
            exposed,
            module: Arc::from(module),
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Interface produced by this module's type, if any
    pub fn interface(&self) -> Option<&'static InterfaceType> {
        self.interface
    }

    /// Names of the dependencies, in declared order
    pub fn input_modules(&self) -> &[String] {
        &self.input_modules
    }

    /// Label under which the output appears in run results
    pub fn exposed(&self) -> Option<&str> {
        self.exposed.as_deref()
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("group", &self.group)
            .field("interface", &self.interface.map(InterfaceType::name))
            .field("input_modules", &self.input_modules)
            .field("exposed", &self.exposed)
            .finish()
    }
}

/// Validated module graph in declaration order
pub struct Pipeline {
    name: PipelineName,
    modules: Vec<ModuleInstance>,
    mode: ExecutionMode,
    state: PipelineState,
    metrics: MetricsCollector,
    runs: u64,
}

impl Pipeline {
    pub(crate) fn new(name: PipelineName, modules: Vec<ModuleInstance>) -> Self {
        let mut metrics = MetricsCollector::new();
        for instance in &modules {
            metrics.register(&instance.name, instance.metrics.clone());
        }

        Self {
            name,
            modules,
            mode: ExecutionMode::default(),
            state: PipelineState::Idle,
            metrics,
            runs: 0,
        }
    }

    pub fn name(&self) -> &PipelineName {
        &self.name
    }

    pub fn modules(&self) -> &[ModuleInstance] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleInstance> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Modules whose node entry names `group`, in declaration order
    pub fn group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a ModuleInstance> + 'a {
        self.modules
            .iter()
            .filter(move |m| m.group.as_deref() == Some(group))
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn set_execution_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Get current pipeline state
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Cumulative per-module metrics over every run of this pipeline
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Execute every module once and collect the exposed outputs.
    ///
    /// The first module failure aborts the run; no partial results are
    /// returned.
    pub async fn run(&mut self) -> Result<(RuntimeResults, RunReport)> {
        let start_time = Instant::now();
        let running = PipelineState::Running { start_time };
        if !self.state.can_transition_to(&running) {
            tracing::warn!(
                pipeline = %self.name,
                state = self.state.name(),
                "starting run while a previous run did not finish"
            );
        }
        self.state = running;

        tracing::info!(
            pipeline = %self.name,
            modules = self.modules.len(),
            mode = ?self.mode,
            "pipeline.start"
        );

        let results = Arc::new(Mutex::new(RuntimeResults::new()));
        let outcome = match self.mode {
            ExecutionMode::Sequential => {
                executor::run_sequential(&self.modules, results.clone()).await
            }
            ExecutionMode::Parallel => executor::run_parallel(&self.modules, results.clone()).await,
        };
        let duration = start_time.elapsed();

        match outcome {
            Ok(records) => {
                self.runs += 1;
                self.state = PipelineState::Completed {
                    duration,
                    runs: self.runs,
                };

                let results = std::mem::take(&mut *results.lock().await);
                tracing::info!(
                    pipeline = %self.name,
                    exposed = results.len(),
                    elapsed_us = duration.as_micros() as u64,
                    "pipeline.done"
                );

                let report = RunReport {
                    pipeline: self.name.clone(),
                    elapsed: duration,
                    modules: records,
                };
                Ok((results, report))
            }
            Err(e) => {
                let module = match &e {
                    Error::ModuleFailed { module, .. } | Error::OutputContract { module, .. } => {
                        Some(module.clone())
                    }
                    _ => None,
                };
                tracing::error!(pipeline = %self.name, module = ?module, error = %e, "pipeline.failed");

                self.state = PipelineState::Failed {
                    module,
                    error_msg: e.to_string(),
                };
                Err(e)
            }
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("modules", &self.modules)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_accepts_strings_and_numbers() {
        let text = PipelineName::from_override(serde_yaml::Value::from("Chain")).unwrap();
        let number = PipelineName::from_override(serde_yaml::Value::from(5)).unwrap();

        assert_eq!(text, "Chain");
        assert_eq!(number, 5i64);
        assert_eq!(number.to_string(), "5");
    }

    #[test]
    fn test_override_rejects_sequences() {
        let value: serde_yaml::Value = serde_yaml::from_str("[test]").unwrap();
        let err = PipelineName::from_override(value).unwrap_err();
        assert!(matches!(err, Error::InvalidName { found: "a sequence" }));
    }

    #[test]
    fn test_override_rejects_booleans() {
        let err = PipelineName::from_override(serde_yaml::Value::Bool(true)).unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }));
    }

    #[test]
    fn test_generated_names_are_distinct() {
        let first = PipelineName::generate();
        let second = PipelineName::generate();

        assert!(first.to_string().contains("Pipeline-"));
        assert_ne!(first, second);
    }
}
