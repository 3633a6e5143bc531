use super::pipeline::{ModuleInstance, PipelineName};
use crate::core::{InterfaceType, Module, Payload};
use crate::error::{Error, Result, Stage};
use crate::observability::{FailureKind, ModuleMetrics};
use anyhow::anyhow;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};

/// Exposed outputs of one run, keyed by exposure label
pub type RuntimeResults = HashMap<String, Payload>;

/// How modules without a dependency relation are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One module at a time, in declaration order
    #[default]
    Sequential,
    /// Every module whose dependencies are done runs as its own task
    Parallel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleRecord {
    pub name: String,
    pub elapsed: Duration,
    pub exposed: Option<String>,
}

/// Execution metadata returned next to the results of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pipeline: PipelineName,
    pub elapsed: Duration,
    /// One record per executed module, in completion order
    pub modules: Vec<ModuleRecord>,
}

impl RunReport {
    pub fn module(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|record| record.name == name)
    }
}

/// Everything a module task needs, detached from the pipeline borrow
struct Job {
    index: usize,
    name: String,
    module: Arc<dyn Module>,
    produces: Option<&'static InterfaceType>,
    exposed: Option<String>,
    metrics: Arc<ModuleMetrics>,
    inputs: Vec<Payload>,
}

impl Job {
    fn prepare(
        index: usize,
        modules: &[ModuleInstance],
        outputs: &[Option<Payload>],
    ) -> Result<Self> {
        let instance = &modules[index];
        let inputs = instance
            .inputs
            .iter()
            .map(|&dependency| {
                outputs[dependency]
                    .clone()
                    .ok_or_else(|| Error::OutputContract {
                        module: modules[dependency].name().to_string(),
                        reason: "no output is available for its dependents".to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            index,
            name: instance.name().to_string(),
            module: instance.module.clone(),
            produces: instance.interface(),
            exposed: instance.exposed().map(str::to_string),
            metrics: instance.metrics.clone(),
            inputs,
        })
    }
}

type JobOutcome = (usize, Result<(Option<Payload>, ModuleRecord)>);

async fn execute(job: Job, results: Arc<Mutex<RuntimeResults>>) -> JobOutcome {
    let Job {
        index,
        name,
        module,
        produces,
        exposed,
        metrics,
        inputs,
    } = job;

    metrics.record_run();
    let start = metrics.start_processing();
    let output = module
        .process(inputs)
        .await
        .map_err(|e| Error::module_failed(&name, Stage::Process, e))
        .and_then(|output| check_output(&name, produces, output));
    let elapsed = metrics.finish_processing(start);

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            let kind = match e {
                Error::OutputContract { .. } => FailureKind::ContractViolation,
                _ => FailureKind::Failed,
            };
            metrics.record_failure(kind, e.to_string());
            return (index, Err(e));
        }
    };

    if let (Some(label), Some(payload)) = (&exposed, &output) {
        results.lock().await.insert(label.clone(), payload.clone());
        metrics.record_exposed();
    }

    tracing::debug!(
        module = %name,
        elapsed_us = elapsed.as_micros() as u64,
        exposed = ?exposed,
        "module.done"
    );

    let record = ModuleRecord {
        name,
        elapsed,
        exposed,
    };
    (index, Ok((output, record)))
}

/// A module's output must match the interface its type produces
fn check_output(
    module: &str,
    produces: Option<&'static InterfaceType>,
    output: Option<Payload>,
) -> Result<Option<Payload>> {
    let actual = output.as_ref().map(Payload::interface);
    let reason = match (produces, actual) {
        (None, None) => return Ok(None),
        (Some(expected), Some(actual)) if actual.is_subtype_of(expected) => return Ok(output),
        (None, Some(actual)) => format!("returned {actual} but its type produces nothing"),
        (Some(expected), None) => format!("returned nothing but its type produces {expected}"),
        (Some(expected), Some(actual)) => {
            format!("returned {actual} which is not a subtype of {expected}")
        }
    };

    Err(Error::OutputContract {
        module: module.to_string(),
        reason,
    })
}

pub(crate) async fn run_sequential(
    modules: &[ModuleInstance],
    results: Arc<Mutex<RuntimeResults>>,
) -> Result<Vec<ModuleRecord>> {
    let mut outputs: Vec<Option<Payload>> = vec![None; modules.len()];
    let mut records = Vec::with_capacity(modules.len());

    // Dependencies always precede their dependents
    for index in 0..modules.len() {
        let job = Job::prepare(index, modules, &outputs)?;
        // Run as a task so a panic surfaces as a JoinError
        let (_, outcome) = tokio::spawn(execute(job, results.clone()))
            .await
            .map_err(|join_error| panic_failure(&modules[index], &join_error))?;
        let (output, record) = outcome?;

        outputs[index] = output;
        records.push(record);
    }

    Ok(records)
}

pub(crate) async fn run_parallel(
    modules: &[ModuleInstance],
    results: Arc<Mutex<RuntimeResults>>,
) -> Result<Vec<ModuleRecord>> {
    let count = modules.len();
    let mut outputs: Vec<Option<Payload>> = vec![None; count];
    let mut started = vec![false; count];
    let mut finished = vec![false; count];
    let mut records = Vec::with_capacity(count);

    let mut failure: Option<Error> = None;
    let mut panicked: Option<tokio::task::JoinError> = None;
    let mut tasks = JoinSet::new();

    loop {
        if failure.is_none() && panicked.is_none() {
            for index in 0..count {
                if started[index] || !modules[index].inputs.iter().all(|&d| finished[d]) {
                    continue;
                }
                match Job::prepare(index, modules, &outputs) {
                    Ok(job) => {
                        started[index] = true;
                        tasks.spawn(execute(job, results.clone()));
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }

        // In-flight modules are always awaited, never aborted
        let Some(joined) = tasks.join_next().await else {
            break;
        };

        match joined {
            Ok((index, Ok((output, record)))) => {
                finished[index] = true;
                outputs[index] = output;
                records.push(record);
            }
            Ok((index, Err(e))) => {
                finished[index] = true;
                failure.get_or_insert(e);
            }
            Err(join_error) => {
                panicked.get_or_insert(join_error);
            }
        }
    }

    // Every task reported back, so the started modules that never finished
    // are the ones that panicked
    let panic_error = panicked.and_then(|join_error| {
        (0..count)
            .filter(|&index| started[index] && !finished[index])
            .map(|index| panic_failure(&modules[index], &join_error))
            .reduce(|first, _| first)
    });

    match failure.or(panic_error) {
        Some(e) => Err(e),
        None => Ok(records),
    }
}

/// A panicked module task, reported as a process failure of `instance`
fn panic_failure(instance: &ModuleInstance, join_error: &JoinError) -> Error {
    let message = format!("module task panicked: {join_error}");
    instance
        .metrics
        .record_failure(FailureKind::Panicked, message.clone());
    Error::module_failed(instance.name(), Stage::Process, anyhow!(message))
}
