use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use modflow::core::{InterfaceType, Module, Payload};
use modflow::engine::PipelineState;
use modflow::observability::FailureKind;
use modflow::error::Stage;
use modflow::registry::{ModuleFactory, ModuleType};
use modflow::{ConfigReader, Error, ErrorCategory, ExecutionMode};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::Barrier;

static DATA: InterfaceType = InterfaceType::root("DataInterface");
static PARAMS: InterfaceType = InterfaceType::root("Parameters");

#[derive(Debug, Clone, PartialEq)]
struct Data {
    data: String,
}

fn data(payload: &Payload) -> &str {
    &payload.downcast_ref::<Data>().unwrap().data
}

fn emit(text: impl Into<String>) -> Result<Option<Payload>> {
    Ok(Some(Payload::new(&DATA, Data { data: text.into() })))
}

#[derive(Default, ModuleType)]
#[module(produce = "DATA", expose = "should-be-overridden", finalize)]
struct DependingModule;

#[async_trait]
impl Module for DependingModule {
    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        emit("depending")
    }
}

#[derive(Default, ModuleType)]
#[module(accept(DATA), produce = "DATA", finalize)]
struct ModuleSample;

#[async_trait]
impl Module for ModuleSample {
    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        emit("parent")
    }
}

#[derive(Default, ModuleType)]
#[module(accept(DATA), finalize)]
struct ModuleSuccessor;

#[async_trait]
impl Module for ModuleSuccessor {}

/// Emits its `tag` parameter and how often it ran
#[derive(Default, ModuleType)]
#[module(produce = "DATA", finalize)]
struct Counter {
    tag: String,
    calls: AtomicUsize,
}

#[async_trait]
impl Module for Counter {
    async fn on_create(&mut self, params: Value) -> Result<()> {
        self.tag = params["tag"].as_str().unwrap_or("counter").to_string();
        Ok(())
    }

    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        emit(format!("{}#{}", self.tag, calls))
    }
}

/// Wraps its inputs, in order: `tag(a+b)`
#[derive(Default, ModuleType)]
#[module(accept(DATA), produce = "DATA", finalize)]
struct Wrap {
    tag: String,
}

#[async_trait]
impl Module for Wrap {
    async fn on_create(&mut self, params: Value) -> Result<()> {
        self.tag = params["tag"].as_str().unwrap_or("wrap").to_string();
        Ok(())
    }

    async fn process(&self, inputs: Vec<Payload>) -> Result<Option<Payload>> {
        let joined: Vec<&str> = inputs.iter().map(data).collect();
        emit(format!("{}({})", self.tag, joined.join("+")))
    }
}

#[derive(Default, ModuleType)]
#[module(produce = "DATA", finalize)]
struct Failing;

#[async_trait]
impl Module for Failing {
    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        Err(anyhow!("sensor offline"))
    }
}

#[derive(Default, ModuleType)]
#[module(produce = "DATA", finalize)]
struct Slow;

#[async_trait]
impl Module for Slow {
    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        emit("slow")
    }
}

/// Declares an output but never returns one
#[derive(Default, ModuleType)]
#[module(produce = "DATA", finalize)]
struct Forgetful;

#[async_trait]
impl Module for Forgetful {}

/// Returns the parameters it was created with
#[derive(Default, ModuleType)]
#[module(produce = "PARAMS", finalize)]
struct ParamProbe {
    params: Value,
}

#[async_trait]
impl Module for ParamProbe {
    async fn on_create(&mut self, params: Value) -> Result<()> {
        self.params = params;
        Ok(())
    }

    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        Ok(Some(Payload::new(&PARAMS, self.params.clone())))
    }
}

#[derive(Default, ModuleType)]
#[module(produce = "DATA", finalize)]
struct Panicky;

#[async_trait]
impl Module for Panicky {
    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        panic!("lost the plot");
    }
}

fn barrier() -> &'static Barrier {
    static BARRIER: OnceLock<Barrier> = OnceLock::new();
    BARRIER.get_or_init(|| Barrier::new(2))
}

/// Only completes when a second `Rendezvous` is running at the same time
#[derive(Default, ModuleType)]
#[module(produce = "DATA", finalize)]
struct Rendezvous;

#[async_trait]
impl Module for Rendezvous {
    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        if tokio::time::timeout(Duration::from_secs(2), barrier().wait())
            .await
            .is_err()
        {
            bail!("no sibling arrived");
        }
        emit("met")
    }
}

fn factory() -> ModuleFactory {
    let mut factory = ModuleFactory::new();
    factory
        .register::<DependingModule>("DependingModule")
        .register::<ModuleSample>("ModuleSample")
        .register::<ModuleSuccessor>("ModuleSuccessor")
        .register::<Counter>("Counter")
        .register::<Wrap>("Wrap")
        .register::<Failing>("Failing")
        .register::<Slow>("Slow")
        .register::<Forgetful>("Forgetful")
        .register::<ParamProbe>("ParamProbe")
        .register::<Rendezvous>("Rendezvous")
        .register::<Panicky>("Panicky");
    factory
}

const EXPOSED_FOR_RESULTS: &str = r#"
modules:
  - name: producer
    type: DependingModule
    expose: depending-result
  - name: middle
    type: ModuleSample
    depends_on: [producer]
    expose: parent-result
  - name: consumer
    type: ModuleSuccessor
    depends_on: [middle]
"#;

const DIAMOND: &str = r#"
modules:
  - name: a
    type: Counter
    parameters: {tag: a}
  - name: b
    type: Wrap
    parameters: {tag: b}
    depends_on: [a]
  - name: c
    type: Wrap
    parameters: {tag: c}
    depends_on: [a]
  - name: d
    type: Wrap
    parameters: {tag: d}
    depends_on: [c, b]
    expose: true
"#;

#[tokio::test]
async fn test_should_correctly_access_exposed_results() {
    let mut pipeline = ConfigReader::read(EXPOSED_FOR_RESULTS, &factory(), None, None)
        .await
        .unwrap();

    let (results, report) = pipeline.run().await.unwrap();

    let labels: BTreeSet<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(labels, BTreeSet::from(["depending-result", "parent-result"]));
    assert_eq!(data(&results["depending-result"]), "depending");
    assert_eq!(data(&results["parent-result"]), "parent");
    assert!(!results.contains_key("should-be-overridden"));

    assert_eq!(report.modules.len(), 3);
    assert_eq!(report.module("consumer").unwrap().exposed, None);

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot["middle"].exposed_writes, 1);
    assert_eq!(snapshot["consumer"].exposed_writes, 0);
    assert_eq!(
        report.module("middle").unwrap().exposed.as_deref(),
        Some("parent-result")
    );
}

#[tokio::test]
async fn test_diamond_runs_each_module_once_with_ordered_inputs() {
    for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
        let mut pipeline = ConfigReader::read(DIAMOND, &factory(), None, None)
            .await
            .unwrap()
            .with_execution_mode(mode);

        let (results, report) = pipeline.run().await.unwrap();

        assert_eq!(data(&results["d"]), "d(c(a#1)+b(a#1))", "mode {mode:?}");
        assert_eq!(report.modules.len(), 4);
        assert_eq!(pipeline.metrics().snapshot()["a"].runs, 1);
    }
}

#[tokio::test]
async fn test_parallel_mode_runs_independent_branches_concurrently() {
    let config = r#"
modules:
  - name: left
    type: Rendezvous
    expose: true
  - name: right
    type: Rendezvous
    expose: true
"#;

    let mut pipeline = ConfigReader::read(config, &factory(), None, None)
        .await
        .unwrap()
        .with_execution_mode(ExecutionMode::Parallel);

    let (results, _) = pipeline.run().await.unwrap();

    assert_eq!(data(&results["left"]), "met");
    assert_eq!(data(&results["right"]), "met");
}

#[tokio::test]
async fn test_module_failure_aborts_run() {
    let config = r#"
modules:
  - name: sensor
    type: Failing
  - name: downstream
    type: Wrap
    depends_on: [sensor]
    expose: true
"#;

    let mut pipeline = ConfigReader::read(config, &factory(), None, None)
        .await
        .unwrap();

    let err = pipeline.run().await.unwrap_err();

    match &err {
        Error::ModuleFailed {
            module,
            stage,
            source,
        } => {
            assert_eq!(module, "sensor");
            assert_eq!(*stage, Stage::Process);
            assert!(source.to_string().contains("sensor offline"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Runtime);
    assert_eq!(pipeline.state().name(), "Failed");

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot["sensor"].errors_count, 1);
    assert_eq!(snapshot["downstream"].runs, 0);
}

#[tokio::test]
async fn test_parallel_failure_waits_for_in_flight_siblings() {
    let config = r#"
modules:
  - name: slow
    type: Slow
  - name: sensor
    type: Failing
  - name: after
    type: Wrap
    depends_on: [slow, sensor]
"#;

    let mut pipeline = ConfigReader::read(config, &factory(), None, None)
        .await
        .unwrap()
        .with_execution_mode(ExecutionMode::Parallel);

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, Error::ModuleFailed { ref module, .. } if module == "sensor"));

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot["slow"].runs, 1);
    assert_eq!(snapshot["slow"].errors_count, 0);
    assert_eq!(snapshot["after"].runs, 0);
}

#[tokio::test]
async fn test_panic_is_reported_against_module() {
    let config = r#"
modules:
  - name: steady
    type: Counter
  - name: panicky
    type: Panicky
"#;

    for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
        let mut pipeline = ConfigReader::read(config, &factory(), None, None)
            .await
            .unwrap()
            .with_execution_mode(mode);

        let err = pipeline.run().await.unwrap_err();

        match err {
            Error::ModuleFailed { module, stage, .. } => {
                assert_eq!(module, "panicky", "mode {mode:?}");
                assert_eq!(stage, Stage::Process, "mode {mode:?}");
            }
            other => panic!("unexpected error in mode {mode:?}: {other:?}"),
        }
        match pipeline.state() {
            PipelineState::Failed { module, .. } => {
                assert_eq!(module.as_deref(), Some("panicky"), "mode {mode:?}")
            }
            other => panic!("unexpected state in mode {mode:?}: {other:?}"),
        }

        let panicky = &pipeline.metrics().snapshot()["panicky"];
        assert_eq!(panicky.failures.panicked, 1, "mode {mode:?}");
        assert_eq!(
            panicky.last_failure.as_ref().map(|f| f.kind),
            Some(FailureKind::Panicked)
        );
    }
}

#[tokio::test]
async fn test_missing_output_breaks_contract() {
    let config = "modules:\n  - name: forgetful\n    type: Forgetful\n";

    let mut pipeline = ConfigReader::read(config, &factory(), None, None)
        .await
        .unwrap();

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, Error::OutputContract { ref module, .. } if module == "forgetful"));

    let forgetful = &pipeline.metrics().snapshot()["forgetful"];
    assert_eq!(forgetful.failures.contract_violations, 1);
    assert_eq!(forgetful.failures.failed, 0);
}

#[tokio::test]
async fn test_rerun_after_completion() {
    let mut pipeline = ConfigReader::read(DIAMOND, &factory(), None, None)
        .await
        .unwrap();
    assert_eq!(pipeline.state(), &PipelineState::Idle);

    let (first, _) = pipeline.run().await.unwrap();
    let (second, _) = pipeline.run().await.unwrap();

    assert_eq!(data(&first["d"]), "d(c(a#1)+b(a#1))");
    assert_eq!(data(&second["d"]), "d(c(a#2)+b(a#2))");
    assert!(matches!(pipeline.state(), PipelineState::Completed { runs: 2, .. }));
    assert_eq!(pipeline.metrics().snapshot()["d"].runs, 2);
}

#[tokio::test]
async fn test_shared_parameters_reach_modules() {
    let config = r#"
shared_parameters:
  rate: 48000
  mode: shared
modules:
  - name: probe
    type: ParamProbe
    parameters: {mode: ${MODE}}
    expose: params
"#;

    let parameters = serde_yaml::from_str("{MODE: local}").unwrap();
    let mut pipeline = ConfigReader::read(config, &factory(), Some(parameters), None)
        .await
        .unwrap();

    let (results, _) = pipeline.run().await.unwrap();
    let params = results["params"].downcast_ref::<Value>().unwrap();

    assert_eq!(params["rate"], 48000);
    assert_eq!(params["mode"], "local");
}

#[tokio::test]
async fn test_empty_pipeline_runs() {
    let mut pipeline = ConfigReader::read("modules: []", &factory(), None, None)
        .await
        .unwrap();

    let (results, report) = pipeline.run().await.unwrap();

    assert!(results.is_empty());
    assert!(report.modules.is_empty());
    assert_eq!(&report.pipeline, pipeline.name());
}
