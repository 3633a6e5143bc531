use super::{FailureCounts, FailureRecord, ModuleMetrics};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub module: String,
    pub runs: u64,
    pub errors_count: u64,
    pub failures: FailureCounts,
    pub exposed_writes: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub last_failure: Option<FailureRecord>,
}

impl MetricsSnapshot {
    fn of(metrics: &ModuleMetrics) -> Self {
        let failures = metrics.failures();
        Self {
            module: metrics.module().to_string(),
            runs: metrics.runs(),
            errors_count: failures.total(),
            failures,
            exposed_writes: metrics.exposed_writes(),
            avg_latency_us: metrics.avg_latency_us(),
            max_latency_us: metrics.max_latency_us(),
            last_failure: metrics.last_failure(),
        }
    }
}

/// Per-module metrics of one pipeline, keyed by module name
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: HashMap<String, Arc<ModuleMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: impl Into<String>, metrics: Arc<ModuleMetrics>) {
        self.metrics.insert(module.into(), metrics);
    }

    pub fn snapshot(&self) -> HashMap<String, MetricsSnapshot> {
        self.metrics
            .iter()
            .map(|(name, metrics)| (name.clone(), MetricsSnapshot::of(metrics)))
            .collect()
    }

    pub fn get_module_metrics(&self, module: &str) -> Option<Arc<ModuleMetrics>> {
        self.metrics.get(module).cloned()
    }

    /// Last failure of every module that has failed, most recent run first
    pub fn failures(&self) -> Vec<(String, FailureRecord)> {
        let mut failures: Vec<_> = self
            .metrics
            .iter()
            .filter_map(|(name, metrics)| Some((name.clone(), metrics.last_failure()?)))
            .collect();
        failures.sort_by(|(a_name, a), (b_name, b)| b.run.cmp(&a.run).then(a_name.cmp(b_name)));
        failures
    }
}
