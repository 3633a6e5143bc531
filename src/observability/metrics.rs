use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How a module run ended without a usable output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// `process` returned an error
    Failed,
    /// `process` panicked
    Panicked,
    /// The output did not match the interface the module type produces
    ContractViolation,
}

/// Most recent failure of a module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    /// Run number (1-based) during which the failure happened
    pub run: u64,
    pub message: String,
}

/// Failure counts by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub failed: u64,
    pub panicked: u64,
    pub contract_violations: u64,
}

impl FailureCounts {
    pub fn total(&self) -> u64 {
        self.failed + self.panicked + self.contract_violations
    }
}

/// Cumulative counters for one module across pipeline runs
pub struct ModuleMetrics {
    module: String,
    runs: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    contract_violations: AtomicU64,
    exposed_writes: AtomicU64,
    total_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
    latency_samples: AtomicU64,
    last_failure: Mutex<Option<FailureRecord>>,
}

impl ModuleMetrics {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            runs: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            contract_violations: AtomicU64::new(0),
            exposed_writes: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            max_latency_us: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
            last_failure: Mutex::new(None),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> FailureCounts {
        FailureCounts {
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            contract_violations: self.contract_violations.load(Ordering::Relaxed),
        }
    }

    /// Number of runs that ended in any kind of failure
    pub fn errors_count(&self) -> u64 {
        self.failures().total()
    }

    /// Number of times the output was written to the run results
    pub fn exposed_writes(&self) -> u64 {
        self.exposed_writes.load(Ordering::Relaxed)
    }

    pub fn last_failure(&self) -> Option<FailureRecord> {
        match self.last_failure.lock() {
            Ok(last) => (*last).clone(),
            Err(poisoned) => (*poisoned.into_inner()).clone(),
        }
    }

    pub fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exposed(&self) {
        self.exposed_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failure of the current run and keep it as the last failure
    pub fn record_failure(&self, kind: FailureKind, message: impl Into<String>) {
        let counter = match kind {
            FailureKind::Failed => &self.failed,
            FailureKind::Panicked => &self.panicked,
            FailureKind::ContractViolation => &self.contract_violations,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let record = FailureRecord {
            kind,
            run: self.runs(),
            message: message.into(),
        };
        match self.last_failure.lock() {
            Ok(mut last) => *last = Some(record),
            Err(poisoned) => *poisoned.into_inner() = Some(record),
        }
    }

    pub fn start_processing(&self) -> Instant {
        Instant::now()
    }

    /// Records the latency since `start` and returns it
    pub fn finish_processing(&self, start: Instant) -> Duration {
        let elapsed = start.elapsed();
        let micros = elapsed.as_micros() as u64;
        self.total_latency_us.fetch_add(micros, Ordering::Relaxed);
        self.max_latency_us.fetch_max(micros, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
        elapsed
    }

    pub fn avg_latency_us(&self) -> u64 {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0;
        }
        self.total_latency_us.load(Ordering::Relaxed) / samples
    }

    pub fn max_latency_us(&self) -> u64 {
        self.max_latency_us.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = ModuleMetrics::new("gain");

        metrics.record_run();
        metrics.record_exposed();
        metrics.record_run();
        metrics.record_failure(FailureKind::Failed, "boom");

        assert_eq!(metrics.module(), "gain");
        assert_eq!(metrics.runs(), 2);
        assert_eq!(metrics.exposed_writes(), 1);
        assert_eq!(metrics.errors_count(), 1);
    }

    #[test]
    fn test_failures_are_counted_by_kind() {
        let metrics = ModuleMetrics::new("mixer");

        metrics.record_run();
        metrics.record_failure(FailureKind::ContractViolation, "returned nothing");
        metrics.record_run();
        metrics.record_failure(FailureKind::Panicked, "task panicked");

        assert_eq!(
            metrics.failures(),
            FailureCounts {
                failed: 0,
                panicked: 1,
                contract_violations: 1,
            }
        );
        assert_eq!(
            metrics.last_failure(),
            Some(FailureRecord {
                kind: FailureKind::Panicked,
                run: 2,
                message: "task panicked".to_string(),
            })
        );
    }

    #[test]
    fn test_latency_tracks_average_and_max() {
        let metrics = ModuleMetrics::new("idle");
        assert_eq!(metrics.avg_latency_us(), 0);
        assert_eq!(metrics.max_latency_us(), 0);

        let elapsed = metrics.finish_processing(Instant::now());
        assert_eq!(metrics.max_latency_us(), elapsed.as_micros() as u64);
        assert!(metrics.last_failure().is_none());
    }
}
