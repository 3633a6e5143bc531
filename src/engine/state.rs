use std::time::{Duration, Instant};

/// Pipeline execution states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Running {
        start_time: Instant,
    },
    Completed {
        duration: Duration,
        runs: u64,
    },
    Failed {
        module: Option<String>,
        error_msg: String,
    },
}

impl PipelineState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &PipelineState) -> bool {
        use PipelineState::*;

        matches!(
            (self, target),
            // Start a run
            (Idle, Running { .. }) |
            (Completed { .. }, Running { .. }) |
            (Failed { .. }, Running { .. }) |

            // Finish a run
            (Running { .. }, Completed { .. }) |
            (Running { .. }, Failed { .. })
        )
    }

    /// Get human-readable state name
    pub fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Running { .. } => "Running",
            Self::Completed { .. } => "Completed",
            Self::Failed { .. } => "Failed",
        }
    }
}
