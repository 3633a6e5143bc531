pub mod executor;
pub mod pipeline;
pub mod state;

pub use executor::{ExecutionMode, ModuleRecord, RunReport, RuntimeResults};
pub use pipeline::{ModuleInstance, Pipeline, PipelineName};
pub use state::PipelineState;
