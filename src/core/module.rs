use super::Payload;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Base trait for all processing modules in a pipeline
#[async_trait]
pub trait Module: Send + Sync {
    /// Called once when the module is instantiated, with the parameters
    /// from its node entry (merged over the document's shared parameters)
    async fn on_create(&mut self, _params: Value) -> Result<()> {
        Ok(())
    }

    /// Processes the outputs of the declared dependencies, in `depends_on` order.
    ///
    /// Returns the module's output, or `None` for modules that produce nothing.
    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        Ok(None)
    }
}
