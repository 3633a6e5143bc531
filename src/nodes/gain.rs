use super::SignalFrame;
use crate::core::{Module, Payload};
use crate::registry::ModuleType;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

#[derive(ModuleType)]
#[module(accept(super::SIGNAL), produce = "super::SIGNAL", finalize, register = "Gain")]
pub struct Gain {
    gain: f64,
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl Gain {
    pub fn new() -> Self {
        Self { gain: 1.0 }
    }
}

#[async_trait]
impl Module for Gain {
    async fn on_create(&mut self, params: Value) -> Result<()> {
        if let Some(g) = params["gain"].as_f64() {
            self.gain = g;
        }
        Ok(())
    }

    async fn process(&self, inputs: Vec<Payload>) -> Result<Option<Payload>> {
        let [input] = inputs.as_slice() else {
            bail!("gain takes exactly one input, got {}", inputs.len());
        };

        let frame = SignalFrame::from_payload(input)?;
        let samples = frame.samples.iter().map(|s| s * self.gain).collect();

        Ok(Some(SignalFrame::new(frame.sample_rate, samples).into_payload()))
    }
}
