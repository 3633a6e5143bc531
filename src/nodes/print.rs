use super::SignalFrame;
use crate::core::{Module, Payload};
use crate::registry::ModuleType;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

#[derive(ModuleType)]
#[module(accept(super::SIGNAL), finalize, register = "Print")]
pub struct Print {
    label: String,
}

impl Default for Print {
    fn default() -> Self {
        Self::new()
    }
}

impl Print {
    pub fn new() -> Self {
        Self {
            label: "Output".to_string(),
        }
    }
}

#[async_trait]
impl Module for Print {
    async fn on_create(&mut self, params: Value) -> Result<()> {
        if let Some(label) = params["label"].as_str() {
            self.label = label.to_string();
        }
        Ok(())
    }

    async fn process(&self, inputs: Vec<Payload>) -> Result<Option<Payload>> {
        for (index, input) in inputs.iter().enumerate() {
            let frame = SignalFrame::from_payload(input)?;
            let stats = if !frame.samples.is_empty() {
                let data = &frame.samples;
                let mean = data.iter().sum::<f64>() / data.len() as f64;
                let rms = (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt();
                format!("len={}, mean={:.4}, rms={:.4}", data.len(), mean, rms)
            } else {
                "empty".to_string()
            };
            println!("[{}] input #{} @ {}Hz: {}", self.label, index, frame.sample_rate, stats);
        }

        Ok(None)
    }
}
