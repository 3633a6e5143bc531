use super::SignalFrame;
use crate::core::{Module, Payload};
use crate::registry::ModuleType;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::f64::consts::PI;

#[derive(ModuleType)]
#[module(produce = "super::SIGNAL", finalize, register = "SineGenerator")]
pub struct SineGenerator {
    frequency: f64,
    amplitude: f64,
    sample_rate: f64,
    frame_size: usize,
}

impl Default for SineGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SineGenerator {
    pub fn new() -> Self {
        Self {
            frequency: 440.0,
            amplitude: 1.0,
            sample_rate: 48000.0,
            frame_size: 1024,
        }
    }
}

#[async_trait]
impl Module for SineGenerator {
    async fn on_create(&mut self, params: Value) -> Result<()> {
        if let Some(freq) = params["frequency"].as_f64() {
            self.frequency = freq;
        }
        if let Some(amplitude) = params["amplitude"].as_f64() {
            self.amplitude = amplitude;
        }
        if let Some(sr) = params["sample_rate"].as_f64() {
            self.sample_rate = sr;
        }
        if let Some(size) = params["frame_size"].as_u64() {
            self.frame_size = size as usize;
        }

        if self.sample_rate <= 0.0 {
            bail!("sample_rate must be positive, got {}", self.sample_rate);
        }
        Ok(())
    }

    async fn process(&self, _inputs: Vec<Payload>) -> Result<Option<Payload>> {
        let phase_increment = 2.0 * PI * self.frequency / self.sample_rate;
        let samples = (0..self.frame_size)
            .map(|i| self.amplitude * ((i as f64) * phase_increment).sin())
            .collect();

        Ok(Some(SignalFrame::new(self.sample_rate, samples).into_payload()))
    }
}
