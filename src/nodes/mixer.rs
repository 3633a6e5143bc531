use super::SignalFrame;
use crate::core::{Module, Payload};
use crate::registry::ModuleType;
use anyhow::{bail, Result};
use async_trait::async_trait;

/// Sums its inputs sample by sample; shorter inputs are zero-padded.
#[derive(Default, ModuleType)]
#[module(accept(super::SIGNAL), produce = "super::SIGNAL", finalize, register = "Mixer")]
pub struct Mixer;

#[async_trait]
impl Module for Mixer {
    async fn process(&self, inputs: Vec<Payload>) -> Result<Option<Payload>> {
        let frames = inputs
            .iter()
            .map(SignalFrame::from_payload)
            .collect::<Result<Vec<_>>>()?;

        let Some(first) = frames.first() else {
            bail!("mixer needs at least one input");
        };
        if let Some(other) = frames.iter().find(|f| f.sample_rate != first.sample_rate) {
            bail!(
                "cannot mix sample rates {} and {}",
                first.sample_rate,
                other.sample_rate
            );
        }

        let len = frames.iter().map(|f| f.samples.len()).max().unwrap_or(0);
        let mut samples = vec![0.0; len];
        for frame in &frames {
            for (sum, sample) in samples.iter_mut().zip(&frame.samples) {
                *sum += sample;
            }
        }

        Ok(Some(SignalFrame::new(first.sample_rate, samples).into_payload()))
    }
}
