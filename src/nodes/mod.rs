//! Small signal-processing modules used by the demo binary and tests.

pub mod gain;
pub mod mixer;
pub mod print;
pub mod sine_generator;

pub use gain::Gain;
pub use mixer::Mixer;
pub use print::Print;
pub use sine_generator::SineGenerator;

use crate::core::{InterfaceType, Payload};
use anyhow::{anyhow, Result};

/// Block of mono samples
pub static SIGNAL: InterfaceType = InterfaceType::root("Signal");

/// Data carried by [`SIGNAL`] payloads
#[derive(Debug, Clone, PartialEq)]
pub struct SignalFrame {
    pub sample_rate: f64,
    pub samples: Vec<f64>,
}

impl SignalFrame {
    pub fn new(sample_rate: f64, samples: Vec<f64>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn into_payload(self) -> Payload {
        Payload::new(&SIGNAL, self)
    }

    pub fn from_payload(payload: &Payload) -> Result<&Self> {
        payload
            .downcast_ref::<Self>()
            .ok_or_else(|| anyhow!("expected a signal frame, got {}", payload.interface()))
    }
}
