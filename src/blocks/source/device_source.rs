//! Simulated multi-channel acquisition block

use dasp_graph::Buffer;
use serde::{Deserialize, Serialize};

use crate::block::{Block, ProcessContext};

/// Data produced on one device channel
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChannelPattern {
    /// Constant value
    Constant(f32),
    /// Counter that increments by `step` and wraps back to zero at `max`
    Ramp { step: f32, max: f32 },
    /// `low` for the first half of `period` samples, `high` for the rest
    Square { period: u32, low: f32, high: f32 },
}

impl Default for ChannelPattern {
    fn default() -> Self {
        ChannelPattern::Constant(0.0)
    }
}

impl ChannelPattern {
    /// Value of the pattern at sample `n`
    pub fn value_at(&self, n: u64) -> f32 {
        match *self {
            ChannelPattern::Constant(v) => v,
            ChannelPattern::Ramp { step, max } => {
                let v = n as f64 * step as f64;
                if max > 0.0 {
                    (v % max as f64) as f32
                } else {
                    v as f32
                }
            }
            ChannelPattern::Square { period, low, high } => {
                let period = period.max(2) as u64;
                if n % period < period / 2 {
                    low
                } else {
                    high
                }
            }
        }
    }
}

/// Messages to control a DeviceSourceBlock
#[derive(Clone, Copy, Debug)]
pub enum DeviceSourceMessage {
    SetPattern { channel: usize, pattern: ChannelPattern },
}

/// One output port per device channel
pub struct DeviceSourceBlock {
    patterns: Vec<ChannelPattern>,
    sample_index: u64,
}

impl DeviceSourceBlock {
    pub fn new(patterns: Vec<ChannelPattern>) -> Self {
        Self {
            patterns,
            sample_index: 0,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.patterns.len()
    }
}

impl Block for DeviceSourceBlock {
    type Message = DeviceSourceMessage;

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        messages: impl Iterator<Item = DeviceSourceMessage>,
        _inputs: &[Buffer],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                DeviceSourceMessage::SetPattern { channel, pattern } => {
                    if let Some(slot) = self.patterns.get_mut(channel) {
                        *slot = pattern;
                    }
                }
            }
        }

        let start = self.sample_index;
        let mut len = 0;
        for (pattern, buffer) in self.patterns.iter().zip(outputs.iter_mut()) {
            len = buffer.len();
            for (i, sample) in buffer.iter_mut().enumerate() {
                *sample = pattern.value_at(start + i as u64);
            }
        }
        self.sample_index += len as u64;
    }

    #[inline]
    fn num_outputs(&self) -> usize {
        self.patterns.len()
    }
}
