//! Signal generator

use dasp_graph::Buffer;
use serde::{Deserialize, Serialize};

use crate::block::{Block, ProcessContext};

/// Shapes a [`SigSource`] can produce
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    /// `amplitude + offset`
    #[default]
    Constant,
    /// `offset` for the first half of each period, `amplitude + offset` for the second
    Square,
    /// `amplitude * sin(2π f t) + offset`
    Sine,
}

/// Messages to control a SigSource
#[derive(Clone, Copy, Debug)]
pub enum SigSourceMessage {
    SetWaveform(Waveform),
    SetSamplingFreq(f32),
    SetFrequency(f32),
    SetAmplitude(f32),
    SetOffset(f32),
}

/// A waveform generator (single output)
pub struct SigSource {
    waveform: Waveform,
    /// Samples per second; zero or negative falls back to the graph rate
    sampling_freq: f32,
    frequency: f32,
    amplitude: f32,
    offset: f32,
    sample_index: u64,
}

impl SigSource {
    pub fn new(waveform: Waveform, sampling_freq: f32, frequency: f32, amplitude: f32, offset: f32) -> Self {
        Self {
            waveform,
            sampling_freq,
            frequency: frequency.max(0.0),
            amplitude,
            offset,
            sample_index: 0,
        }
    }

    pub fn constant(amplitude: f32, offset: f32) -> Self {
        Self::new(Waveform::Constant, 0.0, 0.0, amplitude, offset)
    }

    #[inline]
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    fn sample(&self, sample_rate: f64) -> f32 {
        match self.waveform {
            Waveform::Constant => self.amplitude + self.offset,
            Waveform::Square => {
                if self.phase(sample_rate) < 0.5 {
                    self.offset
                } else {
                    self.amplitude + self.offset
                }
            }
            Waveform::Sine => {
                let angle = self.phase(sample_rate) * core::f64::consts::TAU;
                self.amplitude * angle.sin() as f32 + self.offset
            }
        }
    }

    // Computed from the sample count rather than accumulated, so square
    // edges land on exact sample boundaries
    fn phase(&self, sample_rate: f64) -> f64 {
        (self.sample_index as f64 * self.frequency as f64 / sample_rate).fract()
    }
}

impl Block for SigSource {
    type Message = SigSourceMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = SigSourceMessage>,
        _inputs: &[Buffer],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                SigSourceMessage::SetWaveform(w) => self.waveform = w,
                SigSourceMessage::SetSamplingFreq(f) => self.sampling_freq = f,
                SigSourceMessage::SetFrequency(f) => self.frequency = f.max(0.0),
                SigSourceMessage::SetAmplitude(a) => self.amplitude = a,
                SigSourceMessage::SetOffset(o) => self.offset = o,
            }
        }

        let Some(first) = outputs.first_mut() else {
            return;
        };

        let sample_rate = if self.sampling_freq > 0.0 {
            self.sampling_freq as f64
        } else {
            ctx.sample_rate as f64
        };

        for s in first.iter_mut() {
            *s = self.sample(sample_rate);
            self.sample_index += 1;
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 0 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}
