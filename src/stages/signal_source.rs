//! Waveform generator stage

use std::any::Any;

use rtrb::Producer;

use crate::block::{send_message, BlockId};
use crate::blocks::{SigSource, SigSourceMessage, Waveform};
use crate::engine::{EngineGraph, EngineGraphExt};
use crate::error::{GraphError, Result};
use crate::node::{Endpoint, ProcessingNode};

/// Source stage backed by a single `sig_source` block.
///
/// Parameters can be changed at any time; while built, changes are queued
/// to the running block and take effect on its next buffer.
pub struct SignalSource {
    name: String,
    waveform: Waveform,
    sampling_freq: f32,
    frequency: f32,
    amplitude: f32,
    offset: f32,

    block: Option<BlockId>,
    sender: Option<Producer<SigSourceMessage>>,
}

impl SignalSource {
    /// A constant source of amplitude 1 running at the graph's sample rate
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            waveform: Waveform::Constant,
            sampling_freq: 0.0,
            frequency: 0.0,
            amplitude: 1.0,
            offset: 0.0,
            block: None,
            sender: None,
        }
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn with_sampling_freq(mut self, sampling_freq: f32) -> Self {
        self.sampling_freq = sampling_freq;
        self
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
        send_message(&mut self.sender, SigSourceMessage::SetWaveform(waveform), &self.name);
    }

    pub fn set_sampling_freq(&mut self, sampling_freq: f32) {
        self.sampling_freq = sampling_freq;
        send_message(&mut self.sender, SigSourceMessage::SetSamplingFreq(sampling_freq), &self.name);
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        send_message(&mut self.sender, SigSourceMessage::SetFrequency(frequency), &self.name);
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
        send_message(&mut self.sender, SigSourceMessage::SetAmplitude(amplitude), &self.name);
    }

    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
        send_message(&mut self.sender, SigSourceMessage::SetOffset(offset), &self.name);
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
}

impl ProcessingNode for SignalSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        if self.block.is_some() {
            return Err(GraphError::AlreadyBuilt(self.name.clone()));
        }
        let source = SigSource::new(
            self.waveform,
            self.sampling_freq,
            self.frequency,
            self.amplitude,
            self.offset,
        );
        let (block, sender) = graph.add("sig_source", source)?;
        self.block = Some(block);
        self.sender = Some(sender);
        Ok(())
    }

    fn connect(&mut self, _graph: &mut dyn EngineGraph, previous: Option<Endpoint>) -> Result<Endpoint> {
        let block = self.block.ok_or_else(|| GraphError::NoEndpoint(self.name.clone()))?;
        if let Some(previous) = previous {
            tracing::debug!("{} is a source; upstream {:?} is not consumed", self.name, previous);
        }
        Ok(Endpoint::new(block, 0))
    }

    fn disconnect(&mut self, _graph: &mut dyn EngineGraph) -> Result<()> {
        Ok(())
    }

    fn destroy(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        self.sender = None;
        match self.block.take() {
            Some(block) => graph.remove_block(block),
            None => Ok(()),
        }
    }

    fn is_built(&self) -> bool {
        self.block.is_some()
    }

    fn endpoint(&self) -> Option<Endpoint> {
        self.block.map(|block| Endpoint::new(block, 0))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
