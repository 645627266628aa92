//! Built-in native blocks.
//!
//! Blocks are organized into three categories, like the stages that
//! allocate them:
//!
//! ## Sources ([`source`])
//!
//! - [`SigSource`] - Constant, square or sine generator (`sig_source`)
//! - [`DeviceSourceBlock`] - Multi-channel simulated acquisition (`device_source`)
//!
//! ## Effects ([`effect`])
//!
//! - [`MultiplyConst`] - Multiply by a constant (`multiply_const_ff`)
//! - [`AddConst`] - Add a constant (`add_const_ff`)
//! - [`Passthrough`] - Pass-through (`copy`)
//!
//! ## Sinks ([`sink`])
//!
//! - [`VectorSink`] - Capture a bounded number of samples (`vector_sink`)
//!
//! # Message Types
//!
//! Blocks with runtime parameters take messages through their queue:
//! - [`SigSourceMessage`] - waveform, rates, amplitude, offset
//! - [`ConstMessage`] - constant of [`MultiplyConst`] / [`AddConst`]
//! - [`DeviceSourceMessage`] - per-channel pattern

pub mod source;
pub mod effect;
pub mod sink;

pub use source::{ChannelPattern, DeviceSourceBlock, DeviceSourceMessage, SigSource, SigSourceMessage, Waveform};
pub use effect::{AddConst, ConstMessage, MultiplyConst, Passthrough};
pub use sink::{SinkReader, VectorSink};
