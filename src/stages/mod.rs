//! Built-in processing stages.
//!
//! - [`SignalSource`] - waveform generator, a path's usual first stage
//! - [`ScaleOffset`] - `x * scale + offset` as two chained blocks
//!
//! Device channels live in [`device`](crate::device) next to the device
//! they are fed by.

mod signal_source;
mod scale_offset;

pub use signal_source::SignalSource;
pub use scale_offset::ScaleOffset;
