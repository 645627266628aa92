//! flowpath - rebuildable streaming flow graphs made of signal paths
//!
//! Design principles:
//! - Signal paths are ordered chains of stages; a path can feed other paths
//! - The controller owns one engine graph at a time, rebuilt from scratch on
//!   every topology change instead of being patched in place
//! - Lifecycle is single-threaded; only the engine's scheduler runs elsewhere
//! - Block parameters change through message ring buffers, not shared state
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use flowpath::blocks::VectorSink;
//! use flowpath::{EngineGraphExt, FlowGraphController, ScaleOffset, SignalSource};
//!
//! let mut top = FlowGraphController::new("top");
//! let ch1 = top.create_signal_path("ch1");
//! ch1.append(SignalSource::new("src").with_amplitude(1.5).with_offset(0.5)).unwrap();
//! ch1.append(ScaleOffset::new("gain").with_scale(2.0).with_offset(1.0)).unwrap();
//!
//! // attach a bounded sink to every path endpoint after each build
//! let readers = Rc::new(RefCell::new(Vec::new()));
//! top.on_graph_built({
//!     let readers = readers.clone();
//!     move |graph, paths| {
//!         for endpoint in paths.iter().filter_map(|p| p.endpoint()) {
//!             let (sink, reader) = VectorSink::new(128);
//!             let (sink, _) = graph.add("vector_sink", sink)?;
//!             graph.connect(endpoint.block, endpoint.port, sink, 0)?;
//!             readers.borrow_mut().push(reader);
//!         }
//!         Ok(())
//!     }
//! });
//!
//! top.build().unwrap();
//! top.run().unwrap();
//!
//! let samples = readers.borrow_mut()[0].data();
//! assert_eq!(samples.len(), 128);
//! assert!(samples.iter().all(|&s| s == 5.0));
//! ```

mod block;
mod config;
mod controller;
mod device;
mod engine;
mod error;
mod graph;
mod node;
mod path;
mod stages;
pub mod blocks;

pub use block::{erase, Block, BlockId, BoxedBlock, ErasedBlock, ProcessContext};
pub use blocks::{ChannelPattern, Waveform};
pub use config::{GraphConfig, DEFAULT_MAX_PATH_DEPTH, DEFAULT_MESSAGE_QUEUE_SIZE, DEFAULT_SAMPLE_RATE};
pub use controller::{BuiltObserver, FlowGraphController, FlowState, TornDownObserver};
pub use device::{DeviceChannel, DeviceSource, SharedDeviceSource, SimulatedDevice};
pub use engine::{Engine, EngineGraph, EngineGraphExt};
pub use error::{GraphError, Result};
pub use graph::{DaspEngine, FlowGraph};
pub use node::{Endpoint, ProcessingNode, Wiring};
pub use path::{Listener, NodeId, Segment, SignalPath, SubscriptionId, TopologyChange, WeakSignalPath};
pub use stages::{ScaleOffset, SignalSource};
