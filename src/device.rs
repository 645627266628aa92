//! Device-backed sources.
//!
//! A device source owns a native acquisition block that is built and torn
//! down by the controller alongside the signal paths, not inside them. Paths
//! reach a device through [`DeviceChannel`] stages: each channel allocates a
//! `copy` proxy block while its path is built and binds it to the device;
//! the device then wires `device_source:<channel> -> copy:0` during its own
//! connect step, which runs after every path has been connected.
//!
//! ```
//! use flowpath::{ChannelPattern, FlowGraphController, SimulatedDevice};
//!
//! let device = SimulatedDevice::shared("adc", vec![ChannelPattern::Constant(1.0)]);
//! let mut top = FlowGraphController::new("top");
//!
//! let ch0 = top.create_signal_path("ch0");
//! ch0.append(SimulatedDevice::channel(&device, 0)).unwrap();
//! top.register_device_source(&device);
//!
//! top.build().unwrap();
//! assert_eq!(top.edge_list(), "device_source0:0->copy0:0\n");
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rtrb::Producer;

use crate::block::{send_message, BlockId};
use crate::blocks::{ChannelPattern, DeviceSourceBlock, DeviceSourceMessage, Passthrough};
use crate::engine::{EngineGraph, EngineGraphExt};
use crate::error::{GraphError, Result};
use crate::node::{Endpoint, ProcessingNode, Wiring};

/// Contract for sources registered with the controller.
///
/// The controller calls `build_blks` then `connect_blk` after all signal
/// paths are connected, and `disconnect_blk` then `destroy_blks` before any
/// signal path is torn down.
pub trait DeviceSource {
    fn name(&self) -> &str;

    fn build_blks(&mut self, graph: &mut dyn EngineGraph) -> Result<()>;

    fn connect_blk(&mut self, graph: &mut dyn EngineGraph) -> Result<()>;

    fn disconnect_blk(&mut self, graph: &mut dyn EngineGraph) -> Result<()>;

    /// Release native blocks; a no-op when not built
    fn destroy_blks(&mut self, graph: &mut dyn EngineGraph) -> Result<()>;

    fn is_built(&self) -> bool;
}

/// Shared handle type the controller registers
pub type SharedDeviceSource = Rc<RefCell<dyn DeviceSource>>;

/// A multi-channel device producing synthetic data.
///
/// Stands in for real acquisition hardware: one `device_source` block with
/// an output port per channel, each generating its [`ChannelPattern`].
pub struct SimulatedDevice {
    name: String,
    patterns: Vec<ChannelPattern>,

    block: Option<BlockId>,
    sender: Option<Producer<DeviceSourceMessage>>,
    /// (channel, proxy block) registered by channels of built paths
    bindings: Vec<(usize, BlockId)>,
    wiring: Wiring,
}

impl SimulatedDevice {
    pub fn new(name: impl Into<String>, patterns: Vec<ChannelPattern>) -> Self {
        Self {
            name: name.into(),
            patterns,
            block: None,
            sender: None,
            bindings: Vec::new(),
            wiring: Wiring::new(),
        }
    }

    /// Same as [`new`](Self::new), wrapped for registration with a controller
    pub fn shared(name: impl Into<String>, patterns: Vec<ChannelPattern>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(name, patterns)))
    }

    /// A stage that exposes channel `index` of `device` inside a signal path
    pub fn channel(device: &Rc<RefCell<Self>>, index: usize) -> DeviceChannel {
        let name = format!("{}:ch{}", device.borrow().name, index);
        DeviceChannel {
            name,
            device: Rc::downgrade(device),
            channel: index,
            proxy: None,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.patterns.len()
    }

    pub fn pattern(&self, channel: usize) -> Option<ChannelPattern> {
        self.patterns.get(channel).copied()
    }

    /// Change a channel's pattern; applied live if the device is built
    pub fn set_pattern(&mut self, channel: usize, pattern: ChannelPattern) {
        let Some(slot) = self.patterns.get_mut(channel) else {
            tracing::warn!("{} has no channel {}", self.name, channel);
            return;
        };
        *slot = pattern;
        send_message(
            &mut self.sender,
            DeviceSourceMessage::SetPattern { channel, pattern },
            &self.name,
        );
    }

    /// Number of channel proxies currently bound
    #[inline]
    pub fn bound_channels(&self) -> usize {
        self.bindings.len()
    }

    fn bind(&mut self, channel: usize, proxy: BlockId) {
        self.bindings.push((channel, proxy));
    }

    fn unbind(&mut self, proxy: BlockId) {
        self.bindings.retain(|&(_, p)| p != proxy);
    }
}

impl DeviceSource for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_blks(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        if self.block.is_some() {
            return Err(GraphError::AlreadyBuilt(self.name.clone()));
        }
        let (block, sender) = graph.add("device_source", DeviceSourceBlock::new(self.patterns.clone()))?;
        self.block = Some(block);
        self.sender = Some(sender);
        Ok(())
    }

    fn connect_blk(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        let block = self.block.ok_or_else(|| GraphError::NoEndpoint(self.name.clone()))?;
        if self.bindings.is_empty() {
            tracing::debug!("{} has no bound channels", self.name);
        }
        for &(channel, proxy) in &self.bindings {
            self.wiring.connect(graph, Endpoint::new(block, channel), proxy, 0)?;
        }
        Ok(())
    }

    fn disconnect_blk(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        self.wiring.disconnect_all(graph)
    }

    fn destroy_blks(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        self.sender = None;
        self.wiring.clear();
        match self.block.take() {
            Some(block) => graph.remove_block(block),
            None => Ok(()),
        }
    }

    fn is_built(&self) -> bool {
        self.block.is_some()
    }
}

/// One device channel used as a path's source.
///
/// Holds only a weak reference to its device: a channel whose device is gone
/// still builds its proxy, which then carries silence.
pub struct DeviceChannel {
    name: String,
    device: Weak<RefCell<SimulatedDevice>>,
    channel: usize,
    proxy: Option<BlockId>,
}

impl DeviceChannel {
    #[inline]
    pub fn channel(&self) -> usize {
        self.channel
    }

    fn with_device(&self, f: impl FnOnce(&mut SimulatedDevice)) {
        let Some(device) = self.device.upgrade() else {
            tracing::warn!("device of {} was dropped", self.name);
            return;
        };
        match device.try_borrow_mut() {
            Ok(mut device) => f(&mut device),
            Err(_) => tracing::warn!("device of {} is busy; binding skipped", self.name),
        };
    }
}

impl ProcessingNode for DeviceChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        if self.proxy.is_some() {
            return Err(GraphError::AlreadyBuilt(self.name.clone()));
        }
        let (proxy, _) = graph.add("copy", Passthrough::new())?;
        self.proxy = Some(proxy);
        let channel = self.channel;
        self.with_device(|device| device.bind(channel, proxy));
        Ok(())
    }

    fn connect(&mut self, _graph: &mut dyn EngineGraph, previous: Option<Endpoint>) -> Result<Endpoint> {
        let proxy = self.proxy.ok_or_else(|| GraphError::NoEndpoint(self.name.clone()))?;
        if let Some(previous) = previous {
            tracing::debug!("{} is fed by its device; upstream {:?} is not consumed", self.name, previous);
        }
        Ok(Endpoint::new(proxy, 0))
    }

    fn disconnect(&mut self, _graph: &mut dyn EngineGraph) -> Result<()> {
        if let Some(proxy) = self.proxy {
            self.with_device(|device| device.unbind(proxy));
        }
        Ok(())
    }

    fn destroy(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        match self.proxy.take() {
            Some(proxy) => {
                self.with_device(|device| device.unbind(proxy));
                graph.remove_block(proxy)
            }
            None => Ok(()),
        }
    }

    fn is_built(&self) -> bool {
        self.proxy.is_some()
    }

    fn endpoint(&self) -> Option<Endpoint> {
        self.proxy.map(|proxy| Endpoint::new(proxy, 0))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
