//! The flow graph controller.
//!
//! [`FlowGraphController`] owns the set of signal paths and device sources
//! and the engine graph they are built into. It drives the lifecycle:
//!
//! ```text
//!            build               start
//!   Idle ------------> Built -------------> Running
//!     ^                  |  <-------------    |
//!     |     teardown     |       stop         |
//!     +------------------+--------------------+
//! ```
//!
//! A fresh engine graph is allocated on every build and discarded on
//! teardown. Attached paths report topology changes (enable flags, appended
//! stages) synchronously; each change rebuilds a graph that is built, and
//! is a no-op otherwise, so paths can be configured freely before the first
//! build.
//!
//! ```
//! use flowpath::{FlowGraphController, FlowState, ScaleOffset, SignalSource};
//!
//! let mut top = FlowGraphController::new("top");
//! let ch1 = top.create_signal_path("ch1");
//! ch1.append(SignalSource::new("src").with_amplitude(2.0)).unwrap();
//! let gain = ch1.append(ScaleOffset::new("gain").with_scale(3.0)).unwrap();
//!
//! top.build().unwrap();
//! assert_eq!(top.state(), FlowState::Built);
//! assert_eq!(top.edge_list().lines().count(), 2);
//!
//! // disabling a stage rebuilds the graph without it
//! ch1.set_node_enabled(gain, false).unwrap();
//! assert_eq!(top.edge_list(), "");
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::block::BlockId;
use crate::config::GraphConfig;
use crate::device::{DeviceSource, SharedDeviceSource};
use crate::engine::{describe, Engine, EngineGraph};
use crate::error::{GraphError, Result};
use crate::graph::DaspEngine;
use crate::path::{SignalPath, SubscriptionId, TopologyChange, WeakSignalPath};

/// Lifecycle state of a controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    /// Nothing built
    Idle,
    /// Graph built, engine stopped
    Built,
    /// Graph built, engine scheduling
    Running,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => write!(f, "idle"),
            FlowState::Built => write!(f, "built"),
            FlowState::Running => write!(f, "running"),
        }
    }
}

/// Called after every successful build with the new graph and the live paths
pub type BuiltObserver = Box<dyn FnMut(&mut dyn EngineGraph, &[SignalPath]) -> Result<()>>;

/// Called after every teardown
pub type TornDownObserver = Box<dyn FnMut()>;

enum PathEntry {
    /// Created by the controller, lives at least as long as it
    Owned(SignalPath),
    /// Attached by reference
    Attached(WeakSignalPath),
}

struct PathSlot {
    entry: PathEntry,
    subscription: SubscriptionId,
}

impl PathSlot {
    fn path(&self) -> Option<SignalPath> {
        match &self.entry {
            PathEntry::Owned(path) => Some(path.clone()),
            PathEntry::Attached(weak) => weak.upgrade(),
        }
    }

    fn is(&self, path: &SignalPath) -> bool {
        match &self.entry {
            PathEntry::Owned(owned) => owned.ptr_eq(path),
            PathEntry::Attached(weak) => weak.ptr_eq(path),
        }
    }
}

struct ControllerState<E: Engine> {
    config: GraphConfig,
    engine: E,
    graph: Option<Box<dyn EngineGraph>>,

    paths: Vec<PathSlot>,
    devices: Vec<Weak<RefCell<dyn DeviceSource>>>,

    built: bool,
    running: bool,

    built_observers: Vec<BuiltObserver>,
    torn_down_observers: Vec<TornDownObserver>,
}

fn device_ptr<T: ?Sized>(ptr: *const RefCell<T>) -> *const () {
    ptr as *const ()
}

impl<E: Engine> ControllerState<E> {
    fn state(&self) -> FlowState {
        match (self.built, self.running) {
            (_, true) => FlowState::Running,
            (true, false) => FlowState::Built,
            (false, false) => FlowState::Idle,
        }
    }

    fn live_paths(&self) -> Vec<SignalPath> {
        self.paths.iter().filter_map(PathSlot::path).collect()
    }

    fn live_devices(&self) -> Vec<SharedDeviceSource> {
        self.devices
            .iter()
            .filter_map(|weak| {
                let device = weak.upgrade();
                if device.is_none() {
                    tracing::warn!("skipping a device source that was dropped while registered");
                }
                device
            })
            .collect()
    }

    fn build(&mut self) -> Result<()> {
        if self.running {
            return Err(GraphError::invalid_state("build", FlowState::Running));
        }
        if self.graph.is_some() {
            self.teardown()?;
        }

        let paths = self.live_paths();
        let devices = self.live_devices();
        let max_depth = self.config.max_path_depth;
        tracing::info!(
            "building graph '{}' from {} path(s) and {} device source(s)",
            self.config.name,
            paths.len(),
            devices.len()
        );

        let fresh = self.engine.make_graph(&self.config.name);
        let graph = self.graph.insert(fresh);

        for path in paths.iter().filter(|p| p.is_enabled()) {
            path.connect_blk_bounded(graph.as_mut(), None, max_depth)?;
        }
        for device in &devices {
            let mut device = device.borrow_mut();
            device.build_blks(graph.as_mut())?;
            device.connect_blk(graph.as_mut())?;
        }

        for observer in self.built_observers.iter_mut() {
            observer(graph.as_mut(), &paths)?;
        }
        self.built = true;
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(mut graph) = self.graph.take() else {
            tracing::trace!("teardown of '{}': nothing built", self.config.name);
            return Ok(());
        };
        self.built = false;

        let paths = self.live_paths();
        let devices = self.live_devices();

        let mut result = Ok(());
        let mut keep = |r: Result<()>| {
            if let Err(e) = r {
                tracing::warn!("teardown step failed: {}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        };

        if self.running || graph.is_running() {
            keep(graph.stop());
            self.running = false;
        }
        for device in &devices {
            let mut device = device.borrow_mut();
            keep(device.disconnect_blk(graph.as_mut()));
            keep(device.destroy_blks(graph.as_mut()));
        }
        for path in &paths {
            keep(path.disconnect_blk(graph.as_mut()));
        }
        keep(graph.disconnect_all());
        drop(graph);

        tracing::info!("graph '{}' torn down", self.config.name);
        for observer in self.torn_down_observers.iter_mut() {
            observer();
        }
        result
    }

    fn start(&mut self) -> Result<()> {
        if self.running {
            tracing::trace!("graph '{}' already running", self.config.name);
            return Ok(());
        }
        let state = self.state();
        let graph = match self.graph.as_mut() {
            Some(graph) if self.built => graph,
            _ => return Err(GraphError::invalid_state("start", state)),
        };
        graph.start()?;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        match self.graph.as_mut() {
            Some(graph) => graph.stop(),
            None => Ok(()),
        }
    }

    fn wait(&mut self) -> Result<()> {
        if let Some(graph) = self.graph.as_mut() {
            graph.wait()?;
        }
        self.running = false;
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        let was_running = self.running;
        if was_running {
            self.stop()?;
        }

        let mut result = Ok(());
        if self.built {
            tracing::debug!("rebuilding graph '{}'", self.config.name);
            if let Err(e) = self.teardown() {
                result = Err(e);
            }
            self.build()?;
        } else {
            tracing::trace!("rebuild of '{}' skipped: not built", self.config.name);
        }

        if was_running {
            self.start()?;
        }
        result
    }
}

/// Owner of signal paths, device sources and the engine graph built from them.
///
/// Single-threaded: all lifecycle operations run on the thread that owns the
/// controller. Only the engine's scheduler runs elsewhere.
pub struct FlowGraphController<E: Engine = DaspEngine> {
    state: Rc<RefCell<ControllerState<E>>>,
}

impl FlowGraphController<DaspEngine> {
    /// A controller with default settings on the default engine
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(GraphConfig::new(name))
    }

    pub fn with_config(config: GraphConfig) -> Self {
        let engine = DaspEngine::new(config.clone());
        Self::with_engine(config, engine)
    }
}

impl<E: Engine> FlowGraphController<E> {
    pub fn with_engine(config: GraphConfig, engine: E) -> Self {
        Self {
            state: Rc::new(RefCell::new(ControllerState {
                config,
                engine,
                graph: None,
                paths: Vec::new(),
                devices: Vec::new(),
                built: false,
                running: false,
                built_observers: Vec::new(),
                torn_down_observers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> Result<std::cell::RefMut<'_, ControllerState<E>>> {
        self.state.try_borrow_mut().map_err(|_| GraphError::ReentrantRebuild)
    }

    fn subscribe(&self, path: &SignalPath) -> SubscriptionId {
        let weak = Rc::downgrade(&self.state);
        path.subscribe(move |change: &TopologyChange| {
            let Some(shared) = weak.upgrade() else {
                return Ok(());
            };
            let mut state = shared.try_borrow_mut().map_err(|_| {
                tracing::warn!("ignoring {:?}: controller is busy", change);
                GraphError::ReentrantRebuild
            })?;
            tracing::debug!("topology changed: {:?}", change);
            state.rebuild()
        })
    }

    pub fn config(&self) -> GraphConfig {
        self.state.borrow().config.clone()
    }

    pub fn state(&self) -> FlowState {
        self.state.borrow().state()
    }

    pub fn is_built(&self) -> bool {
        self.state.borrow().built
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Create a path owned by this controller.
    ///
    /// The path is subscribed for rebuilds and dropped with the controller
    /// unless the caller keeps a handle.
    pub fn create_signal_path(&mut self, name: impl Into<String>) -> SignalPath {
        let path = SignalPath::new(name);
        let subscription = self.subscribe(&path);
        self.state.borrow_mut().paths.push(PathSlot {
            entry: PathEntry::Owned(path.clone()),
            subscription,
        });
        path
    }

    /// Attach a path owned elsewhere. Only a weak reference is kept.
    ///
    /// Returns `false` if the path was already attached.
    pub fn attach_signal_path(&mut self, path: &SignalPath) -> bool {
        if self.state.borrow().paths.iter().any(|slot| slot.is(path)) {
            return false;
        }
        let subscription = self.subscribe(path);
        self.state.borrow_mut().paths.push(PathSlot {
            entry: PathEntry::Attached(path.downgrade()),
            subscription,
        });
        true
    }

    /// Remove a path from the controller. A built graph is rebuilt without it.
    pub fn detach_signal_path(&mut self, path: &SignalPath) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(index) = state.paths.iter().position(|slot| slot.is(path)) else {
            return Ok(false);
        };

        let was_running = state.running;
        state.stop()?;
        let was_built = state.built;
        let torn = state.teardown();

        let slot = state.paths.remove(index);
        path.unsubscribe(slot.subscription);

        if was_built {
            state.build()?;
        }
        if was_running {
            state.start()?;
        }
        torn.map(|_| true)
    }

    /// Live paths in attach order
    pub fn signal_paths(&self) -> Vec<SignalPath> {
        self.state.borrow().live_paths()
    }

    /// Register a device source. Registering the same device twice is a no-op.
    pub fn register_device_source<D: DeviceSource + 'static>(&mut self, device: &Rc<RefCell<D>>) {
        let ptr = device_ptr(Rc::as_ptr(device));
        let mut state = self.state.borrow_mut();
        if state.devices.iter().any(|weak| device_ptr(weak.as_ptr()) == ptr) {
            return;
        }
        let shared: SharedDeviceSource = device.clone();
        state.devices.push(Rc::downgrade(&shared));
    }

    /// Unregister a device source, tearing it down on the live graph if built.
    pub fn unregister_device_source<D: DeviceSource + 'static>(&mut self, device: &Rc<RefCell<D>>) -> Result<bool> {
        let ptr = device_ptr(Rc::as_ptr(device));
        let mut state = self.lock()?;
        let before = state.devices.len();
        state.devices.retain(|weak| device_ptr(weak.as_ptr()) != ptr);
        if state.devices.len() == before {
            return Ok(false);
        }

        let Some(graph) = state.graph.as_mut() else {
            return Ok(true);
        };
        let mut device = device.borrow_mut();
        if !device.is_built() {
            return Ok(true);
        }

        let was_running = graph.is_running();
        if was_running {
            graph.stop()?;
        }
        let disconnected = device.disconnect_blk(graph.as_mut());
        let destroyed = device.destroy_blks(graph.as_mut());
        if was_running {
            graph.start()?;
        }
        disconnected.and(destroyed).map(|_| true)
    }

    /// Build a fresh engine graph: enabled paths first, then device sources,
    /// then the built observers.
    ///
    /// A previous graph is torn down first. On failure the partial graph is
    /// kept and the controller stays unbuilt; [`teardown`](Self::teardown)
    /// cleans it up.
    pub fn build(&mut self) -> Result<()> {
        self.lock()?.build()
    }

    /// Stop if running, then release every native block and connection.
    ///
    /// Safe to call repeatedly and on a partially built graph.
    pub fn teardown(&mut self) -> Result<()> {
        self.lock()?.teardown()
    }

    pub fn start(&mut self) -> Result<()> {
        let mut state = self.lock()?;
        state.start()?;
        tracing::info!("graph '{}' running", state.config.name);
        Ok(())
    }

    /// Stop the engine and block until it has quiesced
    pub fn stop(&mut self) -> Result<()> {
        self.lock()?.stop()
    }

    /// Block until the engine completes on its own
    pub fn wait(&mut self) -> Result<()> {
        self.lock()?.wait()
    }

    /// Start, then wait for completion
    pub fn run(&mut self) -> Result<()> {
        let mut state = self.lock()?;
        state.start()?;
        state.wait()
    }

    /// Tear down and build again, restoring the running state.
    ///
    /// A no-op while nothing is built.
    pub fn rebuild(&mut self) -> Result<()> {
        self.lock()?.rebuild()
    }

    /// Connect two native blocks directly on the current graph
    pub fn connect(
        &mut self,
        src: BlockId,
        src_port: usize,
        dst: BlockId,
        dst_port: usize,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let current = state.state();
        let graph = state
            .graph
            .as_mut()
            .ok_or_else(|| GraphError::invalid_state("connect", current))?;
        tracing::debug!(
            "connecting {}:{} to {}:{}",
            describe(&**graph, src),
            src_port,
            describe(&**graph, dst),
            dst_port
        );
        graph.connect(src, src_port, dst, dst_port)
    }

    /// Edge dump of the current graph, empty when nothing is built
    pub fn edge_list(&self) -> String {
        self.state
            .borrow()
            .graph
            .as_ref()
            .map(|graph| graph.edge_list())
            .unwrap_or_default()
    }

    /// Direct access to the current engine graph
    pub fn with_graph<R>(&mut self, f: impl FnOnce(&mut dyn EngineGraph) -> R) -> Option<R> {
        let mut state = self.state.borrow_mut();
        state.graph.as_mut().map(|graph| f(graph.as_mut()))
    }

    /// Observe every successful build, e.g. to attach sinks to path endpoints
    pub fn on_graph_built(&mut self, f: impl FnMut(&mut dyn EngineGraph, &[SignalPath]) -> Result<()> + 'static) {
        self.state.borrow_mut().built_observers.push(Box::new(f));
    }

    pub fn on_graph_torn_down(&mut self, f: impl FnMut() + 'static) {
        self.state.borrow_mut().torn_down_observers.push(Box::new(f));
    }
}

impl<E: Engine> Drop for FlowGraphController<E> {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if let Err(e) = state.teardown() {
            tracing::warn!("teardown on drop failed: {}", e);
        }
        for slot in state.paths.drain(..) {
            if let Some(path) = slot.path() {
                path.unsubscribe(slot.subscription);
            }
        }
    }
}

impl<E: Engine> fmt::Debug for FlowGraphController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("FlowGraphController")
                .field("name", &state.config.name)
                .field("state", &state.state())
                .field("paths", &state.paths.len())
                .field("devices", &state.devices.len())
                .finish(),
            Err(_) => f.write_str("FlowGraphController { <busy> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{ScaleOffset, SignalSource};

    #[test]
    fn state_follows_the_lifecycle() {
        let mut top = FlowGraphController::new("top");
        let p = top.create_signal_path("p");
        p.append(SignalSource::new("src")).unwrap();

        assert_eq!(top.state(), FlowState::Idle);
        assert!(matches!(top.start(), Err(GraphError::InvalidStateTransition { .. })));
        top.build().unwrap();
        assert_eq!(top.state(), FlowState::Built);
        top.start().unwrap();
        assert_eq!(top.state(), FlowState::Running);
        assert!(matches!(top.build(), Err(GraphError::InvalidStateTransition { .. })));
        top.stop().unwrap();
        assert_eq!(top.state(), FlowState::Built);
        top.teardown().unwrap();
        assert_eq!(top.state(), FlowState::Idle);
        top.teardown().unwrap();
    }

    #[test]
    fn toggles_before_build_do_nothing() {
        let mut top = FlowGraphController::new("top");
        let p = top.create_signal_path("p");
        p.append(SignalSource::new("src")).unwrap();
        p.set_enabled(false).unwrap();
        p.set_enabled(true).unwrap();
        assert_eq!(top.state(), FlowState::Idle);
        assert_eq!(top.edge_list(), "");
    }

    #[test]
    fn attached_paths_are_not_kept_alive() {
        let mut top = FlowGraphController::new("top");
        let external = SignalPath::new("ext");
        external.append(SignalSource::new("src")).unwrap();
        assert!(top.attach_signal_path(&external));
        assert!(!top.attach_signal_path(&external));

        let owned = top.create_signal_path("owned");
        drop(owned);
        assert_eq!(top.signal_paths().len(), 2);
        drop(external);
        assert_eq!(top.signal_paths().len(), 1);
    }

    #[test]
    fn observers_cannot_rebuild() {
        let mut top = FlowGraphController::new("top");
        let p = top.create_signal_path("p");
        p.append(SignalSource::new("src")).unwrap();
        p.append(ScaleOffset::new("s")).unwrap();

        let seen = Rc::new(RefCell::new(None));
        top.on_graph_built({
            let seen = seen.clone();
            move |_, paths| {
                *seen.borrow_mut() = Some(paths[0].set_enabled(false));
                Ok(())
            }
        });
        top.build().unwrap();
        assert!(matches!(seen.borrow_mut().take(), Some(Err(GraphError::ReentrantRebuild))));
    }

    #[test]
    fn detaching_rebuilds_without_the_path() {
        let mut top = FlowGraphController::new("top");
        let a = top.create_signal_path("a");
        a.append(SignalSource::new("src")).unwrap();
        a.append(ScaleOffset::new("s")).unwrap();
        let b = top.create_signal_path("b");
        b.append(SignalSource::new("src")).unwrap();

        top.build().unwrap();
        assert_eq!(top.edge_list().lines().count(), 2);
        assert!(top.detach_signal_path(&a).unwrap());
        assert_eq!(top.edge_list(), "");
        assert!(top.is_built());
        assert!(!a.is_built());
        assert!(!top.detach_signal_path(&a).unwrap());
    }
}
