//! Signal paths: named, ordered chains of processing stages.
//!
//! A [`SignalPath`] is a cheap, cloneable handle to shared path state. Its
//! chain holds two kinds of links: owned stages and weak references to other
//! paths ("upstream" paths) whose output feeds the chain.
//!
//! # Endpoint resolution
//!
//! While connecting, the path threads an endpoint through its chain:
//!
//! - an enabled stage is built and connected to the running endpoint, and its
//!   output becomes the new running endpoint
//! - a disabled stage is skipped, so its neighbours are spliced together
//! - an upstream link replaces the running endpoint with the upstream path's
//!   endpoint, connecting that path on demand if nothing has yet
//!
//! The path's endpoint is whatever is left at the end: the last enabled
//! stage, else the upstream's endpoint. A disabled upstream path that itself
//! has an upstream is bypassed entirely and forwards its own upstream.
//! Upstream paths are connected at most once per build pass; every later
//! consumer reuses the cached endpoint.
//!
//! ```
//! use flowpath::{DaspEngine, Engine, GraphConfig, ScaleOffset, SignalPath, SignalSource};
//!
//! let source = SignalPath::new("source");
//! source.append(SignalSource::new("sin").with_amplitude(2.0)).unwrap();
//!
//! let scaled = SignalPath::new("scaled");
//! scaled.append_path(&source).unwrap();
//! scaled.append(ScaleOffset::new("gain").with_scale(3.0)).unwrap();
//!
//! let mut engine = DaspEngine::new(GraphConfig::default());
//! let mut graph = engine.make_graph("top");
//! scaled.connect_blk(graph.as_mut(), None).unwrap();
//!
//! assert_eq!(
//!     graph.edge_list(),
//!     "sig_source0:0->multiply_const_ff0:0\nmultiply_const_ff0:0->add_const_ff0:0\n"
//! );
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::DEFAULT_MAX_PATH_DEPTH;
use crate::engine::EngineGraph;
use crate::error::{GraphError, Result};
use crate::node::{Endpoint, ProcessingNode};

/// Identifies a stage within its path
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Handle returned by [`SignalPath::subscribe`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriptionId(u64);

/// What changed in a path's topology
#[derive(Clone, Debug, PartialEq)]
pub enum TopologyChange {
    PathEnabled { path: String, enabled: bool },
    NodeEnabled { path: String, node: NodeId, enabled: bool },
    NodeAppended { path: String, node: NodeId },
    UpstreamAppended { path: String, upstream: String },
}

/// One active segment of a path, see [`SignalPath::topology`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Node { id: NodeId, name: String },
    Upstream { path: String },
}

/// Topology listener. An error aborts nothing on the path side; it is handed
/// back to whoever made the change.
pub type Listener = Rc<dyn Fn(&TopologyChange) -> Result<()>>;

enum Link {
    Node {
        id: NodeId,
        node: Box<dyn ProcessingNode>,
        enabled: bool,
    },
    Upstream(WeakSignalPath),
}

struct PathInner {
    name: String,
    enabled: bool,
    links: Vec<Link>,
    next_node_id: u32,

    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,

    /// Set from the start of `connect_blk` until `disconnect_blk`
    built: bool,
    endpoint: Option<Endpoint>,
}

impl PathInner {
    fn upstream(&self) -> Option<SignalPath> {
        self.links.iter().rev().find_map(|link| match link {
            Link::Upstream(weak) => weak.upgrade(),
            Link::Node { .. } => None,
        })
    }

    fn upstreams(&self) -> impl Iterator<Item = SignalPath> + '_ {
        self.links.iter().filter_map(|link| match link {
            Link::Upstream(weak) => weak.upgrade(),
            Link::Node { .. } => None,
        })
    }
}

/// A named, ordered chain of processing stages.
///
/// Cloning the handle shares the path. A path created with [`new`](Self::new)
/// lives as long as some handle does; controllers only keep weak references
/// to paths they did not create.
#[derive(Clone)]
pub struct SignalPath {
    inner: Rc<RefCell<PathInner>>,
}

/// Non-owning reference to a [`SignalPath`]
#[derive(Clone)]
pub struct WeakSignalPath {
    inner: Weak<RefCell<PathInner>>,
}

impl WeakSignalPath {
    pub fn upgrade(&self) -> Option<SignalPath> {
        self.inner.upgrade().map(|inner| SignalPath { inner })
    }

    pub fn ptr_eq(&self, path: &SignalPath) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&path.inner))
    }
}

type Trail = Vec<*const RefCell<PathInner>>;

impl SignalPath {
    /// An empty, enabled path
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PathInner {
                name: name.into(),
                enabled: true,
                links: Vec::new(),
                next_node_id: 0,
                listeners: Vec::new(),
                next_subscription: 0,
                built: false,
                endpoint: None,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn downgrade(&self) -> WeakSignalPath {
        WeakSignalPath {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &SignalPath) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.borrow().enabled
    }

    /// Enable or disable the whole path.
    ///
    /// A disabled path is not connected by the controller, but stays
    /// available to the paths that reference it.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let name = {
            let mut inner = self.inner.borrow_mut();
            if inner.enabled == enabled {
                return Ok(());
            }
            inner.enabled = enabled;
            inner.name.clone()
        };
        tracing::debug!("path '{}' {}", name, if enabled { "enabled" } else { "disabled" });
        self.notify(TopologyChange::PathEnabled { path: name, enabled })
    }

    /// Append a stage at the end of the chain.
    ///
    /// The stage is not built until the next build pass.
    pub fn append<N: ProcessingNode>(&self, node: N) -> Result<NodeId> {
        let (name, id) = {
            let mut inner = self.inner.borrow_mut();
            let id = NodeId(inner.next_node_id);
            inner.next_node_id += 1;
            inner.links.push(Link::Node {
                id,
                node: Box::new(node),
                enabled: true,
            });
            (inner.name.clone(), id)
        };
        self.notify(TopologyChange::NodeAppended { path: name, node: id })?;
        Ok(id)
    }

    /// Use another path's output as the input of the stages that follow.
    ///
    /// Only a weak reference is stored. Fails with [`GraphError::PathCycle`]
    /// if `upstream` is this path or already depends on it.
    pub fn append_path(&self, upstream: &SignalPath) -> Result<()> {
        if self.ptr_eq(upstream) || upstream.depends_on(self) {
            return Err(GraphError::PathCycle(self.name()));
        }
        let change = {
            let mut inner = self.inner.borrow_mut();
            inner.links.push(Link::Upstream(upstream.downgrade()));
            TopologyChange::UpstreamAppended {
                path: inner.name.clone(),
                upstream: upstream.name(),
            }
        };
        self.notify(change)
    }

    /// Enable or disable a single stage
    pub fn set_node_enabled(&self, id: NodeId, enabled: bool) -> Result<()> {
        let name = {
            let mut inner = self.inner.borrow_mut();
            let name = inner.name.clone();
            let flag = inner
                .links
                .iter_mut()
                .find_map(|link| match link {
                    Link::Node { id: node_id, enabled, .. } if *node_id == id => Some(enabled),
                    _ => None,
                })
                .ok_or_else(|| GraphError::UnknownNode { path: name.clone(), node: id })?;
            if *flag == enabled {
                return Ok(());
            }
            *flag = enabled;
            name
        };
        self.notify(TopologyChange::NodeEnabled { path: name, node: id, enabled })
    }

    pub fn is_node_enabled(&self, id: NodeId) -> Option<bool> {
        self.inner.borrow().links.iter().find_map(|link| match link {
            Link::Node { id: node_id, enabled, .. } if *node_id == id => Some(*enabled),
            _ => None,
        })
    }

    /// Typed access to a stage, e.g. for parameter changes on a live graph.
    ///
    /// Returns `None` if the id is unknown or the stage is not an `N`.
    pub fn with_node<N: ProcessingNode, R>(&self, id: NodeId, f: impl FnOnce(&mut N) -> R) -> Option<R> {
        let mut inner = self.inner.borrow_mut();
        let node = inner.links.iter_mut().find_map(|link| match link {
            Link::Node { id: node_id, node, .. } if *node_id == id => node.as_any_mut().downcast_mut::<N>(),
            _ => None,
        })?;
        Some(f(node))
    }

    /// Number of stages, enabled or not
    pub fn node_count(&self) -> usize {
        self.inner
            .borrow()
            .links
            .iter()
            .filter(|link| matches!(link, Link::Node { .. }))
            .count()
    }

    /// Active segments in chain order, from the current flags
    pub fn topology(&self) -> Vec<Segment> {
        self.inner
            .borrow()
            .links
            .iter()
            .filter_map(|link| match link {
                Link::Node { id, node, enabled: true } => Some(Segment::Node {
                    id: *id,
                    name: node.name().to_string(),
                }),
                Link::Node { .. } => None,
                Link::Upstream(weak) => weak.upgrade().map(|p| Segment::Upstream { path: p.name() }),
            })
            .collect()
    }

    /// Whether the path was connected in the current build pass
    pub fn is_built(&self) -> bool {
        self.inner.borrow().built
    }

    /// Output of the path while built, `None` otherwise
    pub fn endpoint(&self) -> Option<Endpoint> {
        let inner = self.inner.borrow();
        if inner.built {
            inner.endpoint
        } else {
            None
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&TopologyChange) -> Result<()> + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(sub, _)| *sub != id);
        inner.listeners.len() != before
    }

    /// Build and connect every enabled stage, threading `previous` through
    /// the chain. Returns the path's endpoint.
    ///
    /// Referenced upstream paths are connected on demand. Calling this on a
    /// path that is already built returns the cached endpoint.
    pub fn connect_blk(&self, graph: &mut dyn EngineGraph, previous: Option<Endpoint>) -> Result<Option<Endpoint>> {
        self.connect_blk_bounded(graph, previous, DEFAULT_MAX_PATH_DEPTH)
    }

    /// [`connect_blk`](Self::connect_blk) with an explicit bound on how
    /// many paths a resolution may traverse
    pub fn connect_blk_bounded(
        &self,
        graph: &mut dyn EngineGraph,
        previous: Option<Endpoint>,
        max_depth: usize,
    ) -> Result<Option<Endpoint>> {
        let mut trail = Trail::new();
        self.connect_inner(graph, previous, &mut trail, max_depth)
    }

    /// Disconnect and destroy every built stage, then any built upstream path.
    ///
    /// Best-effort: keeps going past failures and returns the first one.
    /// Upstream links are followed even when this path is not built, since a
    /// disabled path may have been bypassed in favour of its own upstream.
    pub fn disconnect_blk(&self, graph: &mut dyn EngineGraph) -> Result<()> {
        let mut seen: Trail = Vec::new();
        self.disconnect_inner(graph, &mut seen)
    }

    fn disconnect_inner(&self, graph: &mut dyn EngineGraph, seen: &mut Trail) -> Result<()> {
        let ptr = Rc::as_ptr(&self.inner);
        if seen.contains(&ptr) {
            return Ok(());
        }
        seen.push(ptr);

        let mut result = Ok(());
        let mut keep = |r: Result<()>| {
            if let Err(e) = r {
                tracing::warn!("teardown step failed: {}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        };

        let upstreams: Vec<SignalPath> = {
            let mut inner = self.inner.borrow_mut();
            if inner.built {
                inner.built = false;
                inner.endpoint = None;
                tracing::debug!("disconnecting path '{}'", inner.name);

                for link in inner.links.iter_mut() {
                    if let Link::Node { node, .. } = link {
                        if node.is_built() {
                            keep(node.disconnect(graph));
                        }
                    }
                }
                for link in inner.links.iter_mut() {
                    if let Link::Node { node, .. } = link {
                        keep(node.destroy(graph));
                    }
                }
            }
            inner.upstreams().collect()
        };

        for upstream in upstreams {
            keep(upstream.disconnect_inner(graph, seen));
        }
        result
    }

    fn depends_on(&self, other: &SignalPath) -> bool {
        let mut stack = vec![self.clone()];
        let mut seen: Trail = Vec::new();
        while let Some(path) = stack.pop() {
            if path.ptr_eq(other) {
                return true;
            }
            let ptr = Rc::as_ptr(&path.inner);
            if seen.contains(&ptr) {
                continue;
            }
            seen.push(ptr);
            stack.extend(path.inner.borrow().upstreams());
        }
        false
    }

    fn enter(&self, trail: &mut Trail, max_depth: usize) -> Result<()> {
        let ptr = Rc::as_ptr(&self.inner);
        if trail.contains(&ptr) || trail.len() >= max_depth {
            // the path on the trail is mutably borrowed, so only the pointer is safe to use
            let name = self.inner.try_borrow().map(|i| i.name.clone()).unwrap_or_default();
            return Err(GraphError::PathCycle(name));
        }
        trail.push(ptr);
        Ok(())
    }

    fn connect_inner(
        &self,
        graph: &mut dyn EngineGraph,
        previous: Option<Endpoint>,
        trail: &mut Trail,
        max_depth: usize,
    ) -> Result<Option<Endpoint>> {
        self.enter(trail, max_depth)?;
        let result = self.connect_chain(graph, previous, trail, max_depth);
        trail.pop();
        result
    }

    fn connect_chain(
        &self,
        graph: &mut dyn EngineGraph,
        previous: Option<Endpoint>,
        trail: &mut Trail,
        max_depth: usize,
    ) -> Result<Option<Endpoint>> {
        let mut inner = self.inner.borrow_mut();
        if inner.built {
            return Ok(inner.endpoint);
        }
        // Marked up front so a failed pass still gets torn down
        inner.built = true;
        tracing::debug!("connecting path '{}'", inner.name);

        let mut current = previous;
        for link in inner.links.iter_mut() {
            match link {
                Link::Node { node, enabled: true, .. } => {
                    node.build(graph)?;
                    current = Some(node.connect(graph, current)?);
                }
                Link::Node { node, enabled: false, .. } => {
                    tracing::trace!("skipping disabled node '{}'", node.name());
                }
                Link::Upstream(weak) => {
                    let Some(upstream) = weak.upgrade() else {
                        tracing::warn!("upstream path was dropped; link skipped");
                        continue;
                    };
                    let endpoint = upstream.resolve_as_upstream(graph, trail, max_depth)?;
                    current = Some(endpoint.ok_or_else(|| GraphError::NoEndpoint(upstream.name()))?);
                }
            }
        }

        inner.endpoint = current;
        Ok(current)
    }

    // Endpoint of this path as seen by a consumer
    fn resolve_as_upstream(
        &self,
        graph: &mut dyn EngineGraph,
        trail: &mut Trail,
        max_depth: usize,
    ) -> Result<Option<Endpoint>> {
        let bypass = {
            let inner = self.inner.try_borrow().map_err(|_| GraphError::PathCycle(String::new()))?;
            if inner.enabled || inner.built {
                None
            } else {
                inner.upstream()
            }
        };

        match bypass {
            Some(upstream) => {
                tracing::debug!("path '{}' is disabled; forwarding '{}'", self.name(), upstream.name());
                self.enter(trail, max_depth)?;
                let result = upstream.resolve_as_upstream(graph, trail, max_depth);
                trail.pop();
                result
            }
            None => self.connect_inner(graph, None, trail, max_depth),
        }
    }

    fn notify(&self, change: TopologyChange) -> Result<()> {
        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        let mut result = Ok(());
        for listener in listeners {
            if let Err(e) = listener(&change) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

impl fmt::Debug for SignalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("SignalPath")
                .field("name", &inner.name)
                .field("enabled", &inner.enabled)
                .field("links", &inner.links.len())
                .field("built", &inner.built)
                .finish(),
            Err(_) => f.write_str("SignalPath { <busy> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::FlowGraph;
    use crate::stages::{ScaleOffset, SignalSource};

    fn graph() -> FlowGraph {
        FlowGraph::new("test", GraphConfig::default())
    }

    fn source_path(name: &str) -> SignalPath {
        let path = SignalPath::new(name);
        path.append(SignalSource::new("src")).unwrap();
        path
    }

    #[test]
    fn threads_endpoints_in_chain_order() {
        let mut g = graph();
        let path = source_path("p");
        path.append(ScaleOffset::new("a")).unwrap();
        path.append(ScaleOffset::new("b")).unwrap();

        let end = path.connect_blk(&mut g, None).unwrap();
        assert_eq!(g.edge_count(), 4);
        assert_eq!(end.and_then(|e| g.block_name(e.block)).as_deref(), Some("add_const_ff1"));
    }

    #[test]
    fn disabled_node_is_spliced_out() {
        let mut g = graph();
        let path = source_path("p");
        let a = path.append(ScaleOffset::new("a")).unwrap();
        path.append(ScaleOffset::new("b")).unwrap();
        path.set_node_enabled(a, false).unwrap();

        path.connect_blk(&mut g, None).unwrap();
        assert_eq!(
            g.edge_list(),
            "sig_source0:0->multiply_const_ff0:0\nmultiply_const_ff0:0->add_const_ff0:0\n"
        );
        assert_eq!(path.topology().len(), 2);
    }

    #[test]
    fn shared_upstream_is_built_once() {
        let mut g = graph();
        let up = source_path("up");
        let left = SignalPath::new("left");
        left.append_path(&up).unwrap();
        left.append(ScaleOffset::new("l")).unwrap();
        let right = SignalPath::new("right");
        right.append_path(&up).unwrap();
        right.append(ScaleOffset::new("r")).unwrap();

        left.connect_blk(&mut g, None).unwrap();
        right.connect_blk(&mut g, None).unwrap();
        assert_eq!(g.edge_list().matches("sig_source0:0->").count(), 2);
        assert!(!g.edge_list().contains("sig_source1"));
    }

    #[test]
    fn disabled_upstream_forwards_its_own_upstream() {
        let mut g = graph();
        let root = source_path("root");
        let middle = SignalPath::new("middle");
        middle.append_path(&root).unwrap();
        middle.append(ScaleOffset::new("m")).unwrap();
        middle.set_enabled(false).unwrap();

        let leaf = SignalPath::new("leaf");
        leaf.append_path(&middle).unwrap();
        let end = leaf.connect_blk(&mut g, None).unwrap();

        assert_eq!(end, root.endpoint());
        assert!(!middle.is_built());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn teardown_reaches_past_a_bypassed_upstream() {
        let root = source_path("root");
        let middle = SignalPath::new("middle");
        middle.append_path(&root).unwrap();
        middle.append(ScaleOffset::new("m")).unwrap();
        middle.set_enabled(false).unwrap();

        let leaf = SignalPath::new("leaf");
        leaf.append_path(&middle).unwrap();
        leaf.append(ScaleOffset::new("l")).unwrap();

        let mut first = graph();
        leaf.connect_blk(&mut first, None).unwrap();
        let edges = first.edge_list();
        leaf.disconnect_blk(&mut first).unwrap();
        assert!(!root.is_built());
        assert!(root.endpoint().is_none());
        assert_eq!(first.block_count(), 0);

        let mut second = graph();
        leaf.connect_blk(&mut second, None).unwrap();
        assert_eq!(second.edge_list(), edges);
        assert_eq!(edges, "sig_source0:0->multiply_const_ff0:0\nmultiply_const_ff0:0->add_const_ff0:0\n");
    }

    #[test]
    fn empty_path_without_upstream_has_no_endpoint() {
        let mut g = graph();
        let empty = SignalPath::new("empty");
        let consumer = SignalPath::new("consumer");
        consumer.append_path(&empty).unwrap();
        assert!(matches!(
            consumer.connect_blk(&mut g, None),
            Err(GraphError::NoEndpoint(name)) if name == "empty"
        ));
    }

    #[test]
    fn rejects_cycles() {
        let a = SignalPath::new("a");
        let b = SignalPath::new("b");
        a.append_path(&b).unwrap();
        assert!(matches!(b.append_path(&a), Err(GraphError::PathCycle(_))));
        assert!(matches!(a.append_path(&a), Err(GraphError::PathCycle(_))));
    }

    #[test]
    fn depth_bound_stops_long_chains() {
        let mut g = graph();
        let mut previous = source_path("p0");
        let first = previous.clone();
        let mut all = vec![first];
        for i in 1..5 {
            let next = SignalPath::new(format!("p{}", i));
            next.append_path(&previous).unwrap();
            all.push(next.clone());
            previous = next;
        }
        assert!(matches!(
            previous.connect_blk_bounded(&mut g, None, 3),
            Err(GraphError::PathCycle(_))
        ));
        previous.disconnect_blk(&mut g).unwrap();
        assert!(previous.connect_blk_bounded(&mut g, None, 8).unwrap().is_some());
    }

    #[test]
    fn disconnect_releases_blocks_and_upstreams() {
        let mut g = graph();
        let up = source_path("up");
        let down = SignalPath::new("down");
        down.append_path(&up).unwrap();
        down.append(ScaleOffset::new("s")).unwrap();

        down.connect_blk(&mut g, None).unwrap();
        assert_eq!(g.block_count(), 3);
        down.disconnect_blk(&mut g).unwrap();
        assert_eq!(g.block_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(!up.is_built());
        // second call is a no-op
        down.disconnect_blk(&mut g).unwrap();
    }

    #[test]
    fn notifies_only_on_change() {
        let path = source_path("p");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = path.subscribe({
            let seen = seen.clone();
            move |change| {
                seen.borrow_mut().push(change.clone());
                Ok(())
            }
        });

        path.set_enabled(true).unwrap();
        path.set_enabled(false).unwrap();
        path.set_enabled(false).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![TopologyChange::PathEnabled { path: "p".into(), enabled: false }]
        );

        assert!(path.unsubscribe(sub));
        path.set_enabled(true).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn listener_errors_reach_the_caller() {
        let path = SignalPath::new("p");
        path.subscribe(|_| Err(GraphError::ReentrantRebuild));
        assert!(matches!(path.set_enabled(false), Err(GraphError::ReentrantRebuild)));
        assert!(!path.is_enabled());
    }

    #[test]
    fn typed_node_access() {
        let path = SignalPath::new("p");
        let id = path.append(ScaleOffset::new("s").with_scale(2.0)).unwrap();
        assert_eq!(path.with_node(id, |s: &mut ScaleOffset| s.scale()), Some(2.0));
        assert_eq!(path.with_node(id, |s: &mut SignalSource| s.amplitude()), None);
        assert!(matches!(
            path.set_node_enabled(NodeId(42), false),
            Err(GraphError::UnknownNode { .. })
        ));
    }
}
