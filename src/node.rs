//! Processing node contract.
//!
//! A processing node is one stage of a [`SignalPath`](crate::SignalPath): a
//! source, a transform or a device channel. It owns no samples itself; while
//! a graph is built it owns one or more native blocks inside the engine graph.
//!
//! The lifecycle of a node across a rebuild cycle is:
//!
//! 1. [`build`](ProcessingNode::build) - allocate blocks (fails with
//!    [`GraphError::AlreadyBuilt`](crate::GraphError::AlreadyBuilt) if called twice)
//! 2. [`connect`](ProcessingNode::connect) - wire `previous` into the node and
//!    return the node's own output
//! 3. [`disconnect`](ProcessingNode::disconnect) - remove the wiring, keep blocks
//! 4. [`destroy`](ProcessingNode::destroy) - release blocks; `build` may follow

use std::any::Any;

use crate::block::BlockId;
use crate::engine::EngineGraph;
use crate::error::Result;

/// A resolved native output: a block and one of its output ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub block: BlockId,
    pub port: usize,
}

impl Endpoint {
    pub fn new(block: BlockId, port: usize) -> Self {
        Self { block, port }
    }
}

/// The core trait for processing stages.
///
/// Implementations keep their block ids between `build` and `destroy`, and
/// must only touch the engine graph they are handed. Nodes never reach into
/// another node; they only see the `previous` endpoint.
pub trait ProcessingNode: Any {
    /// Human readable stage name, used in logs and errors
    fn name(&self) -> &str;

    /// Allocate native blocks inside `graph`
    fn build(&mut self, graph: &mut dyn EngineGraph) -> Result<()>;

    /// Wire `previous` into this node and return this node's output
    fn connect(&mut self, graph: &mut dyn EngineGraph, previous: Option<Endpoint>) -> Result<Endpoint>;

    /// Remove the wiring made by `connect`
    fn disconnect(&mut self, graph: &mut dyn EngineGraph) -> Result<()>;

    /// Release every native block; a no-op when not built
    fn destroy(&mut self, graph: &mut dyn EngineGraph) -> Result<()>;

    /// Whether native blocks are currently allocated
    fn is_built(&self) -> bool;

    /// Output of the node while built and connected
    fn endpoint(&self) -> Option<Endpoint>;

    /// Typed access for parameter changes, see [`SignalPath::with_node`](crate::SignalPath::with_node)
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Edges a node issued, kept so they can be undone in the same order.
#[derive(Debug, Default)]
pub struct Wiring {
    edges: Vec<(Endpoint, BlockId, usize)>,
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `from` to input `dst_port` of `dst` and remember the edge
    pub fn connect(&mut self, graph: &mut dyn EngineGraph, from: Endpoint, dst: BlockId, dst_port: usize) -> Result<()> {
        graph.connect(from.block, from.port, dst, dst_port)?;
        self.edges.push((from, dst, dst_port));
        Ok(())
    }

    /// Undo every remembered edge. Keeps going past failures and returns the first one.
    ///
    /// Edges touching a block that was already released went away with the
    /// block and are skipped.
    pub fn disconnect_all(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        let mut result = Ok(());
        for (from, dst, dst_port) in self.edges.drain(..) {
            if graph.block_name(from.block).is_none() || graph.block_name(dst).is_none() {
                tracing::trace!("edge into {:?} already released", dst);
                continue;
            }
            if let Err(e) = graph.disconnect(from.block, from.port, dst, dst_port) {
                tracing::warn!("failed to undo edge: {}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Forget the edges without touching the graph (the graph was discarded)
    pub fn clear(&mut self) {
        self.edges.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
