//! Execution engine contract.
//!
//! The controller never schedules samples itself. It asks an [`Engine`] for a
//! fresh [`EngineGraph`] on every build, lets stages allocate and wire blocks
//! in it, and drives its start/stop/wait lifecycle. [`DaspEngine`] is the
//! default implementation; tests substitute recording mocks.
//!
//! [`DaspEngine`]: crate::DaspEngine

use rtrb::Producer;

use crate::block::{erase, Block, BlockId, BoxedBlock};
use crate::error::Result;

/// Factory for engine graphs.
pub trait Engine: 'static {
    /// Allocate a new, empty graph
    fn make_graph(&mut self, name: &str) -> Box<dyn EngineGraph>;
}

/// One native graph: blocks, directed port-to-port edges and a runtime.
pub trait EngineGraph {
    fn name(&self) -> &str;

    /// Capacity used for the parameter queue of blocks added with [`EngineGraphExt::add`]
    fn message_queue_size(&self) -> usize;

    /// Register a block. `kind` is the naming prefix (`sig_source`, `copy`...).
    fn add_block(&mut self, kind: &str, block: BoxedBlock) -> Result<BlockId>;

    /// Release a block and every edge touching it
    fn remove_block(&mut self, id: BlockId) -> Result<()>;

    /// Diagnostic name of a block, e.g. `multiply_const_ff0`
    fn block_name(&self, id: BlockId) -> Option<String>;

    fn connect(&mut self, src: BlockId, src_port: usize, dst: BlockId, dst_port: usize) -> Result<()>;

    fn disconnect(&mut self, src: BlockId, src_port: usize, dst: BlockId, dst_port: usize) -> Result<()>;

    /// Drop every edge, keeping the blocks
    fn disconnect_all(&mut self) -> Result<()>;

    /// Begin scheduling on the engine's own thread(s)
    fn start(&mut self) -> Result<()>;

    /// Request a stop and block until scheduling has quiesced
    fn stop(&mut self) -> Result<()>;

    /// Block until the graph completes on its own
    fn wait(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    /// Edges as `src:port->dst:port` lines, in the order they were connected
    fn edge_list(&self) -> String;
}

/// Typed helpers on top of [`EngineGraph`].
pub trait EngineGraphExt {
    /// Add a block and return its id and the sender for its parameter messages
    fn add<B: Block>(&mut self, kind: &str, block: B) -> Result<(BlockId, Producer<B::Message>)>;
}

impl<G: EngineGraph + ?Sized> EngineGraphExt for G {
    fn add<B: Block>(&mut self, kind: &str, block: B) -> Result<(BlockId, Producer<B::Message>)> {
        let (boxed, sender) = erase(block, self.message_queue_size());
        Ok((self.add_block(kind, boxed)?, sender))
    }
}

/// Name a block for logs, falling back to its raw id.
pub(crate) fn describe(graph: &dyn EngineGraph, id: BlockId) -> String {
    graph
        .block_name(id)
        .unwrap_or_else(|| format!("block#{}", id.raw()))
}
