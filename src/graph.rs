//! Default execution engine - owns blocks, edges and the scheduler thread
//!
//! Blocks live in a petgraph `StableGraph` of dasp_graph `NodeData`. Every
//! block with no outgoing edge is hooked to a hidden terminal node when the
//! graph starts, so a single `Processor` pass from the terminal pulls each
//! block exactly once per cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dasp_graph::{Buffer, Input, NodeData, Processor};
use hashbrown::HashMap;
use itertools::Itertools;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction::{Incoming, Outgoing};

use crate::block::{erase, Block, BlockId, BoxedBlock, ProcessContext};
use crate::config::GraphConfig;
use crate::controller::FlowState;
use crate::engine::{Engine, EngineGraph};
use crate::error::{GraphError, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Wire {
    Stream { src_port: usize, dst_port: usize },
    /// sink -> hidden terminal, never reported as an edge
    Terminal,
}

// Adapter between dasp_graph's whole-node inputs and our port-to-port edges
struct BlockSlot {
    block: BoxedBlock,
    ctx: ProcessContext,
    /// (src_port, dst_port) for each incoming edge, in dasp_graph's input order
    routes: Vec<Option<(usize, usize)>>,
    /// One buffer per input port
    scratch: Vec<Buffer>,
}

impl dasp_graph::Node for BlockSlot {
    fn process(&mut self, inputs: &[Input], outputs: &mut [Buffer]) {
        for buffer in self.scratch.iter_mut() {
            buffer.iter_mut().for_each(|s| *s = 0.0);
        }

        for (input, route) in inputs.iter().zip(self.routes.iter()) {
            let Some((src_port, dst_port)) = *route else {
                continue;
            };
            if let (Some(src), Some(dst)) = (input.buffers().get(src_port), self.scratch.get_mut(dst_port)) {
                dst.copy_from_slice(src);
            }
        }

        self.block.process_erased(&self.ctx, &self.scratch, outputs);
    }
}

/// Hidden sink-of-sinks the processor is driven from
struct Terminal;

impl Block for Terminal {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        _inputs: &[Buffer],
        _outputs: &mut [Buffer],
    ) {
    }

    fn num_outputs(&self) -> usize { 0 }
}

type InnerGraph = StableGraph<NodeData<BlockSlot>, Wire>;

struct Topology {
    graph: InnerGraph,
    terminal: NodeIndex,
    terminal_edges: Vec<EdgeIndex>,
}

impl Topology {
    fn new(ctx: ProcessContext) -> Self {
        let mut graph = InnerGraph::with_capacity(64, 64);
        let (block, _) = erase(Terminal, 1);
        let terminal = graph.add_node(NodeData::new(
            BlockSlot {
                block,
                ctx,
                routes: Vec::new(),
                scratch: Vec::new(),
            },
            vec![],
        ));
        Self {
            graph,
            terminal,
            terminal_edges: Vec::new(),
        }
    }

    /// Re-hook sinks to the terminal and refresh every block's input routes
    fn prepare(&mut self) {
        for edge in self.terminal_edges.drain(..) {
            self.graph.remove_edge(edge);
        }

        let terminal = self.terminal;
        let sinks: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| n != terminal && self.graph.neighbors_directed(n, Outgoing).next().is_none())
            .collect();
        for sink in sinks {
            let edge = self.graph.add_edge(sink, terminal, Wire::Terminal);
            self.terminal_edges.push(edge);
        }

        // dasp_graph collects inputs by walking the incoming edge list, so
        // walking the same list here yields matching positions
        let routes: Vec<(NodeIndex, Vec<Option<(usize, usize)>>)> = self
            .graph
            .node_indices()
            .map(|n| {
                let route = self
                    .graph
                    .edges_directed(n, Incoming)
                    .map(|e| match *e.weight() {
                        Wire::Stream { src_port, dst_port } => Some((src_port, dst_port)),
                        Wire::Terminal => None,
                    })
                    .collect();
                (n, route)
            })
            .collect();
        for (n, route) in routes {
            if let Some(data) = self.graph.node_weight_mut(n) {
                data.node.routes = route;
            }
        }
    }

    /// True once at least one finite block exists and all of them finished
    fn is_complete(&self) -> bool {
        let mut finite = self
            .graph
            .node_indices()
            .filter_map(|n| self.graph.node_weight(n))
            .filter(|data| data.node.block.is_finite())
            .peekable();
        finite.peek().is_some() && finite.all(|data| data.node.block.is_finished())
    }
}

struct BlockInfo {
    name: String,
    index: NodeIndex,
    num_inputs: usize,
    num_outputs: usize,
}

#[derive(Clone, Copy, Debug)]
struct EdgeRecord {
    src: BlockId,
    src_port: usize,
    dst: BlockId,
    dst_port: usize,
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Topology>,
}

/// A native graph run by a dedicated scheduler thread.
///
/// While running, the block storage is owned by the scheduler thread; edits
/// are rejected until [`stop`](EngineGraph::stop) or
/// [`wait`](EngineGraph::wait) hands it back.
pub struct FlowGraph {
    name: String,
    config: GraphConfig,
    ctx: ProcessContext,

    /// `None` while the scheduler thread owns it
    topology: Option<Topology>,
    worker: Option<Worker>,

    blocks: HashMap<BlockId, BlockInfo>,
    next_block_id: u32,
    /// Per-kind naming counters (`sig_source0`, `sig_source1`...)
    kind_counters: HashMap<String, u32>,

    /// Edges in the order they were connected
    edges: Vec<EdgeRecord>,
}

impl FlowGraph {
    pub fn new(name: impl Into<String>, config: GraphConfig) -> Self {
        let ctx = ProcessContext {
            sample_rate: config.sample_rate,
            buffer_size: 64, // dasp_graph buffer length
        };
        Self {
            name: name.into(),
            config,
            ctx,
            topology: Some(Topology::new(ctx)),
            worker: None,
            blocks: HashMap::new(),
            next_block_id: 0,
            kind_counters: HashMap::new(),
            edges: Vec::new(),
        }
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn topology_mut(&mut self, operation: &'static str) -> Result<&mut Topology> {
        if self.worker.is_some() {
            return Err(GraphError::invalid_state(operation, FlowState::Running));
        }
        // Only lost if the scheduler thread panicked
        self.topology.as_mut().ok_or(GraphError::SchedulerPanicked)
    }

    fn edge_label(&self, src: BlockId, src_port: usize, dst: BlockId, dst_port: usize) -> String {
        let name = |id: BlockId| {
            self.blocks
                .get(&id)
                .map(|b| b.name.clone())
                .unwrap_or_else(|| format!("block#{}", id.raw()))
        };
        format!("{}:{}->{}:{}", name(src), src_port, name(dst), dst_port)
    }

    fn join(&mut self, worker: Worker) -> Result<()> {
        match worker.handle.join() {
            Ok(topology) => {
                self.topology = Some(topology);
                Ok(())
            }
            Err(_) => {
                tracing::error!("scheduler thread of '{}' panicked", self.name);
                Err(GraphError::SchedulerPanicked)
            }
        }
    }
}

fn schedule(mut topology: Topology, stop: Arc<AtomicBool>, cycle_sleep_us: u64) -> Topology {
    let mut processor: Processor<InnerGraph> = Processor::with_capacity(topology.graph.node_count());
    let mut cycles: u64 = 0;

    while !stop.load(Ordering::Acquire) {
        processor.process(&mut topology.graph, topology.terminal);
        cycles += 1;

        if topology.is_complete() {
            tracing::debug!("graph completed after {} cycles", cycles);
            break;
        }

        if cycle_sleep_us > 0 {
            thread::sleep(Duration::from_micros(cycle_sleep_us));
        } else {
            thread::yield_now();
        }
    }

    topology
}

impl EngineGraph for FlowGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn message_queue_size(&self) -> usize {
        self.config.message_queue_size
    }

    fn add_block(&mut self, kind: &str, block: BoxedBlock) -> Result<BlockId> {
        let ctx = self.ctx;
        let num_inputs = block.num_inputs();
        let num_outputs = block.num_outputs();

        let slot = BlockSlot {
            block,
            ctx,
            routes: Vec::new(),
            scratch: (0..num_inputs).map(|_| Buffer::default()).collect(),
        };
        let buffers = (0..num_outputs).map(|_| Buffer::default()).collect();
        let index = self.topology_mut("add a block")?.graph.add_node(NodeData::new(slot, buffers));

        let counter = self.kind_counters.entry(kind.to_string()).or_insert(0);
        let name = format!("{}{}", kind, counter);
        *counter += 1;

        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;

        tracing::trace!("added block {} ({} in, {} out)", name, num_inputs, num_outputs);
        self.blocks.insert(
            id,
            BlockInfo {
                name,
                index,
                num_inputs,
                num_outputs,
            },
        );
        Ok(id)
    }

    fn remove_block(&mut self, id: BlockId) -> Result<()> {
        let index = self.blocks.get(&id).map(|b| b.index).ok_or(GraphError::UnknownBlock(id))?;
        self.topology_mut("remove a block")?.graph.remove_node(index);
        if let Some(info) = self.blocks.remove(&id) {
            tracing::trace!("removed block {}", info.name);
        }
        self.edges.retain(|e| e.src != id && e.dst != id);
        Ok(())
    }

    fn block_name(&self, id: BlockId) -> Option<String> {
        self.blocks.get(&id).map(|b| b.name.clone())
    }

    fn connect(&mut self, src: BlockId, src_port: usize, dst: BlockId, dst_port: usize) -> Result<()> {
        let label = self.edge_label(src, src_port, dst, dst_port);
        if self.worker.is_some() {
            return Err(GraphError::invalid_state("connect", FlowState::Running));
        }

        let src_info = self
            .blocks
            .get(&src)
            .ok_or_else(|| GraphError::connect_failure(&label, "unknown source block"))?;
        let dst_info = self
            .blocks
            .get(&dst)
            .ok_or_else(|| GraphError::connect_failure(&label, "unknown destination block"))?;

        if src == dst {
            return Err(GraphError::connect_failure(&label, "a block cannot feed itself"));
        }
        if src_port >= src_info.num_outputs {
            return Err(GraphError::connect_failure(
                &label,
                format!("source has {} output port(s)", src_info.num_outputs),
            ));
        }
        if dst_port >= dst_info.num_inputs {
            return Err(GraphError::connect_failure(
                &label,
                format!("destination has {} input port(s)", dst_info.num_inputs),
            ));
        }
        if self.edges.iter().any(|e| e.dst == dst && e.dst_port == dst_port) {
            return Err(GraphError::connect_failure(&label, "destination port is already connected"));
        }

        let (src_index, dst_index) = (src_info.index, dst_info.index);
        let topology = self.topology_mut("connect")?;
        if has_path_connecting(&topology.graph, dst_index, src_index, None) {
            return Err(GraphError::connect_failure(&label, "edge would close a feedback loop"));
        }
        topology
            .graph
            .add_edge(src_index, dst_index, Wire::Stream { src_port, dst_port });

        self.edges.push(EdgeRecord {
            src,
            src_port,
            dst,
            dst_port,
        });
        tracing::debug!("connected {}", label);
        Ok(())
    }

    fn disconnect(&mut self, src: BlockId, src_port: usize, dst: BlockId, dst_port: usize) -> Result<()> {
        let label = self.edge_label(src, src_port, dst, dst_port);
        let position = self
            .edges
            .iter()
            .position(|e| e.src == src && e.src_port == src_port && e.dst == dst && e.dst_port == dst_port)
            .ok_or_else(|| GraphError::connect_failure(&label, "no such edge"))?;

        let (src_index, dst_index) = match (self.blocks.get(&src), self.blocks.get(&dst)) {
            (Some(s), Some(d)) => (s.index, d.index),
            _ => return Err(GraphError::connect_failure(&label, "unknown block")),
        };

        let topology = self.topology_mut("disconnect")?;
        let wire = Wire::Stream { src_port, dst_port };
        let edge = topology
            .graph
            .edges_directed(dst_index, Incoming)
            .find(|e| e.source() == src_index && *e.weight() == wire)
            .map(|e| e.id());
        if let Some(edge) = edge {
            topology.graph.remove_edge(edge);
        }

        self.edges.remove(position);
        tracing::debug!("disconnected {}", label);
        Ok(())
    }

    fn disconnect_all(&mut self) -> Result<()> {
        let topology = self.topology_mut("disconnect all")?;
        let all: Vec<EdgeIndex> = topology
            .graph
            .node_indices()
            .flat_map(|n| topology.graph.edges_directed(n, Outgoing).map(|e| e.id()))
            .collect();
        for edge in all {
            topology.graph.remove_edge(edge);
        }
        topology.terminal_edges.clear();

        tracing::debug!("dropped {} edge(s) from '{}'", self.edges.len(), self.name);
        self.edges.clear();
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            tracing::trace!("graph '{}' already running", self.name);
            return Ok(());
        }

        let mut topology = self.topology.take().ok_or(GraphError::SchedulerPanicked)?;
        topology.prepare();

        let stop = Arc::new(AtomicBool::new(false));
        let cycle_sleep_us = self.config.cycle_sleep_us;
        let handle = thread::Builder::new()
            .name(format!("{}-scheduler", self.name))
            .spawn({
                let stop = stop.clone();
                move || schedule(topology, stop, cycle_sleep_us)
            })?;

        self.worker = Some(Worker { stop, handle });
        tracing::info!("graph '{}' started with {} block(s)", self.name, self.blocks.len());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker.stop.store(true, Ordering::Release);
        self.join(worker)?;
        tracing::info!("graph '{}' stopped", self.name);
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.join(worker)
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn edge_list(&self) -> String {
        if self.edges.is_empty() {
            return String::new();
        }
        let lines = self
            .edges
            .iter()
            .map(|e| self.edge_label(e.src, e.src_port, e.dst, e.dst_port))
            .join("\n");
        lines + "\n"
    }
}

impl Drop for FlowGraph {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::Release);
            let _ = worker.handle.join();
        }
    }
}

/// Engine that makes [`FlowGraph`]s from a shared [`GraphConfig`].
#[derive(Debug, Clone, Default)]
pub struct DaspEngine {
    config: GraphConfig,
    graphs_made: u64,
}

impl DaspEngine {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            graphs_made: 0,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// How many graphs this engine has allocated so far
    #[inline]
    pub fn graphs_made(&self) -> u64 {
        self.graphs_made
    }
}

impl Engine for DaspEngine {
    fn make_graph(&mut self, name: &str) -> Box<dyn EngineGraph> {
        self.graphs_made += 1;
        tracing::debug!("allocating engine graph '{}' (#{})", name, self.graphs_made);
        Box::new(FlowGraph::new(name, self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{AddConst, SigSource, VectorSink, Waveform};
    use crate::engine::EngineGraphExt;

    fn graph() -> FlowGraph {
        FlowGraph::new("test", GraphConfig::default().with_sample_rate(100))
    }

    #[test]
    fn names_blocks_per_kind() {
        let mut g = graph();
        let (a, _) = g.add("sig_source", SigSource::constant(1.0, 0.0)).unwrap();
        let (b, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();
        let (c, _) = g.add("sig_source", SigSource::constant(1.0, 0.0)).unwrap();
        assert_eq!(g.block_name(a).as_deref(), Some("sig_source0"));
        assert_eq!(g.block_name(b).as_deref(), Some("add_const_ff0"));
        assert_eq!(g.block_name(c).as_deref(), Some("sig_source1"));
    }

    #[test]
    fn edge_list_follows_connect_order() {
        let mut g = graph();
        let (src, _) = g.add("sig_source", SigSource::constant(1.0, 0.0)).unwrap();
        let (add, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();
        let (sink, _reader) = VectorSink::new(8);
        let (sink, _) = g.add("vector_sink", sink).unwrap();

        g.connect(add, 0, sink, 0).unwrap();
        g.connect(src, 0, add, 0).unwrap();
        assert_eq!(
            g.edge_list(),
            "add_const_ff0:0->vector_sink0:0\nsig_source0:0->add_const_ff0:0\n"
        );
    }

    #[test]
    fn rejects_bad_ports_and_double_inputs() {
        let mut g = graph();
        let (a, _) = g.add("sig_source", SigSource::constant(1.0, 0.0)).unwrap();
        let (b, _) = g.add("sig_source", SigSource::constant(1.0, 0.0)).unwrap();
        let (add, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();

        assert!(matches!(g.connect(a, 1, add, 0), Err(GraphError::ConnectFailure { .. })));
        assert!(matches!(g.connect(a, 0, add, 1), Err(GraphError::ConnectFailure { .. })));
        assert!(matches!(g.connect(add, 0, a, 0), Err(GraphError::ConnectFailure { .. })));
        g.connect(a, 0, add, 0).unwrap();
        assert!(matches!(g.connect(b, 0, add, 0), Err(GraphError::ConnectFailure { .. })));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn rejects_feedback_loops() {
        let mut g = graph();
        let (a, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();
        let (b, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();
        g.connect(a, 0, b, 0).unwrap();
        let err = g.connect(b, 0, a, 0).unwrap_err();
        assert!(matches!(err, GraphError::ConnectFailure { .. }));
    }

    #[test]
    fn removing_a_block_drops_its_edges() {
        let mut g = graph();
        let (src, _) = g.add("sig_source", SigSource::constant(1.0, 0.0)).unwrap();
        let (add, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();
        g.connect(src, 0, add, 0).unwrap();

        g.remove_block(add).unwrap();
        assert_eq!(g.edge_list(), "");
        assert_eq!(g.block_count(), 1);
        assert!(matches!(g.remove_block(add), Err(GraphError::UnknownBlock(_))));
    }

    #[test]
    fn disconnect_removes_a_single_edge() {
        let mut g = graph();
        let (src, _) = g.add("sig_source", SigSource::constant(1.0, 0.0)).unwrap();
        let (a, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();
        let (b, _) = g.add("add_const_ff", AddConst::new(2.0)).unwrap();
        g.connect(src, 0, a, 0).unwrap();
        g.connect(src, 0, b, 0).unwrap();

        g.disconnect(src, 0, a, 0).unwrap();
        assert_eq!(g.edge_list(), "sig_source0:0->add_const_ff1:0\n");
        assert!(g.disconnect(src, 0, a, 0).is_err());
    }

    #[test]
    fn runs_until_finite_sinks_finish() {
        let mut g = graph();
        let (src, _) = g.add("sig_source", SigSource::new(Waveform::Constant, 100.0, 10.0, 2.0, 0.5)).unwrap();
        let (add, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();
        let (sink, mut reader) = VectorSink::new(100);
        let (sink, _) = g.add("vector_sink", sink).unwrap();
        g.connect(src, 0, add, 0).unwrap();
        g.connect(add, 0, sink, 0).unwrap();

        g.start().unwrap();
        assert!(g.is_running());
        assert!(matches!(
            g.connect(src, 0, sink, 0),
            Err(GraphError::InvalidStateTransition { .. })
        ));
        g.wait().unwrap();
        assert!(!g.is_running());

        let data = reader.data();
        assert_eq!(data.len(), 100);
        assert!(data.iter().all(|&s| s == 3.5));
    }

    #[test]
    fn stop_returns_an_endless_graph() {
        let mut g = graph();
        let (src, _) = g.add("sig_source", SigSource::constant(1.0, 0.0)).unwrap();
        let (add, _) = g.add("add_const_ff", AddConst::new(1.0)).unwrap();
        g.connect(src, 0, add, 0).unwrap();

        g.start().unwrap();
        g.stop().unwrap();
        assert!(!g.is_running());
        // storage is back, so edits work again
        g.disconnect_all().unwrap();
        assert_eq!(g.edge_count(), 0);
    }
}
