//! Recording engine for lifecycle tests

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use flowpath::{BlockId, BoxedBlock, Engine, EngineGraph, GraphError, Result};

/// One call into the engine, with block names resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    MakeGraph(String),
    AddBlock(String),
    RemoveBlock(String),
    Connect(String),
    Disconnect(String),
    DisconnectAll,
    Start,
    Stop,
    Wait,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Engine whose graphs only record what they are asked to do
pub struct MockEngine {
    log: CallLog,
    fail_connects: Rc<Cell<bool>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            fail_connects: Rc::new(Cell::new(false)),
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// While set, every connect fails with a `ConnectFailure`
    pub fn connect_switch(&self) -> Rc<Cell<bool>> {
        self.fail_connects.clone()
    }
}

impl Engine for MockEngine {
    fn make_graph(&mut self, name: &str) -> Box<dyn EngineGraph> {
        self.log.borrow_mut().push(Call::MakeGraph(name.to_string()));
        Box::new(MockGraph {
            name: name.to_string(),
            log: self.log.clone(),
            fail_connects: self.fail_connects.clone(),
            blocks: Vec::new(),
            counters: Vec::new(),
            edges: Vec::new(),
            next_id: 0,
            running: false,
        })
    }
}

struct MockBlock {
    id: BlockId,
    name: String,
}

pub struct MockGraph {
    name: String,
    log: CallLog,
    fail_connects: Rc<Cell<bool>>,
    blocks: Vec<MockBlock>,
    counters: Vec<(String, u32)>,
    edges: Vec<(BlockId, usize, BlockId, usize)>,
    next_id: u32,
    running: bool,
}

impl MockGraph {
    fn label(&self, src: BlockId, src_port: usize, dst: BlockId, dst_port: usize) -> String {
        let name = |id| self.block_name(id).unwrap_or_else(|| "?".to_string());
        format!("{}:{}->{}:{}", name(src), src_port, name(dst), dst_port)
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl EngineGraph for MockGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn message_queue_size(&self) -> usize {
        8
    }

    fn add_block(&mut self, kind: &str, _block: BoxedBlock) -> Result<BlockId> {
        let n = match self.counters.iter_mut().find(|(k, _)| k == kind) {
            Some((_, n)) => {
                *n += 1;
                *n
            }
            None => {
                self.counters.push((kind.to_string(), 0));
                0
            }
        };
        let name = format!("{}{}", kind, n);
        let id = BlockId::from_raw(self.next_id);
        self.next_id += 1;
        self.record(Call::AddBlock(name.clone()));
        self.blocks.push(MockBlock { id, name });
        Ok(id)
    }

    fn remove_block(&mut self, id: BlockId) -> Result<()> {
        let index = self
            .blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or(GraphError::UnknownBlock(id))?;
        let block = self.blocks.remove(index);
        self.edges.retain(|e| e.0 != id && e.2 != id);
        self.record(Call::RemoveBlock(block.name));
        Ok(())
    }

    fn block_name(&self, id: BlockId) -> Option<String> {
        self.blocks.iter().find(|b| b.id == id).map(|b| b.name.clone())
    }

    fn connect(&mut self, src: BlockId, src_port: usize, dst: BlockId, dst_port: usize) -> Result<()> {
        let label = self.label(src, src_port, dst, dst_port);
        if self.fail_connects.get() {
            return Err(GraphError::ConnectFailure {
                edge: label,
                reason: "rejected by mock".to_string(),
            });
        }
        self.record(Call::Connect(label));
        self.edges.push((src, src_port, dst, dst_port));
        Ok(())
    }

    fn disconnect(&mut self, src: BlockId, src_port: usize, dst: BlockId, dst_port: usize) -> Result<()> {
        let label = self.label(src, src_port, dst, dst_port);
        self.edges.retain(|&e| e != (src, src_port, dst, dst_port));
        self.record(Call::Disconnect(label));
        Ok(())
    }

    fn disconnect_all(&mut self) -> Result<()> {
        self.edges.clear();
        self.record(Call::DisconnectAll);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.running = true;
        self.record(Call::Start);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running = false;
        self.record(Call::Stop);
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        self.running = false;
        self.record(Call::Wait);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn edge_list(&self) -> String {
        self.edges
            .iter()
            .map(|&(s, sp, d, dp)| format!("{}\n", self.label(s, sp, d, dp)))
            .collect()
    }
}

/// Only the calls that change the lifecycle, in order
pub fn lifecycle(log: &CallLog) -> Vec<Call> {
    log.borrow()
        .iter()
        .filter(|c| matches!(c, Call::MakeGraph(_) | Call::DisconnectAll | Call::Start | Call::Stop | Call::Wait))
        .cloned()
        .collect()
}

pub fn connects(log: &CallLog) -> Vec<String> {
    log.borrow()
        .iter()
        .filter_map(|c| match c {
            Call::Connect(label) => Some(label.clone()),
            _ => None,
        })
        .collect()
}
