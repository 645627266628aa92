//! Scale and offset stage

use std::any::Any;

use rtrb::Producer;

use crate::block::{send_message, BlockId};
use crate::blocks::{AddConst, ConstMessage, MultiplyConst};
use crate::engine::{EngineGraph, EngineGraphExt};
use crate::error::{GraphError, Result};
use crate::node::{Endpoint, ProcessingNode, Wiring};

/// Transform stage computing `input * scale + offset`.
///
/// Built as two blocks, `multiply_const_ff` then `add_const_ff`, wired
/// `previous -> multiply -> add`; the add block is the stage's output.
pub struct ScaleOffset {
    name: String,
    scale: f32,
    offset: f32,

    multiply: Option<BlockId>,
    multiply_tx: Option<Producer<ConstMessage>>,
    add: Option<BlockId>,
    add_tx: Option<Producer<ConstMessage>>,
    wiring: Wiring,
}

impl ScaleOffset {
    /// Identity transform (scale 1, offset 0)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: 1.0,
            offset: 0.0,
            multiply: None,
            multiply_tx: None,
            add: None,
            add_tx: None,
            wiring: Wiring::new(),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        send_message(&mut self.multiply_tx, ConstMessage::SetConstant(scale), &self.name);
    }

    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
        send_message(&mut self.add_tx, ConstMessage::SetConstant(offset), &self.name);
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }
}

impl ProcessingNode for ScaleOffset {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        if self.multiply.is_some() || self.add.is_some() {
            return Err(GraphError::AlreadyBuilt(self.name.clone()));
        }
        // Stored one at a time so a half-built stage can still be destroyed
        let (multiply, multiply_tx) = graph.add("multiply_const_ff", MultiplyConst::new(self.scale))?;
        self.multiply = Some(multiply);
        self.multiply_tx = Some(multiply_tx);

        let (add, add_tx) = graph.add("add_const_ff", AddConst::new(self.offset))?;
        self.add = Some(add);
        self.add_tx = Some(add_tx);
        Ok(())
    }

    fn connect(&mut self, graph: &mut dyn EngineGraph, previous: Option<Endpoint>) -> Result<Endpoint> {
        let previous = previous.ok_or_else(|| GraphError::MissingInput(self.name.clone()))?;
        let (Some(multiply), Some(add)) = (self.multiply, self.add) else {
            return Err(GraphError::NoEndpoint(self.name.clone()));
        };

        self.wiring.connect(graph, previous, multiply, 0)?;
        self.wiring.connect(graph, Endpoint::new(multiply, 0), add, 0)?;
        Ok(Endpoint::new(add, 0))
    }

    fn disconnect(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        self.wiring.disconnect_all(graph)
    }

    fn destroy(&mut self, graph: &mut dyn EngineGraph) -> Result<()> {
        self.multiply_tx = None;
        self.add_tx = None;
        self.wiring.clear();

        let mut result = Ok(());
        for block in [self.multiply.take(), self.add.take()].into_iter().flatten() {
            if let Err(e) = graph.remove_block(block) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn is_built(&self) -> bool {
        self.multiply.is_some() || self.add.is_some()
    }

    fn endpoint(&self) -> Option<Endpoint> {
        self.add.map(|add| Endpoint::new(add, 0))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
