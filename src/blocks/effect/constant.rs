//! Constant arithmetic: multiply or add a fixed value

use dasp_graph::Buffer;

use crate::block::{Block, ProcessContext};

/// Messages to control the constant of a MultiplyConst or AddConst
#[derive(Clone, Copy, Debug)]
pub enum ConstMessage {
    SetConstant(f32),
}

fn apply(constant: &mut f32, messages: impl Iterator<Item = ConstMessage>) {
    for msg in messages {
        match msg {
            ConstMessage::SetConstant(k) => *constant = k,
        }
    }
}

/// Multiplies its input by a constant
pub struct MultiplyConst {
    k: f32,
}

impl MultiplyConst {
    pub fn new(k: f32) -> Self {
        Self { k }
    }

    #[inline]
    pub fn constant(&self) -> f32 {
        self.k
    }
}

impl Block for MultiplyConst {
    type Message = ConstMessage;

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        messages: impl Iterator<Item = ConstMessage>,
        inputs: &[Buffer],
        outputs: &mut [Buffer],
    ) {
        apply(&mut self.k, messages);

        let (Some(input), Some(output)) = (inputs.first(), outputs.first_mut()) else {
            return;
        };
        for (out, &inp) in output.iter_mut().zip(input.iter()) {
            *out = inp * self.k;
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }
}

/// Adds a constant to its input
pub struct AddConst {
    k: f32,
}

impl AddConst {
    pub fn new(k: f32) -> Self {
        Self { k }
    }

    #[inline]
    pub fn constant(&self) -> f32 {
        self.k
    }
}

impl Block for AddConst {
    type Message = ConstMessage;

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        messages: impl Iterator<Item = ConstMessage>,
        inputs: &[Buffer],
        outputs: &mut [Buffer],
    ) {
        apply(&mut self.k, messages);

        let (Some(input), Some(output)) = (inputs.first(), outputs.first_mut()) else {
            return;
        };
        for (out, &inp) in output.iter_mut().zip(input.iter()) {
            *out = inp + self.k;
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }
}
