//! Pass-through block

use dasp_graph::Buffer;

use crate::block::{Block, ProcessContext};

/// Copies its single input to its single output.
///
/// Used as a stable attachment point inside a signal path for data that is
/// produced elsewhere (e.g. a device channel).
#[derive(Default)]
pub struct Passthrough;

impl Passthrough {
    pub fn new() -> Self {
        Self
    }
}

impl Block for Passthrough {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Buffer],
        outputs: &mut [Buffer],
    ) {
        let Some(output) = outputs.first_mut() else {
            return;
        };
        match inputs.first() {
            Some(input) => output.copy_from_slice(input),
            None => output.iter_mut().for_each(|s| *s = 0.0),
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }
}
