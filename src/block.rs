//! Native block trait and context types.
//!
//! Blocks are the engine-side units that actually move samples. Processing
//! stages allocate them while a graph is being built and wire them together
//! through the engine; once the graph runs, blocks live on the scheduler
//! thread and only receive parameter changes through their message queue.

use dasp_graph::Buffer;
use rtrb::{Consumer, Producer, RingBuffer};

/// Information available during block processing.
///
/// Passed to every [`Block::process`] call.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Default sample rate of the graph in Hz
    pub sample_rate: u32,
    /// Number of samples per buffer (always 64 with dasp_graph)
    pub buffer_size: usize,
}

/// Identifier for a block within one engine graph.
///
/// Ids are never reused inside a graph, so a stale id fails loudly instead
/// of aliasing a newer block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    /// Build an id from a raw index. Useful for custom engine implementations.
    pub fn from_raw(raw: u32) -> Self {
        BlockId(raw)
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// The core trait for native processing blocks.
///
/// Blocks have numbered input and output ports. Each cycle the engine hands
/// the block one buffer per input port (silence for unconnected ports) and
/// one buffer per output port to fill.
///
/// ```
/// use flowpath::{Block, ProcessContext};
/// use dasp_graph::Buffer;
///
/// struct Invert;
///
/// impl Block for Invert {
///     type Message = ();
///
///     fn process(
///         &mut self,
///         _ctx: &ProcessContext,
///         _messages: impl Iterator<Item = ()>,
///         inputs: &[Buffer],
///         outputs: &mut [Buffer],
///     ) {
///         for (out, inp) in outputs[0].iter_mut().zip(inputs[0].iter()) {
///             *out = -*inp;
///         }
///     }
///
///     fn num_inputs(&self) -> usize { 1 }
/// }
/// ```
pub trait Block: Send + 'static {
    /// Message type for parameter updates (use `()` if none needed)
    type Message: Send + 'static;

    /// Process one buffer worth of samples.
    ///
    /// 1. Drain and handle all pending messages
    /// 2. Read from inputs, write to outputs
    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = Self::Message>,
        inputs: &[Buffer],
        outputs: &mut [Buffer],
    );

    /// Number of input ports (0 for sources)
    fn num_inputs(&self) -> usize { 0 }

    /// Number of output ports (0 for sinks)
    fn num_outputs(&self) -> usize { 1 }

    /// Whether this block stops producing/consuming on its own.
    ///
    /// A graph whose finite blocks have all finished completes naturally.
    fn is_finite(&self) -> bool { false }

    /// Whether a finite block is done
    fn is_finished(&self) -> bool { false }
}

/// Object-safe view of a [`Block`] together with its message queue.
///
/// Engines store blocks as [`BoxedBlock`]s; see [`erase`].
pub trait ErasedBlock: Send {
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &[Buffer], outputs: &mut [Buffer]);
    fn num_inputs(&self) -> usize;
    fn num_outputs(&self) -> usize;
    fn is_finite(&self) -> bool;
    fn is_finished(&self) -> bool;
}

pub type BoxedBlock = Box<dyn ErasedBlock>;

struct BlockWrapper<B: Block> {
    block: B,
    receiver: Consumer<B::Message>,
}

impl<B: Block> ErasedBlock for BlockWrapper<B> {
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &[Buffer], outputs: &mut [Buffer]) {
        // Split borrow to avoid conflict between receiver and block
        let receiver = &mut self.receiver;
        let block = &mut self.block;

        let messages = core::iter::from_fn(|| receiver.pop().ok());
        block.process(ctx, messages, inputs, outputs);
    }

    #[inline]
    fn num_inputs(&self) -> usize {
        self.block.num_inputs()
    }

    #[inline]
    fn num_outputs(&self) -> usize {
        self.block.num_outputs()
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.block.is_finite()
    }

    #[inline]
    fn is_finished(&self) -> bool {
        self.block.is_finished()
    }
}

/// Erase a block's type, returning the boxed block and the sending half of
/// its parameter queue.
pub fn erase<B: Block>(block: B, queue_size: usize) -> (BoxedBlock, Producer<B::Message>) {
    let (producer, consumer) = RingBuffer::new(queue_size.max(1));
    let wrapper = BlockWrapper {
        block,
        receiver: consumer,
    };
    (Box::new(wrapper), producer)
}

/// Push a parameter message to a built block, warning if its queue is full.
pub(crate) fn send_message<M: Send + 'static>(sender: &mut Option<Producer<M>>, msg: M, block: &str) {
    if let Some(sender) = sender.as_mut() {
        if sender.push(msg).is_err() {
            tracing::warn!("parameter queue of {} is full; update dropped", block);
        }
    }
}
