//! Bounded capture sink

use dasp_graph::Buffer;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::block::{Block, ProcessContext};

/// A sink that captures the first `limit` samples of its input.
///
/// Samples go through an rtrb ring buffer, so the [`SinkReader`] can be read
/// from any thread while the graph runs. The sink is finite: once `limit`
/// samples were captured, a graph made only of finished finite blocks
/// completes.
pub struct VectorSink {
    producer: Producer<f32>,
    limit: usize,
    captured: usize,
}

/// Reading half of a [`VectorSink`]
pub struct SinkReader {
    consumer: Consumer<f32>,
}

impl VectorSink {
    pub fn new(limit: usize) -> (Self, SinkReader) {
        let (producer, consumer) = RingBuffer::new(limit.max(1));
        let sink = Self {
            producer,
            limit,
            captured: 0,
        };
        (sink, SinkReader { consumer })
    }

    #[inline]
    pub fn captured(&self) -> usize {
        self.captured
    }
}

impl Block for VectorSink {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Buffer],
        _outputs: &mut [Buffer],
    ) {
        let Some(input) = inputs.first() else {
            return;
        };

        for &sample in input.iter() {
            if self.captured >= self.limit || self.producer.push(sample).is_err() {
                break;
            }
            self.captured += 1;
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }

    fn is_finite(&self) -> bool {
        true
    }

    fn is_finished(&self) -> bool {
        self.captured >= self.limit
    }
}

impl SinkReader {
    /// Drain every sample captured so far
    pub fn data(&mut self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.consumer.slots());
        while let Ok(sample) = self.consumer.pop() {
            data.push(sample);
        }
        data
    }

    /// Number of samples waiting to be read
    #[inline]
    pub fn available(&self) -> usize {
        self.consumer.slots()
    }
}
