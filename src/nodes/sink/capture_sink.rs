//! Ring buffer sink for offline rendering

use dasp_graph::{Buffer, Input};
use rtrb::Producer;

use crate::node::{AudioNode, ProcessContext};

/// A sink that pushes mono audio into an rtrb ring buffer.
///
/// The offline endpoint terminates its graph with one of these and drains the
/// consumer after every block, which makes rendered output inspectable without
/// an audio device.
pub struct CaptureSink {
    producer: Producer<f32>,
    /// Blocks skipped because nobody drained the buffer in time
    dropped: usize,
}

impl CaptureSink {
    pub fn new(producer: Producer<f32>) -> Self {
        Self { producer, dropped: 0 }
    }
}

impl AudioNode for CaptureSink {
    type Message = (); // No control messages

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Input],
        _outputs: &mut [Buffer],
    ) {
        let Some(buffer) = inputs.first().and_then(|input| input.buffers().first()) else {
            return;
        };

        // Skip the whole block rather than partially write it
        if self.producer.slots() < buffer.len() {
            self.dropped += 1;
            tracing::warn!(dropped = self.dropped, "capture buffer full, block dropped");
            return;
        }

        for &sample in buffer.iter() {
            let _ = self.producer.push(sample);
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}
