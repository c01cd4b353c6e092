//! Destination - the final summing point every sound connects to

use dasp_graph::{Buffer, Input};
use crate::node::{AudioNode, ProcessContext};

/// Sums every connected input into one mono channel.
///
/// Each endpoint owns exactly one destination, wired to its sink. Inputs with
/// more than one channel contribute their first channel only. Nothing is
/// normalized or limited here; loud sums clip further down the line.
pub struct Destination;

impl Destination {
    pub fn new() -> Self {
        Destination
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for Destination {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = Self::Message>,
        inputs: &[Input],
        output: &mut [Buffer],
    ) {
        let Some(out_buf) = output.first_mut() else {
            return;
        };
        out_buf.iter_mut().for_each(|s| *s = 0.0);

        for input in inputs {
            if let Some(in_buf) = input.buffers().first() {
                for (out_sample, in_sample) in out_buf.iter_mut().zip(in_buf.iter()) {
                    *out_sample += *in_sample;
                }
            }
        }
    }

    fn num_inputs(&self) -> usize {
        // Accept any number of inputs
        usize::MAX
    }

    fn num_outputs(&self) -> usize {
        1
    }
}
