//! One-shot player for a generated mono buffer

use dasp_graph::{Buffer, Input};

use crate::node::{AudioNode, ProcessContext};

/// Messages to control a buffer source
#[derive(Clone, Copy, Debug)]
pub enum BufferSourceMessage {
    /// Begin playback at this endpoint time
    Start(f64),
}

/// Plays a mono sample buffer once, then falls silent.
///
/// There is no stop, loop or seek: the source ends when the buffer runs out.
pub struct BufferSource {
    samples: Vec<f32>,
    position: usize,
    start: Option<f64>,
}

impl BufferSource {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            position: 0,
            start: None,
        }
    }

    /// True once every sample has been played
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }
}

impl AudioNode for BufferSource {
    type Message = BufferSourceMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = BufferSourceMessage>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                BufferSourceMessage::Start(t) => self.start = Some(t),
            }
        }

        if outputs.is_empty() {
            return;
        }

        let (first, rest) = outputs.split_at_mut(1);
        let first = &mut first[0];

        // Fast path: not started or already done
        let Some(start) = self.start.filter(|_| !self.is_exhausted()) else {
            first.iter_mut().for_each(|s| *s = 0.0);
            for buffer in rest.iter_mut() {
                buffer.copy_from_slice(first);
            }
            return;
        };

        for (i, out) in first.iter_mut().enumerate() {
            *out = match self.samples.get(self.position) {
                Some(&sample) if ctx.time_at(i) >= start => {
                    self.position += 1;
                    sample
                }
                _ => 0.0,
            };
        }

        for buffer in rest.iter_mut() {
            buffer.copy_from_slice(first);
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 0 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}
