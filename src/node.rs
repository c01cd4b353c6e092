//! Core node trait and context types.

use dasp_graph::{Buffer, Input};

/// Information available during audio processing.
///
/// Passed to every [`AudioNode::process`] call. Besides the sample rate and
/// buffer size it carries the absolute frame index of the block's first
/// sample, which is how nodes evaluate scheduled automation.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of samples per buffer (always 64, the `dasp_graph` block size)
    pub buffer_size: usize,
    /// Frames rendered before this block started
    pub frame: u64,
}

impl ProcessContext {
    /// Endpoint time in seconds of the `offset`-th sample of this block.
    #[inline]
    pub fn time_at(&self, offset: usize) -> f64 {
        (self.frame + offset as u64) as f64 / self.sample_rate as f64
    }

    /// Endpoint time in seconds at the start of this block.
    #[inline]
    pub fn block_start(&self) -> f64 {
        self.time_at(0)
    }

    /// Endpoint time in seconds just after the last sample of this block.
    #[inline]
    pub fn block_end(&self) -> f64 {
        self.time_at(self.buffer_size)
    }
}

/// Unique identifier for a node within a graph.
///
/// You typically don't interact with this directly - use [`Handle`](crate::Handle) instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

/// The core trait for audio processing nodes.
///
/// Nodes can be:
/// - **Sources**: generate audio (0 inputs) - oscillators, buffer players
/// - **Effects**: process audio (1+ inputs) - gain, filters, the destination mixer
/// - **Sinks**: consume audio (0 outputs) - device output, capture buffers
///
/// # Message-Based Parameters
///
/// Nodes never share mutable state with the thread that built them. Parameter
/// changes (including scheduled automation) arrive as messages, drained at the
/// start of each block:
///
/// ```
/// use blip::{AudioNode, ProcessContext};
/// use dasp_graph::{Buffer, Input};
///
/// enum DcMessage {
///     SetLevel(f32),
/// }
///
/// struct Dc {
///     level: f32,
/// }
///
/// impl AudioNode for Dc {
///     type Message = DcMessage;
///
///     fn process(
///         &mut self,
///         _ctx: &ProcessContext,
///         messages: impl Iterator<Item = DcMessage>,
///         _inputs: &[Input],
///         outputs: &mut [Buffer],
///     ) {
///         for msg in messages {
///             match msg {
///                 DcMessage::SetLevel(l) => self.level = l,
///             }
///         }
///         for sample in outputs[0].iter_mut() {
///             *sample = self.level;
///         }
///     }
/// }
/// ```
pub trait AudioNode: Send + 'static {
    /// Message type for parameter updates.
    ///
    /// Use a custom enum for nodes with parameters, or `()` for nodes without.
    type Message: Send + 'static;

    /// Process one block of audio.
    ///
    /// 1. Drain and handle all pending messages
    /// 2. Read from `inputs` (if any)
    /// 3. Write to `outputs`
    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = Self::Message>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    );

    /// Number of audio input channels (0 for sources).
    fn num_inputs(&self) -> usize { 0 }

    /// Number of audio output channels.
    fn num_outputs(&self) -> usize { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_times_follow_frame_counter() {
        let ctx = ProcessContext { sample_rate: 48_000, buffer_size: 64, frame: 480 };
        assert_eq!(ctx.block_start(), 0.01);
        assert_eq!(ctx.time_at(48), 528.0 / 48_000.0);
        assert_eq!(ctx.block_end(), 544.0 / 48_000.0);
    }
}
