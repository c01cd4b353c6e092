//! Gain/volume control effect

use dasp_graph::{Buffer, Input};

use crate::node::{AudioNode, ProcessContext};
use crate::param::{AudioParam, ParamEvent};

/// Messages to control gain
#[derive(Clone, Copy, Debug)]
pub enum GainMessage {
    /// Add an event to the gain timeline
    Schedule(ParamEvent),
}

/// A gain (volume) stage that scales its summed inputs by an automatable
/// multiplier.
///
/// Changes follow the param timeline exactly, sample by sample; envelopes are
/// expressed as ramps rather than smoothed jumps.
pub struct Gain {
    gain: AudioParam,
}

impl Gain {
    /// Create a new gain node with the specified resting gain
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AudioParam::new(gain),
        }
    }

    /// Schedule an event before the node is added to a graph
    pub fn with_event(mut self, event: ParamEvent) -> Self {
        self.gain.schedule(event);
        self
    }

    #[inline]
    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }
}

impl AudioNode for Gain {
    type Message = GainMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = GainMessage>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                GainMessage::Schedule(event) => self.gain.schedule(event),
            }
        }

        if outputs.is_empty() {
            return;
        }

        self.gain.forget_before(ctx.block_start());

        let out = &mut outputs[0];
        out.iter_mut().for_each(|s| *s = 0.0);

        // Inputs sum before the gain is applied
        for input in inputs {
            if let Some(in_buffer) = input.buffers().first() {
                for (out_sample, in_sample) in out.iter_mut().zip(in_buffer.iter()) {
                    *out_sample += *in_sample;
                }
            }
        }

        for (i, sample) in out.iter_mut().enumerate() {
            *sample *= self.gain.value_at(ctx.time_at(i));
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::testing::{Constant, Rig};
    use crate::param::SILENCE_FLOOR;

    #[test]
    fn silent_without_inputs() {
        let mut rig = Rig::new(48_000);
        let gain = rig.add(Gain::new(1.0));
        rig.to_sink(gain.id());
        assert!(rig.render(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn follows_scheduled_decay() {
        let mut rig = Rig::new(48_000);
        let source = rig.add(Constant(1.0));
        let mut gain = rig.add(Gain::new(1.0).with_event(ParamEvent::SetValueAtTime { value: 0.6, time: 0.0 }));
        rig.connect(source.id(), gain.id());
        rig.to_sink(gain.id());

        let decay = ParamEvent::ExponentialRampToValueAtTime { value: SILENCE_FLOOR, end_time: 0.05 };
        assert!(gain.send(GainMessage::Schedule(decay)).is_ok());

        // Unit input: the output is the gain curve itself
        let out = rig.render(40);
        assert_eq!(out[0], 0.6);
        assert!(out[..2400].windows(2).all(|w| w[1] < w[0]));
        assert!(out[2400..].iter().all(|&s| s == SILENCE_FLOOR));
    }

    #[test]
    fn sums_multiple_inputs() {
        let mut rig = Rig::new(48_000);
        let a = rig.add(Constant(0.25));
        let b = rig.add(Constant(0.5));
        let gain = rig.add(Gain::new(2.0));
        rig.connect(a.id(), gain.id());
        rig.connect(b.id(), gain.id());
        rig.to_sink(gain.id());
        assert!(rig.render(1).iter().all(|&s| s == 1.5));
    }
}
