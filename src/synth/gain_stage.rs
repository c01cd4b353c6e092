//! Per-voice output gain

use crate::endpoint::GraphBuilder;
use crate::graph::Handle;
use crate::node::NodeId;
use crate::nodes::{Gain, GainMessage};
use crate::param::ParamEvent;

use super::post;

/// Builds gain nodes scaled by the master volume captured at construction.
#[derive(Clone, Copy, Debug)]
pub struct GainStage {
    master_volume: f32,
}

impl GainStage {
    pub fn new(master_volume: f32) -> Self {
        Self { master_volume }
    }

    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Add a gain node set to `peak_gain × master volume` at the current
    /// endpoint time and route it into the destination.
    ///
    /// The product is not clamped.
    pub fn build(&self, builder: &mut GraphBuilder<'_>, peak_gain: f32) -> GainNode {
        let initial_gain = peak_gain * self.master_volume;
        let gain = Gain::new(initial_gain).with_event(ParamEvent::SetValueAtTime {
            value: initial_gain,
            time: builder.now(),
        });

        let handle = builder.add(gain);
        builder.connect_to_destination(handle.id());

        GainNode { handle, initial_gain }
    }
}

/// A gain node built by a [`GainStage`], open for further automation.
pub struct GainNode {
    handle: Handle<GainMessage>,
    initial_gain: f32,
}

impl GainNode {
    #[inline]
    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    /// The gain it was created with, master volume included
    #[inline]
    pub fn initial_gain(&self) -> f32 {
        self.initial_gain
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.schedule(ParamEvent::SetValueAtTime { value, time });
    }

    pub fn exponential_ramp_to(&mut self, value: f32, end_time: f64) {
        self.schedule(ParamEvent::ExponentialRampToValueAtTime { value, end_time });
    }

    pub fn linear_ramp_to(&mut self, value: f32, end_time: f64) {
        self.schedule(ParamEvent::LinearRampToValueAtTime { value, end_time });
    }

    fn schedule(&mut self, event: ParamEvent) {
        post(&mut self.handle, GainMessage::Schedule(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::endpoint::AudioEndpoint;
    use crate::nodes::testing::Constant;

    fn unit_level_through(master_volume: f32) -> (f32, Vec<f32>) {
        let endpoint = AudioEndpoint::offline(&EngineConfig::default().with_start_suspended(false));
        let mut initial = 0.0;
        endpoint.schedule(1.0, |builder| {
            let source = builder.add(Constant(1.0));
            let gain = GainStage::new(master_volume).build(builder, 1.0);
            builder.connect(source.id(), gain.id());
            initial = gain.initial_gain();
        });
        (initial, endpoint.render(64).unwrap())
    }

    #[test]
    fn master_volume_scales_linearly() {
        let (full, full_out) = unit_level_through(1.0);
        let (half, half_out) = unit_level_through(0.5);

        assert_eq!(full, 1.0);
        assert_eq!(half, 0.5 * full);
        for (f, h) in full_out.iter().zip(&half_out) {
            assert!((h - 0.5 * f).abs() < 1e-6);
        }
    }

    #[test]
    fn gain_is_not_clamped() {
        let (initial, out) = unit_level_through(1.0);
        assert_eq!(initial, 1.0);
        assert!(out.iter().all(|&s| (s - 1.0).abs() < 1e-6));

        let endpoint = AudioEndpoint::offline(&EngineConfig::default().with_start_suspended(false));
        endpoint.schedule(1.0, |builder| {
            let gain = GainStage::new(0.8).build(builder, 1.2);
            assert!((gain.initial_gain() - 0.96).abs() < 1e-6);
            let gain = GainStage::new(1.0).build(builder, 1.2);
            assert_eq!(gain.initial_gain(), 1.2);
        });
    }

    #[test]
    fn linear_ramp_automation_reaches_target() {
        let endpoint = AudioEndpoint::offline(&EngineConfig::default().with_start_suspended(false));
        endpoint.schedule(1.0, |builder| {
            let source = builder.add(Constant(1.0));
            let mut gain = GainStage::new(1.0).build(builder, 1.0);
            gain.linear_ramp_to(0.0, 64.0 / 48_000.0);
            builder.connect(source.id(), gain.id());
        });

        let out = endpoint.render(128).unwrap();
        assert!((out[32] - 0.5).abs() < 1e-3);
        assert!(out[64..].iter().all(|&s| s.abs() < 1e-6));
    }
}
