//! Turn recipes into running signal graphs.
//!
//! - [`GainStage`] - a destination-connected gain scaled by master volume
//! - [`ToneSynthesizer`] - oscillator voices with pitch and amplitude envelopes
//! - [`NoiseSynthesizer`] - filtered white-noise bursts
//!
//! Every synthesizer schedules exactly one [`SignalGraphInstance`] per call
//! and returns immediately; timing lives entirely in the scheduled automation.
//!
//! [`SignalGraphInstance`]: crate::SignalGraphInstance

mod gain_stage;
mod noise;
mod tone;

pub use gain_stage::{GainNode, GainStage};
pub use noise::{noise_buffer_len, white_noise, NoiseSynthesizer};
pub use tone::ToneSynthesizer;

use crate::graph::Handle;

/// Queue a message for a node that was just added.
///
/// Fresh queues hold far more than any recipe sends, so a full queue means
/// something is badly wrong; the event is dropped and logged.
fn post<M: Send + 'static>(handle: &mut Handle<M>, msg: M) {
    if handle.send(msg).is_err() {
        tracing::warn!(node = ?handle.id(), "node message queue full, event dropped");
    }
}
