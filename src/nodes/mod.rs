//! Built-in audio nodes.
//!
//! Nodes are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! Generate audio with no audio inputs:
//! - [`Oscillator`] - Periodic waveform with scheduled frequency and start/stop
//! - [`BufferSource`] - One-shot playback of a generated sample buffer
//!
//! ## Effects ([`effect`])
//!
//! Process audio (inputs → outputs):
//! - [`Gain`] - Automatable volume stage
//! - [`LowPass`] - Biquad low-pass filter
//! - [`Destination`] - Sums every sound into the endpoint's output
//!
//! ## Sinks ([`sink`])
//!
//! Consume audio with no audio outputs:
//! - [`CpalSink`] - Output to the system audio device (requires `cpal_sink` feature)
//! - [`CaptureSink`] - Write to a ring buffer (offline rendering)
//!
//! # Message Types
//!
//! - [`OscillatorMessage`] - Frequency automation, start and stop
//! - [`BufferSourceMessage`] - Start time
//! - [`GainMessage`] - Gain automation
//! - [`LowPassMessage`] - Cutoff and resonance
//!
//! Nodes without parameters (like [`Destination`]) use `()` as their message type.

pub mod source;
pub mod effect;
pub mod sink;

// Re-export common types at the top level for convenience
pub use source::{BufferSource, BufferSourceMessage, Oscillator, OscillatorMessage, Waveform};
pub use effect::{Destination, Gain, GainMessage, LowPass, LowPassMessage};
pub use sink::CaptureSink;

#[cfg(feature = "cpal_sink")]
pub use sink::{CpalSink, StreamCommand, StreamControl};
