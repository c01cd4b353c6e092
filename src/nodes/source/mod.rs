//! Audio source nodes (generators with no audio inputs)

mod oscillator;
mod buffer_source;

pub use oscillator::{Oscillator, OscillatorMessage, Waveform, DEFAULT_FREQUENCY};
pub use buffer_source::{BufferSource, BufferSourceMessage};
