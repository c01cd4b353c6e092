//! Audio effect nodes (processors with audio inputs and outputs)

mod destination;
mod gain;
mod lowpass;

pub use destination::Destination;
pub use gain::{Gain, GainMessage};
pub use lowpass::{LowPass, LowPassMessage, DEFAULT_RESONANCE_DB};
