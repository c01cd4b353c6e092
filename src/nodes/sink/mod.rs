//! Audio sink nodes (consumers with no audio outputs)

mod capture_sink;
#[cfg(feature = "cpal_sink")]
mod cpal_sink;

pub use capture_sink::CaptureSink;
#[cfg(feature = "cpal_sink")]
pub use cpal_sink::{CpalSink, StreamCommand, StreamControl};
