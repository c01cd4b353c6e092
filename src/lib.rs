//! blip - procedural UI sound effects
//!
//! Short feedback sounds (click, shutter, grid entry, success chime, navigation
//! blip) synthesized on the fly from oscillators and white noise. There are no
//! audio assets.
//!
//! Design principles:
//! - One process-wide output graph, created on the first sound
//! - Nodes receive parameters via message ring buffers, not shared state
//! - All timing is sample-accurate automation on the endpoint clock
//! - Every sound disposes of itself once its lifetime has passed
//! - No output device is not an error; sound just goes quiet
//!
//! ```no_run
//! blip::configure(blip::EngineConfig::default().with_master_volume(0.6));
//! blip::play_click();
//! blip::play_success();
//! ```
//!
//! For rendering without a device, build an offline [`SoundEngine`]:
//!
//! ```
//! use blip::{EngineConfig, SoundEngine};
//!
//! let engine = SoundEngine::offline(EngineConfig::default().with_start_suspended(false));
//! let click = engine.trigger("click").unwrap();
//!
//! let endpoint = engine.device().endpoint().unwrap();
//! let samples = endpoint.render(4800).unwrap();
//! assert!(samples.iter().any(|s| s.abs() > 0.1));
//! assert!(!endpoint.is_alive(&click));
//! ```

mod node;
mod graph;
mod param;
mod endpoint;
mod device;
mod config;
mod error;
mod catalog;
mod engine;
pub mod nodes;
pub mod synth;

pub use node::{AudioNode, ProcessContext, NodeId};
pub use graph::Handle;
pub use param::{AudioParam, ParamEvent, SILENCE_FLOOR};
pub use endpoint::{AudioEndpoint, EndpointState, GraphBuilder, SignalGraphInstance};
#[cfg(feature = "cpal_sink")]
pub use device::CpalDevice;
pub use device::DeviceContext;
pub use config::{EngineConfig, DEFAULT_MASTER_VOLUME, DEFAULT_SAMPLE_RATE, MAX_RENDER_LEAD};
pub use error::AudioError;
pub use catalog::{RecipeKind, SoundCatalog, SoundName, SoundRecipe, Voice};
pub use engine::{
    configure, engine, play, play_click, play_enter_grid, play_nav, play_shutter, play_success, set_master_volume,
    SoundEngine,
};
pub use nodes::{Gain, Waveform};
