//! Engine configuration.

use std::time::Duration;

/// Master volume used when none is configured.
pub const DEFAULT_MASTER_VOLUME: f32 = 0.8;

/// Sample rate for offline endpoints. Device endpoints use the device's rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Longest render lead accepted. The device ring holds at least 100 ms.
pub const MAX_RENDER_LEAD: Duration = Duration::from_millis(80);

/// Settings read once, when the endpoint is first created.
///
/// Built with the same chained-builder style as the rest of the crate:
///
/// ```
/// use blip::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_master_volume(0.5)
///     .with_start_suspended(true);
/// assert_eq!(config.master_volume, 0.5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Initial master volume, clamped into `[0, 1]`
    pub master_volume: f32,
    /// Sample rate of offline endpoints in Hz
    pub sample_rate: u32,
    /// Whether a freshly created endpoint waits for a resume before playing.
    ///
    /// Browsers keep audio locked until a user gesture, so this defaults to
    /// `true` on wasm32 and `false` elsewhere.
    pub start_suspended: bool,
    /// How far the render thread stays ahead of the device, at most
    /// [`MAX_RENDER_LEAD`]
    pub render_lead: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            master_volume: DEFAULT_MASTER_VOLUME,
            sample_rate: DEFAULT_SAMPLE_RATE,
            start_suspended: cfg!(target_arch = "wasm32"),
            render_lead: Duration::from_millis(20),
        }
    }
}

impl EngineConfig {
    pub fn with_master_volume(mut self, volume: f32) -> Self {
        self.master_volume = clamp_volume(volume);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    pub fn with_start_suspended(mut self, suspended: bool) -> Self {
        self.start_suspended = suspended;
        self
    }

    pub fn with_render_lead(mut self, lead: Duration) -> Self {
        self.render_lead = lead.min(MAX_RENDER_LEAD);
        self
    }
}

/// Clamp a volume into `[0, 1]`; NaN becomes silence.
pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
