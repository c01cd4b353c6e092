//! The sound engine and its process-wide instance.
//!
//! Most callers only need the free functions:
//!
//! ```no_run
//! blip::play_click();
//! blip::play("success");
//! ```
//!
//! They share one lazily created [`SoundEngine`] on the default output device,
//! so a process holds at most one device endpoint. Call [`configure`] before
//! the first sound to change its settings. Engines built with
//! [`SoundEngine::offline`] render into memory and never touch the device.

use std::sync::OnceLock;

use crate::catalog::{RecipeKind, SoundCatalog, SoundName};
use crate::config::EngineConfig;
use crate::device::DeviceContext;
use crate::endpoint::SignalGraphInstance;
use crate::error::AudioError;
use crate::synth::{NoiseSynthesizer, ToneSynthesizer};

/// Resolves preset names and plays them on a [`DeviceContext`].
///
/// Every play is fire-and-forget: it schedules a self-disposing graph and
/// returns. Failures are logged, never surfaced, except through
/// [`try_play`](Self::try_play).
pub struct SoundEngine {
    device: DeviceContext,
    catalog: SoundCatalog,
}

impl SoundEngine {
    /// An engine on the system's default output device. Only the process-wide
    /// engine is built this way; see [`engine`].
    fn on_default_device(config: EngineConfig) -> Self {
        Self::with_device(DeviceContext::new(config))
    }

    /// An engine rendering into memory, driven by
    /// [`AudioEndpoint::render`](crate::AudioEndpoint::render).
    pub fn offline(config: EngineConfig) -> Self {
        Self::with_device(DeviceContext::offline(config))
    }

    pub fn with_device(device: DeviceContext) -> Self {
        Self {
            device,
            catalog: SoundCatalog::default(),
        }
    }

    /// Replace the preset catalog.
    pub fn with_catalog(mut self, catalog: SoundCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn device(&self) -> &DeviceContext {
        &self.device
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.device.master_volume()
    }

    /// Applies to sounds triggered from now on.
    pub fn set_master_volume(&self, volume: f32) {
        self.device.set_master_volume(volume);
    }

    /// Play a preset by name.
    ///
    /// Fails only for unknown names. `Ok(None)` means the endpoint is
    /// unavailable and nothing was scheduled.
    pub fn try_play(&self, name: &str) -> Result<Option<SignalGraphInstance>, AudioError> {
        let recipe = self
            .catalog
            .get(name)
            .ok_or_else(|| AudioError::UnknownSound(name.to_string()))?;

        let Some(endpoint) = self.device.acquire() else {
            return Ok(None);
        };
        let master_volume = self.device.master_volume();

        let instance = match recipe.kind {
            RecipeKind::Tone { .. } => ToneSynthesizer::new(endpoint, master_volume).play_tone(recipe),
            RecipeKind::Noise { .. } => NoiseSynthesizer::new(endpoint, master_volume).play_noise(recipe),
        };
        if let Some(instance) = &instance {
            tracing::debug!(sound = name, instance = instance.id(), "playing");
        }
        Ok(instance)
    }

    /// Play a preset and return the scheduled instance for inspection.
    pub fn trigger(&self, name: &str) -> Option<SignalGraphInstance> {
        self.try_play(name).unwrap_or_else(|error| {
            tracing::warn!(%error, "sound not played");
            None
        })
    }

    pub fn play(&self, name: &str) {
        self.trigger(name);
    }

    pub fn play_sound(&self, name: SoundName) {
        self.play(name.as_str());
    }

    pub fn play_click(&self) {
        self.play_sound(SoundName::Click);
    }

    pub fn play_shutter(&self) {
        self.play_sound(SoundName::Shutter);
    }

    pub fn play_enter_grid(&self) {
        self.play_sound(SoundName::EnterGrid);
    }

    pub fn play_success(&self) {
        self.play_sound(SoundName::Success);
    }

    pub fn play_nav(&self) {
        self.play_sound(SoundName::Nav);
    }
}

static ENGINE: OnceLock<SoundEngine> = OnceLock::new();

/// The process-wide engine, the only one that plays on the output device.
///
/// Created with default settings on first use unless [`configure`] ran first.
pub fn engine() -> &'static SoundEngine {
    ENGINE.get_or_init(|| SoundEngine::on_default_device(EngineConfig::default()))
}

/// Set up the process-wide engine.
///
/// Returns `false` (and changes nothing) if the engine already exists, either
/// from an earlier `configure` or because a sound was already played.
pub fn configure(config: EngineConfig) -> bool {
    let configured = ENGINE.set(SoundEngine::on_default_device(config)).is_ok();
    if !configured {
        tracing::debug!("sound engine already initialized, configuration ignored");
    }
    configured
}

/// Master volume of the process-wide engine, clamped into `[0, 1]`.
pub fn set_master_volume(volume: f32) {
    engine().set_master_volume(volume);
}

/// Play a preset by name on the process-wide engine. Unknown names are logged.
pub fn play(name: &str) {
    engine().play(name);
}

pub fn play_click() {
    engine().play_click();
}

pub fn play_shutter() {
    engine().play_shutter();
}

pub fn play_enter_grid() {
    engine().play_enter_grid();
}

pub fn play_success() {
    engine().play_success();
}

pub fn play_nav() {
    engine().play_nav();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SoundRecipe;

    fn offline_engine() -> SoundEngine {
        SoundEngine::offline(EngineConfig::default().with_start_suspended(false))
    }

    #[test]
    fn unknown_names_are_errors() {
        let engine = offline_engine();
        assert_eq!(
            engine.try_play("kazoo"),
            Err(AudioError::UnknownSound("kazoo".into()))
        );
        assert!(engine.trigger("kazoo").is_none());
        // Never touched the device
        assert!(engine.device().endpoint().is_none());
    }

    #[test]
    fn plays_every_builtin() {
        let engine = offline_engine();
        for name in SoundName::ALL {
            assert!(engine.trigger(name.as_str()).is_some(), "{name} did not play");
        }
        let endpoint = engine.device().endpoint().unwrap();
        assert_eq!(endpoint.active_instances(), SoundName::ALL.len());
    }

    #[test]
    fn custom_catalog_needs_no_synth_changes() {
        let mut catalog = SoundCatalog::empty();
        catalog.insert("thud", SoundRecipe::noise(200.0, 0.2, 1.0));
        let engine = offline_engine().with_catalog(catalog);

        let instance = engine.trigger("thud").unwrap();
        assert!((instance.lifetime() - 0.2).abs() < 1e-12);
        assert!(engine.trigger("click").is_none());
    }

    #[test]
    fn process_wide_engine_is_configured_once() {
        let config = EngineConfig::default().with_master_volume(0.4);
        assert!(configure(config.clone()));
        assert!(!configure(EngineConfig::default()));

        // Same engine every time, and no device opened until a sound plays
        assert!(std::ptr::eq(engine(), engine()));
        assert_eq!(engine().device().config(), &config);
        assert!(engine().device().endpoint().is_none());
    }

    #[test]
    fn unavailable_device_swallows_plays() {
        let device = DeviceContext::with_factory(EngineConfig::default(), |_| {
            Err(AudioError::EndpointUnavailable("no hardware".into()))
        });
        let engine = SoundEngine::with_device(device);

        engine.play_click();
        engine.play_shutter();
        assert_eq!(engine.try_play("success"), Ok(None));
    }
}
