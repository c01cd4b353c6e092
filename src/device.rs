//! Output device discovery and the lazily created process-wide endpoint.
//!
//! [`CpalDevice`] wraps the system's default output. [`DeviceContext`] owns the
//! one [`AudioEndpoint`] a sound engine plays through, creates it on first use,
//! and keeps poking it awake:
//!
//! ```
//! use blip::{DeviceContext, EndpointState, EngineConfig};
//!
//! let context = DeviceContext::offline(EngineConfig::default().with_start_suspended(true));
//! assert_eq!(context.state(), EndpointState::Uninitialized);
//!
//! // The first acquire builds the endpoint, and every acquire resumes it
//! let endpoint = context.acquire().unwrap();
//! assert_eq!(endpoint.state(), EndpointState::Running);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

#[cfg(feature = "cpal_sink")]
use cpal::traits::{DeviceTrait, HostTrait};

use crate::config::{clamp_volume, EngineConfig};
use crate::endpoint::{AudioEndpoint, EndpointState};
use crate::error::AudioError;

/// The system's default audio output device.
///
/// The process-wide engine opens its endpoint on this device. It is public so
/// callers can see what they will be playing through.
#[cfg(feature = "cpal_sink")]
pub struct CpalDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,

    name: String,
    sample_rate: u32,
    channels: u16,
}

#[cfg(feature = "cpal_sink")]
impl CpalDevice {
    /// Get the system's default output device.
    ///
    /// Fails with [`AudioError::EndpointUnavailable`] when the host has no
    /// output device or will not report a usable config for it.
    ///
    /// ```no_run
    /// # use blip::CpalDevice;
    /// if let Ok(device) = CpalDevice::default_output() {
    ///     println!("Default: {} at {} Hz", device.name(), device.sample_rate());
    /// }
    /// ```
    pub fn default_output() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::EndpointUnavailable("no default output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::EndpointUnavailable(e.to_string()))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());

        Ok(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
        })
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device's sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of output channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Open an output stream on this device, paused.
    pub(crate) fn create_sink(
        &self,
    ) -> Result<(crate::nodes::CpalSink, crate::nodes::StreamControl), AudioError> {
        crate::nodes::CpalSink::open(&self.device, &self.config)
    }
}

type EndpointFactory = Box<dyn Fn(&EngineConfig) -> Result<AudioEndpoint, AudioError> + Send + Sync>;

/// Owns the single [`AudioEndpoint`] and the master volume.
///
/// The endpoint is built on the first [`acquire`](Self::acquire). If that
/// fails, the context stays endpoint-less for good and every later acquire
/// returns `None`, so sound quietly turns into a no-op.
pub struct DeviceContext {
    config: EngineConfig,
    factory: EndpointFactory,
    endpoint: OnceLock<Option<AudioEndpoint>>,
    /// f32 bits
    master_volume: AtomicU32,
}

impl DeviceContext {
    /// A context that opens the system's default output device.
    ///
    /// Without the `cpal_sink` feature there is no device to open and the
    /// context degrades to a no-op on first use. Only the process-wide engine
    /// builds one of these.
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self::with_factory(config, default_factory)
    }

    /// A context whose endpoint renders into memory instead of a device.
    pub fn offline(config: EngineConfig) -> Self {
        Self::with_factory(config, |config| Ok(AudioEndpoint::offline(config)))
    }

    /// A context that builds its endpoint with `factory`.
    pub fn with_factory<F>(config: EngineConfig, factory: F) -> Self
    where
        F: Fn(&EngineConfig) -> Result<AudioEndpoint, AudioError> + Send + Sync + 'static,
    {
        let volume = clamp_volume(config.master_volume);
        Self {
            config,
            factory: Box::new(factory),
            endpoint: OnceLock::new(),
            master_volume: AtomicU32::new(volume.to_bits()),
        }
    }

    /// Get the endpoint, building it on the first call.
    ///
    /// A suspended endpoint is asked to resume every time, including after a
    /// refused resume. The refusal is logged and the endpoint is returned
    /// anyway: whatever gets scheduled on it plays once output unlocks.
    pub fn acquire(&self) -> Option<&AudioEndpoint> {
        let endpoint = self.endpoint.get_or_init(|| self.build()).as_ref()?;

        if endpoint.state() == EndpointState::Suspended {
            if let Err(error) = endpoint.resume() {
                tracing::debug!(%error, "audio endpoint stays suspended");
            }
        }
        Some(endpoint)
    }

    fn build(&self) -> Option<AudioEndpoint> {
        match (self.factory)(&self.config) {
            Ok(endpoint) => {
                tracing::debug!(
                    sample_rate = endpoint.sample_rate(),
                    state = ?endpoint.state(),
                    "audio endpoint created"
                );
                Some(endpoint)
            }
            Err(error) => {
                tracing::warn!(%error, "audio endpoint unavailable, sound disabled");
                None
            }
        }
    }

    /// `Uninitialized` until the first acquire, and forever after a failed one.
    pub fn state(&self) -> EndpointState {
        match self.endpoint.get() {
            Some(Some(endpoint)) => endpoint.state(),
            _ => EndpointState::Uninitialized,
        }
    }

    /// The endpoint if it has already been built, without resuming it.
    pub fn endpoint(&self) -> Option<&AudioEndpoint> {
        self.endpoint.get().and_then(Option::as_ref)
    }

    #[inline]
    pub fn master_volume(&self) -> f32 {
        f32::from_bits(self.master_volume.load(Ordering::Relaxed))
    }

    /// Set the master volume, clamped into `[0, 1]`. Sounds already playing
    /// keep the volume they were built with.
    pub fn set_master_volume(&self, volume: f32) {
        self.master_volume
            .store(clamp_volume(volume).to_bits(), Ordering::Relaxed);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(feature = "cpal_sink")]
fn default_factory(config: &EngineConfig) -> Result<AudioEndpoint, AudioError> {
    AudioEndpoint::open_default(config)
}

#[cfg(not(feature = "cpal_sink"))]
fn default_factory(_config: &EngineConfig) -> Result<AudioEndpoint, AudioError> {
    Err(AudioError::EndpointUnavailable("built without the cpal_sink feature".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn endpoint_is_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let context = DeviceContext::with_factory(EngineConfig::default(), move |config| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(AudioEndpoint::offline(config))
        });

        assert!(context.endpoint().is_none());
        assert!(context.acquire().is_some());
        assert!(context.acquire().is_some());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_construction_degrades_to_no_op() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let context = DeviceContext::with_factory(EngineConfig::default(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AudioError::EndpointUnavailable("no hardware".into()))
        });

        assert!(context.acquire().is_none());
        assert!(context.acquire().is_none());
        assert_eq!(context.state(), EndpointState::Uninitialized);
        // Never retried
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn acquire_resumes_suspended_endpoint() {
        let context = DeviceContext::offline(EngineConfig::default().with_start_suspended(true));
        let endpoint = context.acquire().unwrap();
        assert_eq!(endpoint.state(), EndpointState::Running);

        endpoint.suspend().unwrap();
        assert_eq!(context.state(), EndpointState::Suspended);
        context.acquire();
        assert_eq!(context.state(), EndpointState::Running);
    }

    #[test]
    fn refused_resume_is_retried_on_next_acquire() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let context = DeviceContext::with_factory(EngineConfig::default().with_start_suspended(true), move |config| {
            let counter = counter.clone();
            Ok(AudioEndpoint::offline_with_unlock(config, move || {
                // Locked until the second try
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AudioError::ResumeFailed("no user gesture yet".into()))
                } else {
                    Ok(())
                }
            }))
        });

        assert!(context.acquire().is_some());
        assert_eq!(context.state(), EndpointState::Suspended);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        context.acquire();
        assert_eq!(context.state(), EndpointState::Running);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        // Running endpoints are left alone
        context.acquire();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn master_volume_is_clamped() {
        let context = DeviceContext::offline(EngineConfig::default());
        assert_eq!(context.master_volume(), 0.8);

        context.set_master_volume(1.7);
        assert_eq!(context.master_volume(), 1.0);
        context.set_master_volume(-0.2);
        assert_eq!(context.master_volume(), 0.0);
        context.set_master_volume(0.25);
        assert_eq!(context.master_volume(), 0.25);
    }
}
