//! Filtered white-noise bursts

use rand::Rng;

use crate::catalog::{RecipeKind, SoundRecipe};
use crate::endpoint::{AudioEndpoint, SignalGraphInstance};
use crate::nodes::{BufferSource, BufferSourceMessage, LowPass};
use crate::param::SILENCE_FLOOR;

use super::{post, GainStage};

/// Mono samples needed to cover `duration` seconds.
pub fn noise_buffer_len(sample_rate: u32, duration: f64) -> usize {
    (sample_rate as f64 * duration).round().max(0.0) as usize
}

/// `len` independent samples, uniform in `[-1, 1]`, from the thread RNG.
pub fn white_noise(len: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(-1.0..=1.0)).collect()
}

/// Realizes [`RecipeKind::Noise`] recipes.
///
/// ```text
/// BufferSource ──▶ LowPass ──▶ Gain ──▶ Destination
/// ```
///
/// The buffer is generated fresh for every call, so no two bursts are alike.
pub struct NoiseSynthesizer<'a> {
    endpoint: &'a AudioEndpoint,
    stage: GainStage,
}

impl<'a> NoiseSynthesizer<'a> {
    pub fn new(endpoint: &'a AudioEndpoint, master_volume: f32) -> Self {
        Self {
            endpoint,
            stage: GainStage::new(master_volume),
        }
    }

    /// Schedule a noise recipe. Returns `None` for any other kind of recipe.
    pub fn play_noise(&self, recipe: &SoundRecipe) -> Option<SignalGraphInstance> {
        let RecipeKind::Noise { lowpass_cutoff_hz } = recipe.kind else {
            tracing::debug!("noise synthesizer given a non-noise recipe");
            return None;
        };
        let duration = recipe.duration.max(0.0);

        // Generated before taking the graph lock
        let samples = white_noise(noise_buffer_len(self.endpoint.sample_rate(), duration));

        let instance = self.endpoint.schedule(recipe.lifetime(), move |builder| {
            let now = builder.now();

            let mut source = builder.add(BufferSource::new(samples));
            let filter = builder.add(LowPass::new(lowpass_cutoff_hz));
            let mut gain = self.stage.build(builder, recipe.peak_gain);
            gain.exponential_ramp_to(SILENCE_FLOOR, now + duration);

            builder.connect(source.id(), filter.id());
            builder.connect(filter.id(), gain.id());

            post(&mut source, BufferSourceMessage::Start(now));
        });
        Some(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SoundName;
    use crate::config::EngineConfig;

    #[test]
    fn buffer_length_rounds_to_whole_samples() {
        assert_eq!(noise_buffer_len(48_000, 0.1), 4800);
        assert_eq!(noise_buffer_len(44_100, 0.1), 4410);
        assert_eq!(noise_buffer_len(22_050, 0.00003), 1);
        assert_eq!(noise_buffer_len(48_000, -1.0), 0);
    }

    #[test]
    fn noise_is_bounded_and_fresh() {
        let a = white_noise(4800);
        let b = white_noise(4800);
        assert_eq!(a.len(), 4800);
        assert!(a.iter().chain(&b).all(|s| (-1.0..=1.0).contains(s)));
        assert_ne!(a, b);
    }

    #[test]
    fn shutter_is_a_filtered_decaying_burst() {
        let endpoint = AudioEndpoint::offline(&EngineConfig::default().with_start_suspended(false));
        let instance = NoiseSynthesizer::new(&endpoint, 0.8)
            .play_noise(&SoundName::Shutter.recipe())
            .unwrap();

        // Source, filter, gain
        assert_eq!(instance.nodes().len(), 3);
        assert!((instance.lifetime() - 0.1).abs() < 1e-12);

        let out = endpoint.render(4800).unwrap();
        let energy = |s: &[f32]| s.iter().map(|x| x * x).sum::<f32>();
        assert!(energy(&out[..960]) > 0.0);
        assert!(energy(&out[3840..4800]) < energy(&out[..960]));
    }

    #[test]
    fn refuses_tone_recipes() {
        let endpoint = AudioEndpoint::offline(&EngineConfig::default());
        let noise = NoiseSynthesizer::new(&endpoint, 1.0);
        assert!(noise.play_noise(&SoundName::Click.recipe()).is_none());
    }
}
