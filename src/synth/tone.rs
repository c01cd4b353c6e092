//! Oscillator-based sounds

use crate::catalog::{RecipeKind, SoundRecipe, Voice};
use crate::endpoint::{AudioEndpoint, GraphBuilder, SignalGraphInstance};
use crate::nodes::{Oscillator, OscillatorMessage};
use crate::param::{ParamEvent, SILENCE_FLOOR};

use super::{post, GainStage};

/// Realizes [`RecipeKind::Tone`] recipes.
///
/// Each voice gets its own oscillator and gain stage:
///
/// ```text
/// Oscillator ──▶ Gain ──▶ Destination
/// ```
///
/// A voice starts at `now + start_offset` and lasts the recipe's duration. Its
/// pitch optionally sweeps exponentially over that span while its gain decays
/// exponentially from the peak to near silence.
pub struct ToneSynthesizer<'a> {
    endpoint: &'a AudioEndpoint,
    stage: GainStage,
}

impl<'a> ToneSynthesizer<'a> {
    pub fn new(endpoint: &'a AudioEndpoint, master_volume: f32) -> Self {
        Self {
            endpoint,
            stage: GainStage::new(master_volume),
        }
    }

    /// Schedule a tone recipe. Returns `None` for any other kind of recipe.
    pub fn play_tone(&self, recipe: &SoundRecipe) -> Option<SignalGraphInstance> {
        let RecipeKind::Tone { voices } = &recipe.kind else {
            tracing::debug!("tone synthesizer given a non-tone recipe");
            return None;
        };
        let duration = recipe.duration.max(0.0);

        let instance = self.endpoint.schedule(recipe.lifetime(), |builder| {
            let now = builder.now();
            for voice in voices {
                self.add_voice(builder, voice, now, duration, recipe.peak_gain);
            }
        });
        Some(instance)
    }

    fn add_voice(&self, builder: &mut GraphBuilder<'_>, voice: &Voice, now: f64, duration: f64, peak_gain: f32) {
        let start = now + voice.start_offset.max(0.0);
        let end = start + duration;

        let mut osc = builder.add(Oscillator::new(voice.waveform));
        post(
            &mut osc,
            OscillatorMessage::Frequency(ParamEvent::SetValueAtTime {
                value: voice.start_hz,
                time: start,
            }),
        );
        if let Some(end_hz) = voice.end_hz {
            post(
                &mut osc,
                OscillatorMessage::Frequency(ParamEvent::ExponentialRampToValueAtTime {
                    value: end_hz,
                    end_time: end,
                }),
            );
        }

        let mut gain = self.stage.build(builder, peak_gain);
        gain.set_value_at_time(gain.initial_gain(), start);
        gain.exponential_ramp_to(SILENCE_FLOOR, end);

        builder.connect(osc.id(), gain.id());

        post(&mut osc, OscillatorMessage::Start(start));
        post(&mut osc, OscillatorMessage::Stop(end));
    }
}
