//! Named sound presets.
//!
//! A [`SoundRecipe`] is pure data. The synthesizers interpret it, so adding a
//! preset never touches synthesis code:
//!
//! ```
//! use blip::{SoundCatalog, SoundRecipe, Voice, Waveform};
//!
//! let mut catalog = SoundCatalog::default();
//! catalog.insert(
//!     "error",
//!     SoundRecipe::tone(vec![Voice::new(220.0).sweep_to(110.0).with_waveform(Waveform::Square)], 0.2, 0.5),
//! );
//! assert!(catalog.get("error").is_some());
//! ```

use core::fmt;
use core::str::FromStr;

use hashbrown::HashMap;

use crate::error::AudioError;
use crate::nodes::Waveform;

/// One oscillator in a tone recipe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Voice {
    pub start_hz: f32,
    /// Exponential sweep target, reached at the end of the voice
    pub end_hz: Option<f32>,
    pub waveform: Waveform,
    /// Seconds after the trigger before this voice starts
    pub start_offset: f64,
}

impl Voice {
    /// A steady sine voice starting immediately.
    pub fn new(start_hz: f32) -> Self {
        Self {
            start_hz,
            end_hz: None,
            waveform: Waveform::Sine,
            start_offset: 0.0,
        }
    }

    pub fn sweep_to(mut self, end_hz: f32) -> Self {
        self.end_hz = Some(end_hz);
        self
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn at_offset(mut self, seconds: f64) -> Self {
        self.start_offset = seconds;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecipeKind {
    /// Oscillators, each with its own gain envelope
    Tone { voices: Vec<Voice> },
    /// Low-passed white noise burst
    Noise { lowpass_cutoff_hz: f32 },
}

/// Everything needed to synthesize one effect.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundRecipe {
    pub kind: RecipeKind,
    /// Seconds each voice (or the noise burst) lasts
    pub duration: f64,
    /// Peak gain before master volume is applied
    pub peak_gain: f32,
}

impl SoundRecipe {
    pub fn tone(voices: Vec<Voice>, duration: f64, peak_gain: f32) -> Self {
        Self {
            kind: RecipeKind::Tone { voices },
            duration,
            peak_gain,
        }
    }

    pub fn noise(lowpass_cutoff_hz: f32, duration: f64, peak_gain: f32) -> Self {
        Self {
            kind: RecipeKind::Noise { lowpass_cutoff_hz },
            duration,
            peak_gain,
        }
    }

    /// Seconds from trigger until the last voice has finished.
    pub fn lifetime(&self) -> f64 {
        let duration = self.duration.max(0.0);
        match &self.kind {
            RecipeKind::Tone { voices } => {
                let last_offset = voices
                    .iter()
                    .map(|voice| voice.start_offset.max(0.0))
                    .fold(0.0, f64::max);
                duration + last_offset
            }
            RecipeKind::Noise { .. } => duration,
        }
    }
}

/// The built-in presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoundName {
    Click,
    Shutter,
    EnterGrid,
    Success,
    Nav,
}

impl SoundName {
    pub const ALL: [SoundName; 5] = [
        SoundName::Click,
        SoundName::Shutter,
        SoundName::EnterGrid,
        SoundName::Success,
        SoundName::Nav,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SoundName::Click => "click",
            SoundName::Shutter => "shutter",
            SoundName::EnterGrid => "enter-grid",
            SoundName::Success => "success",
            SoundName::Nav => "nav-blip",
        }
    }

    /// The factory recipe for this preset.
    pub fn recipe(self) -> SoundRecipe {
        match self {
            SoundName::Click => SoundRecipe::tone(vec![Voice::new(800.0).sweep_to(100.0)], 0.05, 0.6),
            SoundName::Shutter => SoundRecipe::noise(3000.0, 0.1, 1.2),
            SoundName::EnterGrid => SoundRecipe::tone(
                vec![
                    Voice::new(200.0),
                    Voice::new(400.0).at_offset(0.05),
                    Voice::new(600.0).at_offset(0.1),
                ],
                0.4,
                0.4,
            ),
            SoundName::Success => SoundRecipe::tone(
                vec![
                    Voice::new(523.25),
                    Voice::new(659.25).at_offset(0.03),
                    Voice::new(783.99).at_offset(0.06),
                ],
                0.3,
                0.3,
            ),
            SoundName::Nav => SoundRecipe::tone(vec![Voice::new(880.0).sweep_to(440.0)], 0.1, 1.2),
        }
    }
}

impl fmt::Display for SoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundName {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| AudioError::UnknownSound(s.to_string()))
    }
}

/// Map from preset name to recipe.
#[derive(Clone, Debug)]
pub struct SoundCatalog {
    recipes: HashMap<String, SoundRecipe>,
}

impl SoundCatalog {
    /// A catalog with no presets at all.
    pub fn empty() -> Self {
        Self {
            recipes: HashMap::new(),
        }
    }

    /// Add or replace a preset. Returns the recipe it replaced.
    pub fn insert(&mut self, name: impl Into<String>, recipe: SoundRecipe) -> Option<SoundRecipe> {
        self.recipes.insert(name.into(), recipe)
    }

    pub fn get(&self, name: &str) -> Option<&SoundRecipe> {
        self.recipes.get(name)
    }

    /// Preset names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.recipes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl Default for SoundCatalog {
    /// The five built-in presets.
    fn default() -> Self {
        let mut catalog = Self::empty();
        for name in SoundName::ALL {
            catalog.insert(name.as_str(), name.recipe());
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_strings() {
        for name in SoundName::ALL {
            assert_eq!(name.as_str().parse::<SoundName>(), Ok(name));
        }
        assert_eq!(
            "boing".parse::<SoundName>(),
            Err(AudioError::UnknownSound("boing".into()))
        );
    }

    #[test]
    fn default_catalog_has_every_preset() {
        let catalog = SoundCatalog::default();
        assert_eq!(catalog.names(), ["click", "enter-grid", "nav-blip", "shutter", "success"]);
    }

    #[test]
    fn lifetime_includes_last_offset() {
        let catalog = SoundCatalog::default();
        let lifetime = |name: &str| catalog.get(name).unwrap().lifetime();

        assert!((lifetime("click") - 0.05).abs() < 1e-12);
        assert!((lifetime("shutter") - 0.1).abs() < 1e-12);
        assert!((lifetime("enter-grid") - 0.5).abs() < 1e-12);
        assert!((lifetime("success") - 0.36).abs() < 1e-12);
        assert!((lifetime("nav-blip") - 0.1).abs() < 1e-12);
    }

    fn tone_voices(name: SoundName) -> Vec<Voice> {
        match name.recipe().kind {
            RecipeKind::Tone { voices } => voices,
            RecipeKind::Noise { .. } => panic!("{name} should be a tone"),
        }
    }

    /// Compares (start Hz, end Hz, offset seconds) per voice
    fn assert_voices(voices: &[Voice], expected: &[(f32, Option<f32>, f64)]) {
        let actual: Vec<_> = voices.iter().map(|v| (v.start_hz, v.end_hz, v.start_offset)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn click_recipe_shape() {
        let click = SoundName::Click.recipe();
        assert_eq!((click.duration, click.peak_gain), (0.05, 0.6));
        let voices = tone_voices(SoundName::Click);
        assert_voices(&voices, &[(800.0, Some(100.0), 0.0)]);
        assert_eq!(voices[0].waveform, Waveform::Sine);
    }

    #[test]
    fn shutter_recipe_shape() {
        let shutter = SoundName::Shutter.recipe();
        assert_eq!(shutter.kind, RecipeKind::Noise { lowpass_cutoff_hz: 3000.0 });
        assert_eq!((shutter.duration, shutter.peak_gain), (0.1, 1.2));
    }

    #[test]
    fn enter_grid_recipe_shape() {
        let enter = SoundName::EnterGrid.recipe();
        assert_eq!((enter.duration, enter.peak_gain), (0.4, 0.4));
        let voices = tone_voices(SoundName::EnterGrid);
        assert_voices(&voices, &[(200.0, None, 0.0), (400.0, None, 0.05), (600.0, None, 0.1)]);
        assert!(voices.iter().all(|v| v.waveform == Waveform::Sine));
    }

    #[test]
    fn success_recipe_shape() {
        let success = SoundName::Success.recipe();
        assert_eq!((success.duration, success.peak_gain), (0.3, 0.3));
        let voices = tone_voices(SoundName::Success);
        assert_voices(&voices, &[(523.25, None, 0.0), (659.25, None, 0.03), (783.99, None, 0.06)]);
        assert!(voices.iter().all(|v| v.waveform == Waveform::Sine));
    }

    #[test]
    fn nav_recipe_shape() {
        let nav = SoundName::Nav.recipe();
        assert_eq!((nav.duration, nav.peak_gain), (0.1, 1.2));
        let voices = tone_voices(SoundName::Nav);
        assert_voices(&voices, &[(880.0, Some(440.0), 0.0)]);
        assert_eq!(voices[0].waveform, Waveform::Sine);
    }

    #[test]
    fn custom_presets_replace_by_name() {
        let mut catalog = SoundCatalog::empty();
        assert!(catalog.is_empty());
        assert!(catalog.insert("thud", SoundRecipe::noise(200.0, 0.2, 1.0)).is_none());
        let previous = catalog.insert("thud", SoundRecipe::noise(150.0, 0.2, 1.0));
        assert_eq!(previous, Some(SoundRecipe::noise(200.0, 0.2, 1.0)));
        assert_eq!(catalog.len(), 1);
    }
}
