//! Periodic oscillator with scheduled frequency and start/stop times

use dasp_graph::{Buffer, Input};

use crate::node::{AudioNode, ProcessContext};
use crate::param::{AudioParam, ParamEvent};

/// Oscillator frequency before any automation is scheduled.
pub const DEFAULT_FREQUENCY: f32 = 440.0;

/// Shape of one oscillator period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Sample the waveform at `phase` in `[0, 1)`. Every shape starts at zero
    /// (square excepted) and rises.
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * core::f32::consts::TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            Waveform::Sawtooth => {
                if phase < 0.5 { 2.0 * phase } else { 2.0 * phase - 2.0 }
            }
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }
}

/// Messages to control an oscillator
#[derive(Clone, Copy, Debug)]
pub enum OscillatorMessage {
    /// Add an event to the frequency timeline
    Frequency(ParamEvent),
    /// Begin producing sound at this endpoint time
    Start(f64),
    /// Fall silent at this endpoint time, for good
    Stop(f64),
}

/// A one-shot periodic source (mono).
///
/// Silent until started; once the stop time passes it never sounds again.
pub struct Oscillator {
    waveform: Waveform,
    frequency: AudioParam,
    phase: f32,
    start: Option<f64>,
    stop: Option<f64>,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            frequency: AudioParam::new(DEFAULT_FREQUENCY),
            phase: 0.0,
            start: None,
            stop: None,
        }
    }

    #[inline]
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    #[inline]
    pub fn frequency(&self) -> &AudioParam {
        &self.frequency
    }

    /// True once the stop time has been scheduled and reached.
    pub fn has_ended(&self, t: f64) -> bool {
        self.stop.map_or(false, |stop| t >= stop)
    }

    #[inline]
    fn is_sounding(&self, t: f64) -> bool {
        match self.start {
            Some(start) => t >= start && !self.has_ended(t),
            None => false,
        }
    }

    fn apply(&mut self, msg: OscillatorMessage) {
        match msg {
            OscillatorMessage::Frequency(event) => self.frequency.schedule(event),
            OscillatorMessage::Start(t) => self.start = Some(t),
            OscillatorMessage::Stop(t) => self.stop = Some(t),
        }
    }
}

impl AudioNode for Oscillator {
    type Message = OscillatorMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = OscillatorMessage>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            self.apply(msg);
        }

        if outputs.is_empty() {
            return;
        }

        self.frequency.forget_before(ctx.block_start());

        let sample_rate = ctx.sample_rate as f32;
        let (first, rest) = outputs.split_at_mut(1);
        let first = &mut first[0];

        for (i, out) in first.iter_mut().enumerate() {
            let t = ctx.time_at(i);
            if !self.is_sounding(t) {
                *out = 0.0;
                continue;
            }

            *out = self.waveform.sample(self.phase);

            let phase_inc = self.frequency.value_at(t).max(0.0) / sample_rate;
            self.phase += phase_inc;
            self.phase -= self.phase.floor();
        }

        for buffer in rest.iter_mut() {
            buffer.copy_from_slice(first);
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 0 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}
