//! Second-order low-pass filter
//!
//! Coefficients follow Robert Bristow-Johnson's Audio EQ Cookbook. Resonance
//! is given in decibels, matching how browser audio engines interpret the
//! lowpass `Q`.

use dasp_graph::{Buffer, Input};

use crate::node::{AudioNode, ProcessContext};

/// Resonance used when none is given (1 dB, a gentle bump at the cutoff).
pub const DEFAULT_RESONANCE_DB: f32 = 1.0;

/// Messages to control a low-pass filter
#[derive(Clone, Copy, Debug)]
pub enum LowPassMessage {
    SetCutoff(f32),
    SetResonanceDb(f32),
}

#[derive(Clone, Copy, Debug, Default)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    fn lowpass(cutoff: f32, resonance_db: f32, sample_rate: u32) -> Self {
        use std::f64::consts::PI;

        let sample_rate = sample_rate as f64;
        // Avoid nyquist issues
        let freq = (cutoff as f64).clamp(1.0, sample_rate * 0.49);
        let q = 10f64.powf(resonance_db as f64 / 20.0).max(0.001);

        let omega = 2.0 * PI * freq / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_omega) / 2.0 / a0,
            b1: (1.0 - cos_omega) / a0,
            b2: (1.0 - cos_omega) / 2.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// A mono biquad low-pass filter.
pub struct LowPass {
    cutoff: f32,
    resonance_db: f32,
    coefficients: Coefficients,
    /// Sample rate the coefficients were computed for (0 = stale)
    tuned_for: u32,

    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl LowPass {
    pub fn new(cutoff: f32) -> Self {
        Self {
            cutoff,
            resonance_db: DEFAULT_RESONANCE_DB,
            coefficients: Coefficients::default(),
            tuned_for: 0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn with_resonance_db(mut self, resonance_db: f32) -> Self {
        self.resonance_db = resonance_db;
        self
    }

    #[inline]
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    #[inline]
    pub fn resonance_db(&self) -> f32 {
        self.resonance_db
    }

    #[inline]
    fn tick(&mut self, x: f64) -> f64 {
        let c = self.coefficients;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

impl AudioNode for LowPass {
    type Message = LowPassMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = LowPassMessage>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                LowPassMessage::SetCutoff(f) => self.cutoff = f,
                LowPassMessage::SetResonanceDb(q) => self.resonance_db = q,
            }
            self.tuned_for = 0;
        }

        if self.tuned_for != ctx.sample_rate {
            self.coefficients = Coefficients::lowpass(self.cutoff, self.resonance_db, ctx.sample_rate);
            self.tuned_for = ctx.sample_rate;
        }

        if outputs.is_empty() {
            return;
        }

        let mut block = Buffer::SILENT;
        for input in inputs {
            if let Some(in_buffer) = input.buffers().first() {
                for (acc, s) in block.iter_mut().zip(in_buffer.iter()) {
                    *acc += *s;
                }
            }
        }

        for (out, x) in outputs[0].iter_mut().zip(block.iter()) {
            *out = self.tick(*x as f64) as f32;
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::source::{Oscillator, OscillatorMessage, Waveform};
    use crate::nodes::testing::{Constant, Rig};
    use crate::param::ParamEvent;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    fn filtered_tone_rms(freq: f32) -> f32 {
        let mut rig = Rig::new(48_000);
        let mut osc = rig.add(Oscillator::new(Waveform::Sine));
        let filter = rig.add(LowPass::new(3000.0));
        rig.connect(osc.id(), filter.id());
        rig.to_sink(filter.id());

        let _ = osc.send(OscillatorMessage::Frequency(ParamEvent::SetValueAtTime { value: freq, time: 0.0 }));
        let _ = osc.send(OscillatorMessage::Start(0.0));

        let out = rig.render(100);
        // Skip the settling transient
        rms(&out[1600..])
    }

    #[test]
    fn passes_dc() {
        let mut rig = Rig::new(48_000);
        let source = rig.add(Constant(0.5));
        let filter = rig.add(LowPass::new(3000.0));
        rig.connect(source.id(), filter.id());
        rig.to_sink(filter.id());

        let out = rig.render(50);
        let settled = *out.last().unwrap();
        assert!((settled - 0.5).abs() < 1e-3, "dc gain off: {settled}");
    }

    #[test]
    fn attenuates_above_cutoff() {
        let low = filtered_tone_rms(300.0);
        let high = filtered_tone_rms(15_000.0);
        assert!(low > 0.6, "passband too quiet: {low}");
        assert!(high < low * 0.1, "stopband too loud: {high} vs {low}");
    }
}
