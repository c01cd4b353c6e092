//! Sample-accurate parameter automation.
//!
//! An [`AudioParam`] is a value plus a timeline of [`ParamEvent`]s expressed
//! on the endpoint clock. Nodes evaluate it per sample with
//! [`AudioParam::value_at`]; builders schedule events by sending them to the
//! owning node.
//!
//! Ramp semantics: a ramp event moves the value from the previous event's
//! `(time, value)` to its own target, arriving exactly at its end time. Before
//! the first event the param holds its default value; after the last event it
//! holds the last target.

/// Exponential ramps can't reach zero; envelopes decay to this instead.
pub const SILENCE_FLOOR: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamEvent {
    /// Jump to `value` at `time`.
    SetValueAtTime { value: f32, time: f64 },
    /// Straight-line ramp arriving at `value` at `end_time`.
    LinearRampToValueAtTime { value: f32, end_time: f64 },
    /// Exponential ramp arriving at `value` at `end_time`.
    ///
    /// If the start and target differ in sign, or either is zero, the ramp is
    /// undefined; the param holds its start value until `end_time` and then
    /// jumps to the target.
    ExponentialRampToValueAtTime { value: f32, end_time: f64 },
}

impl ParamEvent {
    #[inline]
    pub fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValueAtTime { time, .. } => time,
            ParamEvent::LinearRampToValueAtTime { end_time, .. } => end_time,
            ParamEvent::ExponentialRampToValueAtTime { end_time, .. } => end_time,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        match *self {
            ParamEvent::SetValueAtTime { value, .. } => value,
            ParamEvent::LinearRampToValueAtTime { value, .. } => value,
            ParamEvent::ExponentialRampToValueAtTime { value, .. } => value,
        }
    }
}

/// An automatable parameter (frequency, gain, ...).
#[derive(Clone, Debug)]
pub struct AudioParam {
    default: f32,
    /// Sorted by time; equal times keep insertion order.
    events: Vec<ParamEvent>,
}

impl AudioParam {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            events: Vec::with_capacity(4),
        }
    }

    pub fn default_value(&self) -> f32 {
        self.default
    }

    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    /// Insert an event, keeping the timeline sorted.
    pub fn schedule(&mut self, event: ParamEvent) {
        let t = event.time();
        let pos = self.events.partition_point(|e| e.time() <= t);
        self.events.insert(pos, event);
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.schedule(ParamEvent::SetValueAtTime { value, time });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.schedule(ParamEvent::LinearRampToValueAtTime { value, end_time });
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.schedule(ParamEvent::ExponentialRampToValueAtTime { value, end_time });
    }

    /// Value of the parameter at endpoint time `t` (seconds).
    pub fn value_at(&self, t: f64) -> f32 {
        // First event strictly after t
        let next = self.events.partition_point(|e| e.time() <= t);

        let (prev_time, prev_value) = if next == 0 {
            (f64::NEG_INFINITY, self.default)
        } else {
            let e = &self.events[next - 1];
            (e.time(), e.value())
        };

        let Some(upcoming) = self.events.get(next) else {
            return prev_value;
        };

        match *upcoming {
            ParamEvent::SetValueAtTime { .. } => prev_value,
            _ if !prev_time.is_finite() => prev_value,
            ParamEvent::LinearRampToValueAtTime { value, end_time } => {
                let span = end_time - prev_time;
                if span <= 0.0 {
                    return prev_value;
                }
                let progress = ((t - prev_time) / span) as f32;
                prev_value + (value - prev_value) * progress
            }
            ParamEvent::ExponentialRampToValueAtTime { value, end_time } => {
                let span = end_time - prev_time;
                if span <= 0.0 || prev_value == 0.0 || value == 0.0 || (prev_value < 0.0) != (value < 0.0) {
                    return prev_value;
                }
                let progress = (t - prev_time) / span;
                (prev_value as f64 * (value as f64 / prev_value as f64).powf(progress)) as f32
            }
        }
    }

    /// Drop events that can no longer influence values at or after `t`.
    ///
    /// The last event at or before `t` is kept as the anchor for any ramp that
    /// follows it.
    pub fn forget_before(&mut self, t: f64) {
        let settled = self.events.partition_point(|e| e.time() <= t);
        if settled > 1 {
            self.events.drain(..settled - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4 * b.abs().max(1.0)
    }

    #[test]
    fn holds_default_without_events() {
        let p = AudioParam::new(440.0);
        assert_eq!(p.value_at(0.0), 440.0);
        assert_eq!(p.value_at(10.0), 440.0);
    }

    #[test]
    fn set_value_takes_effect_at_its_time() {
        let mut p = AudioParam::new(440.0);
        p.set_value_at_time(200.0, 0.05);
        assert_eq!(p.value_at(0.049), 440.0);
        assert_eq!(p.value_at(0.05), 200.0);
        assert_eq!(p.value_at(1.0), 200.0);
    }

    #[test]
    fn exponential_ramp_is_geometric() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(800.0, 0.0);
        p.exponential_ramp_to_value_at_time(100.0, 0.05);

        assert_eq!(p.value_at(0.0), 800.0);
        // Halfway in time is the geometric mean
        assert!(close(p.value_at(0.025), (800.0f32 * 100.0).sqrt()));
        assert_eq!(p.value_at(0.05), 100.0);
        assert_eq!(p.value_at(0.2), 100.0);
    }

    #[test]
    fn linear_ramp_interpolates() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(0.0, 1.0);
        p.linear_ramp_to_value_at_time(1.0, 2.0);
        assert!(close(p.value_at(1.25), 0.25));
        assert_eq!(p.value_at(2.0), 1.0);
    }

    #[test]
    fn exponential_ramp_from_zero_holds_then_jumps() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(0.0, 0.0);
        p.exponential_ramp_to_value_at_time(1.0, 1.0);
        assert_eq!(p.value_at(0.5), 0.0);
        assert_eq!(p.value_at(1.0), 1.0);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut p = AudioParam::new(1.0);
        p.exponential_ramp_to_value_at_time(SILENCE_FLOOR, 0.3);
        p.set_value_at_time(0.5, 0.0);
        assert_eq!(p.value_at(0.0), 0.5);
        assert!(p.value_at(0.15) < 0.5);
        assert_eq!(p.value_at(0.3), SILENCE_FLOOR);
    }

    #[test]
    fn forgetting_keeps_the_ramp_anchor() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(0.0, 0.0);
        p.set_value_at_time(800.0, 0.1);
        p.exponential_ramp_to_value_at_time(100.0, 0.2);

        let before = p.value_at(0.15);
        p.forget_before(0.12);
        assert_eq!(p.events().len(), 2);
        assert_eq!(p.value_at(0.15), before);
    }
}
