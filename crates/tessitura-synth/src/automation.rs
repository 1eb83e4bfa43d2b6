//! Parameter automation timelines.
//!
//! A timeline is an ordered list of [`AutomationEvent`]s evaluated against
//! the audio clock, following the Web Audio `AudioParam` model:
//!
//! - `SetValue` jumps to a value at its time.
//! - `LinearRamp` and `ExponentialRamp` run from the previous event's time
//!   and value to their own.
//! - An exponential ramp between values that are zero or of opposite sign
//!   holds the previous value until its end time, then jumps.
//!
//! Envelopes are therefore plain data: the voice pool schedules a whole
//! attack/decay/release shape up front and the renderer samples it.

/// One scheduled parameter change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue {
        /// Audio-clock time in seconds.
        time: f64,
        /// Target value.
        value: f32,
    },
    /// Linear ramp from the previous event, reaching `value` at `time`.
    LinearRamp {
        /// Audio-clock time in seconds.
        time: f64,
        /// Target value.
        value: f32,
    },
    /// Exponential ramp from the previous event, reaching `value` at `time`.
    ExponentialRamp {
        /// Audio-clock time in seconds.
        time: f64,
        /// Target value.
        value: f32,
    },
}

impl AutomationEvent {
    /// Time at which the event completes.
    pub fn time(&self) -> f64 {
        match *self {
            Self::SetValue { time, .. }
            | Self::LinearRamp { time, .. }
            | Self::ExponentialRamp { time, .. } => time,
        }
    }

    /// Value reached at [`AutomationEvent::time`].
    pub fn value(&self) -> f32 {
        match *self {
            Self::SetValue { value, .. }
            | Self::LinearRamp { value, .. }
            | Self::ExponentialRamp { value, .. } => value,
        }
    }
}

/// Ordered automation events for one parameter.
#[derive(Debug, Clone)]
pub struct AutomationTimeline {
    /// State before the first event: last pruned event, or the initial value.
    anchor_time: f64,
    anchor_value: f32,
    events: Vec<AutomationEvent>,
}

impl AutomationTimeline {
    /// Timeline that holds `value` until something is scheduled.
    pub fn new(value: f32) -> Self {
        Self {
            anchor_time: 0.0,
            anchor_value: value,
            events: Vec::new(),
        }
    }

    /// Inserts an event, after any events already scheduled for the same time.
    pub fn push(&mut self, event: AutomationEvent) {
        let at = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
    }

    /// Removes every event scheduled at or after `from`.
    pub fn cancel_scheduled_values(&mut self, from: f64) {
        let keep = self.events.partition_point(|e| e.time() < from);
        self.events.truncate(keep);
    }

    /// Value at time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_time = self.anchor_time;
        let mut prev_value = self.anchor_value;

        for event in &self.events {
            let (end_time, end_value) = (event.time(), event.value());
            if end_time <= t {
                prev_time = end_time;
                prev_value = end_value;
                continue;
            }
            let span = end_time - prev_time;
            if span <= 0.0 || t < prev_time {
                return prev_value;
            }
            let progress = (t - prev_time) / span;
            return match event {
                AutomationEvent::SetValue { .. } => prev_value,
                AutomationEvent::LinearRamp { .. } => {
                    prev_value + (end_value - prev_value) * progress as f32
                }
                AutomationEvent::ExponentialRamp { .. } => {
                    if prev_value == 0.0 || end_value == 0.0 || (prev_value > 0.0) != (end_value > 0.0) {
                        prev_value
                    } else {
                        let ratio = f64::from(end_value) / f64::from(prev_value);
                        (f64::from(prev_value) * ratio.powf(progress)) as f32
                    }
                }
            };
        }
        prev_value
    }

    /// Drops events that can no longer affect values at or after `t`.
    pub fn prune_before(&mut self, t: f64) {
        let done = self.events.partition_point(|e| e.time() <= t);
        if let Some(last) = done.checked_sub(1).map(|i| self.events[i]) {
            self.anchor_time = last.time();
            self.anchor_value = last.value();
            self.events.drain(..done);
        }
    }

    /// Scheduled events, in time order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }
}

impl Default for AutomationTimeline {
    fn default() -> Self {
        Self::new(0.0)
    }
}
