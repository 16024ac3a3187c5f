// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Timestamped gain automation.
//!
//! A voice's gain is described as a timeline of events against the render clock.
//! The control plane keeps one copy for introspection and sends every operation to
//! the render side, which applies the same operation to its own copy. Once an event
//! is scheduled it can only be superseded by a later operation, never recalled.

/// A single scheduled automation event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue { time: f64, value: f32 },
    /// Ramp linearly from the previous event to reach `value` at `time`.
    LinearRamp { time: f64, value: f32 },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match self {
            AutomationEvent::SetValue { time, .. } | AutomationEvent::LinearRamp { time, .. } => {
                *time
            }
        }
    }

    pub fn value(&self) -> f32 {
        match self {
            AutomationEvent::SetValue { value, .. }
            | AutomationEvent::LinearRamp { value, .. } => *value,
        }
    }
}

/// An operation on a gain timeline, sent from the control plane to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainOp {
    SetValueAt { value: f32, time: f64 },
    LinearRampTo { value: f32, time: f64 },
    /// Freeze the current trajectory at `time` and drop everything scheduled after it.
    CancelAndHold { time: f64 },
}

/// A gain timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GainAutomation {
    /// Value before the first event.
    initial: f32,
    /// Events sorted by time; equal times keep insertion order.
    events: Vec<AutomationEvent>,
}

impl GainAutomation {
    /// Creates a timeline holding `initial` until the first event.
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    /// Returns the scheduled events.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Applies an operation.
    pub fn apply(&mut self, op: GainOp) {
        match op {
            GainOp::SetValueAt { value, time } => self.set_value_at_time(value, time),
            GainOp::LinearRampTo { value, time } => self.linear_ramp_to_value_at_time(value, time),
            GainOp::CancelAndHold { time } => self.cancel_and_hold_at_time(time),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::SetValue { time, value });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::LinearRamp { time, value });
    }

    /// Removes every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Holds whatever value the timeline has at `time` and removes later events.
    pub fn cancel_and_hold_at_time(&mut self, time: f64) {
        let held = self.value_at(time);
        self.cancel_scheduled_values(time);
        self.set_value_at_time(held, time);
    }

    /// Returns the value of the last scheduled event, or the initial value.
    pub fn final_value(&self) -> f32 {
        self.events.last().map(|e| e.value()).unwrap_or(self.initial)
    }

    /// Evaluates the timeline at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut prev_time: Option<f64> = None;
        let mut prev_value = self.initial;

        for event in &self.events {
            match *event {
                AutomationEvent::SetValue { time: t, value } => {
                    if t > time {
                        return prev_value;
                    }
                    prev_time = Some(t);
                    prev_value = value;
                }
                AutomationEvent::LinearRamp { time: t, value } => {
                    if t > time {
                        let start = prev_time.unwrap_or(0.0);
                        let span = t - start;
                        if span <= 0.0 {
                            return value;
                        }
                        let frac = ((time - start) / span).clamp(0.0, 1.0) as f32;
                        return prev_value + (value - prev_value) * frac;
                    }
                    prev_time = Some(t);
                    prev_value = value;
                }
            }
        }

        prev_value
    }

    /// Drops events that are fully in the past, folding them into the initial value.
    /// Keeps the timeline short for long-lived voices on the render side.
    pub fn prune_before(&mut self, time: f64) {
        // The last past event anchors any following ramp, so it has to stay.
        let past = self.events.iter().take_while(|e| e.time() <= time).count();
        if past > 1 {
            let drop = past - 1;
            self.initial = self.events[drop - 1].value();
            self.events.drain(..drop);
        }
    }

    fn insert(&mut self, event: AutomationEvent) {
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_ramp() {
        let mut gain = GainAutomation::new(0.0);
        gain.set_value_at_time(0.0, 1.0);
        gain.linear_ramp_to_value_at_time(0.8, 1.5);

        assert_eq!(gain.value_at(0.5), 0.0);
        assert_eq!(gain.value_at(1.0), 0.0);
        assert!((gain.value_at(1.25) - 0.4).abs() < 1e-6);
        assert_eq!(gain.value_at(1.5), 0.8);
        assert_eq!(gain.value_at(10.0), 0.8);
    }

    #[test]
    fn test_cancel_and_hold_mid_ramp() {
        let mut gain = GainAutomation::new(0.0);
        gain.set_value_at_time(0.0, 0.0);
        gain.linear_ramp_to_value_at_time(1.0, 1.0);

        gain.cancel_and_hold_at_time(0.5);
        gain.linear_ramp_to_value_at_time(0.0, 1.5);

        assert!((gain.value_at(0.5) - 0.5).abs() < 1e-6);
        assert!((gain.value_at(1.0) - 0.25).abs() < 1e-6);
        assert_eq!(gain.value_at(1.5), 0.0);
        assert_eq!(gain.events().len(), 3);
    }

    #[test]
    fn test_ops_match_direct_calls() {
        let mut direct = GainAutomation::new(0.0);
        direct.set_value_at_time(0.0, 0.1);
        direct.linear_ramp_to_value_at_time(1.0, 0.2);
        direct.cancel_and_hold_at_time(0.15);

        let mut applied = GainAutomation::new(0.0);
        for op in [
            GainOp::SetValueAt {
                value: 0.0,
                time: 0.1,
            },
            GainOp::LinearRampTo {
                value: 1.0,
                time: 0.2,
            },
            GainOp::CancelAndHold { time: 0.15 },
        ] {
            applied.apply(op);
        }

        assert_eq!(direct, applied);
    }

    #[test]
    fn test_prune_keeps_anchor() {
        let mut gain = GainAutomation::new(0.0);
        gain.set_value_at_time(0.0, 0.0);
        gain.linear_ramp_to_value_at_time(1.0, 1.0);
        gain.set_value_at_time(0.5, 2.0);
        gain.linear_ramp_to_value_at_time(0.0, 3.0);

        let before = gain.value_at(2.5);
        gain.prune_before(2.2);
        assert_eq!(gain.events().len(), 2);
        assert!((gain.value_at(2.5) - before).abs() < 1e-6);
    }
}
