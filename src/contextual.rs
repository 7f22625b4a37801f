/// Contextual Validator (C5) - cross-signal physical-consistency
/// violation scoring.
///
/// Grounded on `contextual_validator.py`'s `validate_context`: the same
/// five weighted rules evaluated against a bounded per-sender window,
/// in the same order, with the same thresholds and weights (spec §4.5).
use std::collections::{HashMap, VecDeque};

const STEER_HIGH_AT_SPEED_DEG: f64 = 15.0;
const MAX_STEER_RATE_DEG_PER_S: f64 = 30.0;
const MAX_OSCILLATION_RATE: f64 = 3.0;
const BRAKE_STEER_THRESHOLD_DEG: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct VehicleState {
    timestamp: f64,
    speed: f64,
    steering: f64,
    brake: f64,
}

/// Outcome of `ContextualValidator::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextualResult {
    pub score: f64,
    pub reasons: Vec<String>,
}

pub struct ContextualValidator {
    window_len: usize,
    per_sender: HashMap<String, VecDeque<VehicleState>>,
}

impl ContextualValidator {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len,
            per_sender: HashMap::new(),
        }
    }

    pub fn observe(&mut self, sender: &str, timestamp: f64, speed: f64, steering: f64, brake: f64) {
        let buffer = self
            .per_sender
            .entry(sender.to_string())
            .or_insert_with(VecDeque::new);
        buffer.push_back(VehicleState {
            timestamp,
            speed,
            steering,
            brake,
        });
        while buffer.len() > self.window_len {
            buffer.pop_front();
        }
    }

    /// Evaluate the five weighted rules against `sender`'s window.
    /// Returns a zero score with no reasons if fewer than 3 samples
    /// have been observed (mirrors the Python source's guard).
    pub fn validate(&self, sender: &str) -> ContextualResult {
        let Some(buffer) = self.per_sender.get(sender) else {
            return ContextualResult {
                score: 0.0,
                reasons: Vec::new(),
            };
        };
        if buffer.len() < 3 {
            return ContextualResult {
                score: 0.0,
                reasons: Vec::new(),
            };
        }

        let timestamps: Vec<f64> = buffer.iter().map(|s| s.timestamp).collect();
        let speeds: Vec<f64> = buffer.iter().map(|s| s.speed).collect();
        let steerings: Vec<f64> = buffer.iter().map(|s| s.steering).collect();
        let brakes: Vec<f64> = buffer.iter().map(|s| s.brake).collect();

        let mut score = 0.0;
        let mut reasons = Vec::new();

        let current_speed = *speeds.last().unwrap();
        let current_steering = *steerings.last().unwrap();

        // Rule 1: unsafe_physics.
        if steerings.len() >= 2 {
            let steering_delta = (steerings[steerings.len() - 1] - steerings[steerings.len() - 2]).abs();
            if current_speed > 60.0 && steering_delta > STEER_HIGH_AT_SPEED_DEG {
                reasons.push(format!(
                    "unsafe_physics: {steering_delta:.1}° at {current_speed:.1}km/h"
                ));
                score += 0.8;
            }
        }

        // Rule 2: control_hijack.
        if steerings.len() >= 5 {
            let tail = &steerings[steerings.len() - 5..];
            let changes: Vec<f64> = tail.windows(2).map(|w| w[1] - w[0]).collect();
            let sign_flips = changes
                .windows(2)
                .filter(|w| w[0].signum() != w[1].signum())
                .count();
            let time_span = timestamps[timestamps.len() - 1] - timestamps[timestamps.len() - 5];
            if time_span > 0.0 {
                let oscillation_rate = sign_flips as f64 / time_span;
                if oscillation_rate > MAX_OSCILLATION_RATE {
                    reasons.push(format!("control_hijack: {oscillation_rate:.1} flips/sec"));
                    score += 0.7;
                }
            }
        }

        // Rule 3: signal_injection.
        if speeds.len() >= 5 && steerings.len() >= 5 {
            let steering_variance = variance(&steerings[steerings.len() - 5..]);
            let speed_variance = variance(&speeds[speeds.len() - 5..]);
            if steering_variance > 25.0 && speed_variance < 1.0 {
                reasons.push(format!(
                    "signal_injection: steering_var={steering_variance:.1}, speed_var={speed_variance:.1}"
                ));
                score += 0.6;
            }
        }

        // Rule 4: context_mismatch.
        let current_brake = *brakes.last().unwrap();
        if current_brake > 50.0 && current_steering.abs() > BRAKE_STEER_THRESHOLD_DEG {
            reasons.push(format!(
                "context_mismatch: {current_steering:.1}° while braking {current_brake:.1}%"
            ));
            score += 0.5;
        }

        // Rule 5: excessive_rate.
        if steerings.len() >= 2 && timestamps.len() >= 2 {
            let time_delta = timestamps[timestamps.len() - 1] - timestamps[timestamps.len() - 2];
            if time_delta > 0.0 {
                let steering_rate =
                    (steerings[steerings.len() - 1] - steerings[steerings.len() - 2]).abs() / time_delta;
                if steering_rate > MAX_STEER_RATE_DEG_PER_S {
                    reasons.push(format!("excessive_rate: {steering_rate:.1}°/sec"));
                    score += 0.4;
                }
            }
        }

        ContextualResult {
            score: score.min(1.0),
            reasons,
        }
    }
}

fn variance(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
