/// Behavioural Analyser (C4) - per-sender control-energy, jerk, and
/// oscillation features.
///
/// No direct Python source survived the distillation for this
/// component (spec §4.4's `enhanced_behavioral_analyzer.py` was
/// filtered out of the retained original sources); the ring-buffer
/// shape and formulas below follow the spec's definitions directly,
/// built in the same per-sender bounded-window style as `feature_extractor.rs`
/// and `contextual.rs`.
use std::collections::{HashMap, VecDeque};

/// One `(timestamp, steering, speed, brake)` observation for a sender.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ControlSample {
    timestamp: f64,
    steering: f64,
    speed: f64,
    brake: f64,
}

/// Derived behavioural features over a sender's trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorFeatures {
    pub steering_energy: f64,
    pub steering_jerk: f64,
    pub oscillation_rate: f64,
    pub control_aggression: f64,
}

pub struct BehaviorAnalyser {
    window_len: usize,
    per_sender: HashMap<String, VecDeque<ControlSample>>,
}

impl BehaviorAnalyser {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len,
            per_sender: HashMap::new(),
        }
    }

    /// Record a control tuple for `sender`, evicting the oldest entry
    /// once the window length is exceeded.
    pub fn observe(&mut self, sender: &str, timestamp: f64, steering: f64, speed: f64, brake: f64) {
        let buffer = self
            .per_sender
            .entry(sender.to_string())
            .or_insert_with(VecDeque::new);
        buffer.push_back(ControlSample {
            timestamp,
            steering,
            speed,
            brake,
        });
        while buffer.len() > self.window_len {
            buffer.pop_front();
        }
    }

    /// Derive behavioural features for `sender`. `None` until at least
    /// 3 samples are accumulated (a second difference needs two deltas).
    pub fn features(&self, sender: &str) -> Option<BehaviorFeatures> {
        let buffer = self.per_sender.get(sender)?;
        if buffer.len() < 3 {
            return None;
        }

        let steering: Vec<f64> = buffer.iter().map(|s| s.steering).collect();
        let timestamps: Vec<f64> = buffer.iter().map(|s| s.timestamp).collect();

        let steering_energy = steering.iter().map(|s| s * s).sum::<f64>() / steering.len() as f64;

        let first_diffs: Vec<f64> = steering.windows(2).map(|w| w[1] - w[0]).collect();
        let second_diffs: Vec<f64> = first_diffs.windows(2).map(|w| w[1] - w[0]).collect();
        let steering_jerk = if second_diffs.is_empty() {
            0.0
        } else {
            second_diffs.iter().map(|d| d.abs()).sum::<f64>() / second_diffs.len() as f64
        };

        let sign_changes = first_diffs
            .windows(2)
            .filter(|w| w[0].signum() != 0.0 && w[1].signum() != 0.0 && w[0].signum() != w[1].signum())
            .count();
        let duration = (timestamps.last().unwrap() - timestamps.first().unwrap()).max(f64::EPSILON);
        let oscillation_rate = sign_changes as f64 / duration;

        let control_aggression = steering
            .windows(2)
            .zip(timestamps.windows(2))
            .map(|(sw, tw)| {
                let dt = (tw[1] - tw[0]).max(f64::EPSILON);
                (sw[1] - sw[0]).abs() / dt
            })
            .fold(0.0_f64, f64::max);

        Some(BehaviorFeatures {
            steering_energy,
            steering_jerk,
            oscillation_rate,
            control_aggression,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_three_samples_yields_no_features() {
        let mut analyser = BehaviorAnalyser::new(20);
        analyser.observe("ecu-1", 0.0, 0.0, 30.0, 0.0);
        analyser.observe("ecu-1", 0.1, 1.0, 30.0, 0.0);
        assert!(analyser.features("ecu-1").is_none());
    }

    #[test]
    fn steady_steering_has_zero_energy_and_jerk() {
        let mut analyser = BehaviorAnalyser::new(20);
        for i in 0..5 {
            analyser.observe("ecu-1", i as f64 * 0.1, 0.0, 30.0, 0.0);
        }
        let features = analyser.features("ecu-1").unwrap();
        assert_eq!(features.steering_energy, 0.0);
        assert_eq!(features.steering_jerk, 0.0);
        assert_eq!(features.oscillation_rate, 0.0);
    }

    #[test]
    fn oscillating_steering_produces_sign_changes() {
        let mut analyser = BehaviorAnalyser::new(20);
        let values = [0.0, 20.0, -20.0, 20.0, -20.0, 20.0];
        for (i, value) in values.iter().enumerate() {
            analyser.observe("ecu-1", i as f64 * 0.1, *value, 70.0, 0.0);
        }
        let features = analyser.features("ecu-1").unwrap();
        assert!(features.oscillation_rate > 0.0);
        assert!(features.steering_energy > 0.0);
    }

    #[test]
    fn window_caps_at_configured_length() {
        let mut analyser = BehaviorAnalyser::new(3);
        for i in 0..10 {
            analyser.observe("ecu-1", i as f64 * 0.1, i as f64, 30.0, 0.0);
        }
        assert_eq!(analyser.per_sender.get("ecu-1").unwrap().len(), 3);
    }

    #[test]
    fn control_aggression_reflects_largest_rate_of_change() {
        let mut analyser = BehaviorAnalyser::new(20);
        analyser.observe("ecu-1", 0.0, 0.0, 30.0, 0.0);
        analyser.observe("ecu-1", 0.1, 1.0, 30.0, 0.0);
        analyser.observe("ecu-1", 0.2, 10.0, 30.0, 0.0);
        let features = analyser.features("ecu-1").unwrap();
        assert!((features.control_aggression - 90.0).abs() < 1e-9);
    }
}
