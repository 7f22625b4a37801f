/// Feature Extractor (C3) - per-signal sliding-window rate/delta/jitter.
///
/// Grounded on `feature_extractor.py`: a ring of `(timestamp, value)`
/// pairs per signal name, trimmed to a trailing time window on every
/// insert. `frequency`/`delta`/`jitter` are computed exactly as the
/// Python source does, including its `jitter = 0` fallback below 3
/// samples and its `frequency = count / window_size` (not an actual
/// rate over elapsed time - kept intentionally, see spec §4.3).
use std::collections::{HashMap, VecDeque};

use crate::contracts::SignalKind;

/// Extracted per-signal features over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalFeatures {
    pub frequency: f64,
    pub delta: f64,
    pub jitter: f64,
}

pub struct FeatureExtractor {
    window_seconds: f64,
    history: HashMap<SignalKind, VecDeque<(f64, f64)>>,
}

impl FeatureExtractor {
    pub fn new(window_seconds: f64) -> Self {
        Self {
            window_seconds,
            history: HashMap::new(),
        }
    }

    /// Record a sample and evict anything older than the trailing window.
    pub fn add_sample(&mut self, kind: SignalKind, timestamp: f64, value: f64) {
        let buffer = self.history.entry(kind).or_default();
        buffer.push_back((timestamp, value));

        let cutoff = timestamp - self.window_seconds;
        while matches!(buffer.front(), Some((ts, _)) if *ts < cutoff) {
            buffer.pop_front();
        }
    }

    /// Extract features for `kind`. `None` if fewer than 2 samples are
    /// in the window (spec §4.3 - matches the Python source's guard).
    pub fn extract(&self, kind: SignalKind) -> Option<SignalFeatures> {
        let buffer = self.history.get(&kind)?;
        if buffer.len() < 2 {
            return None;
        }

        let timestamps: Vec<f64> = buffer.iter().map(|(ts, _)| *ts).collect();
        let values: Vec<f64> = buffer.iter().map(|(_, v)| *v).collect();

        let frequency = buffer.len() as f64 / self.window_seconds;
        let delta = (values.last().unwrap() - values.first().unwrap()).abs();

        let jitter = if timestamps.len() > 2 {
            let intervals: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
            let expected_interval = self.window_seconds / buffer.len() as f64;
            if expected_interval > 0.0 {
                std_dev(&intervals) / expected_interval
            } else {
                0.0
            }
        } else {
            0.0
        };

        Some(SignalFeatures {
            frequency,
            delta,
            jitter,
        })
    }

    /// Extract features for every signal kind with at least 2 samples.
    pub fn extract_all(&self) -> HashMap<SignalKind, SignalFeatures> {
        SignalKind::ALL
            .iter()
            .filter_map(|&kind| self.extract(kind).map(|f| (kind, f)))
            .collect()
    }
}

fn std_dev(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_two_samples_yields_no_features() {
        let mut extractor = FeatureExtractor::new(1.0);
        extractor.add_sample(SignalKind::Speed, 0.0, 30.0);
        assert!(extractor.extract(SignalKind::Speed).is_none());
    }

    #[test]
    fn delta_is_absolute_first_to_last_change() {
        let mut extractor = FeatureExtractor::new(1.0);
        extractor.add_sample(SignalKind::Speed, 0.0, 30.0);
        extractor.add_sample(SignalKind::Speed, 0.1, 45.0);
        let features = extractor.extract(SignalKind::Speed).unwrap();
        assert!((features.delta - 15.0).abs() < 1e-9);
    }

    #[test]
    fn samples_outside_window_are_evicted() {
        let mut extractor = FeatureExtractor::new(1.0);
        extractor.add_sample(SignalKind::Speed, 0.0, 30.0);
        extractor.add_sample(SignalKind::Speed, 0.5, 31.0);
        extractor.add_sample(SignalKind::Speed, 2.0, 32.0);
        let features = extractor.extract(SignalKind::Speed).unwrap();
        // only the sample at t=0.5 and t=2.0 remain; t=0.0 fell outside [1.0, 2.0]
        assert!((features.delta - 1.0).abs() < 1e-9);
    }

    #[test]
    fn jitter_is_zero_with_two_or_fewer_samples() {
        let mut extractor = FeatureExtractor::new(1.0);
        extractor.add_sample(SignalKind::Brake, 0.0, 0.0);
        extractor.add_sample(SignalKind::Brake, 0.1, 5.0);
        let features = extractor.extract(SignalKind::Brake).unwrap();
        assert_eq!(features.jitter, 0.0);
    }

    #[test]
    fn jitter_reflects_interval_irregularity() {
        let mut extractor = FeatureExtractor::new(1.0);
        for (ts, value) in [(0.0, 0.0), (0.1, 1.0), (0.3, 2.0), (0.35, 3.0)] {
            extractor.add_sample(SignalKind::Steering, ts, value);
        }
        let features = extractor.extract(SignalKind::Steering).unwrap();
        assert!(features.jitter > 0.0);
    }

    #[test]
    fn extract_all_only_reports_signals_with_enough_samples() {
        let mut extractor = FeatureExtractor::new(1.0);
        extractor.add_sample(SignalKind::Speed, 0.0, 30.0);
        extractor.add_sample(SignalKind::Speed, 0.1, 31.0);
        extractor.add_sample(SignalKind::Brake, 0.0, 0.0);
        let all = extractor.extract_all();
        assert!(all.contains_key(&SignalKind::Speed));
        assert!(!all.contains_key(&SignalKind::Brake));
    }
}
