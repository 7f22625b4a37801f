/// Temporal Extractor (C7) - rate-of-change anomalies between
/// commanded and observed signals.
///
/// Spec §4.7 leaves the internal model unspecified beyond its
/// input/output contract ("implementers may choose any monotone
/// anomaly function of commanded-vs-observed rate divergence provided
/// it satisfies the scenario thresholds" - §9 Open Questions). This
/// tracks, per sender, the rate of change of a commanded value against
/// the rate of change of what was actually observed on the bus, and
/// turns their relative divergence into a bounded `[0, 1]` score: zero
/// when the two rates track each other, rising monotonically as they
/// diverge, saturating at 1.0 for large divergence. Built in the same
/// per-sender ring style as `behavior.rs` and `contextual.rs`.
use std::collections::HashMap;

/// Outcome of `TemporalExtractor::update`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalResult {
    pub anomaly_score: f64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct LastObservation {
    timestamp: f64,
    commanded: f64,
    observed: f64,
}

pub struct TemporalExtractor {
    per_sender: HashMap<String, LastObservation>,
}

impl TemporalExtractor {
    pub fn new() -> Self {
        Self {
            per_sender: HashMap::new(),
        }
    }

    /// Update the sender's commanded/observed pair and emit a temporal
    /// anomaly score. `commanded` and `observed` are the same physical
    /// signal sampled from two vantage points (e.g. the last issued
    /// setpoint vs. what the bus actually carried); on the first
    /// observation for a sender there is no rate to compare, so the
    /// score is 0.
    pub fn update(&mut self, sender: &str, timestamp: f64, commanded: f64, observed: f64) -> TemporalResult {
        let previous = self.per_sender.insert(
            sender.to_string(),
            LastObservation {
                timestamp,
                commanded,
                observed,
            },
        );

        let Some(previous) = previous else {
            return TemporalResult {
                anomaly_score: 0.0,
                tags: Vec::new(),
            };
        };

        let dt = (timestamp - previous.timestamp).max(f64::EPSILON);
        let commanded_rate = (commanded - previous.commanded) / dt;
        let observed_rate = (observed - previous.observed) / dt;
        let divergence = (commanded_rate - observed_rate).abs();

        // Monotone saturating map: divergence of 0 -> 0, large
        // divergence asymptotically approaches 1. Scale chosen so a
        // divergence of ~20 units/s already reads as near-saturated,
        // matching the physics validator's steering-rate scale.
        let anomaly_score = 1.0 - (-divergence / 10.0).exp();

        let mut tags = Vec::new();
        if anomaly_score > 0.5 {
            tags.push(format!(
                "rate_divergence: commanded={commanded_rate:.1}/s observed={observed_rate:.1}/s"
            ));
        }

        TemporalResult {
            anomaly_score,
            tags,
        }
    }
}

impl Default for TemporalExtractor {
    fn default() -> Self {
        Self::new()
    }
}
