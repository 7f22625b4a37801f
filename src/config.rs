/// Pipeline configuration - every tunable spec.md pins as a literal,
/// collected into one struct per the Design Notes (§9): "Composite
/// scoring constants should be configuration values, not embedded
/// literals, to permit regression testing."
///
/// Follows the teacher's `TransmitterBuilder`/`ReceiverBuilder` fluent
/// pattern: a `Default` impl reproducing spec.md's numbers exactly, plus
/// `with_*` setters for tests that need to probe edge cases.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    // --- Verifier (§4.2) ---
    pub replay_gap_threshold: u64,
    pub timestamp_window_ms: u64,
    /// Open Question (§9): accept unsigned/unmatched frames as verified.
    /// Defaults to `false` (reject), per spec.md's explicit instruction.
    pub accept_unsigned: bool,

    // --- Feature Extractor (§4.3) ---
    pub feature_window_seconds: f64,

    // --- Behavioural Analyser (§4.4) ---
    pub behavior_window_len: usize,

    // --- Contextual Validator (§4.5) ---
    pub contextual_window_len: usize,

    // --- Physics Validator (§4.6) ---
    pub max_acceleration_mps2: f64,
    pub max_deceleration_mps2: f64,
    pub max_speed_delta_per_cycle_kmh: f64,
    pub max_speed_delta_cycle_seconds: f64,
    pub max_steering_rate_deg_per_s: f64,

    // --- Anomaly Detector (§4.8) ---
    pub training_min_samples: usize,
    pub training_threshold: usize,
    pub contamination: f64,

    // --- Trust Engine (§4.9) ---
    pub trust_alpha: f64,
    pub trust_beta: f64,
    pub trust_gamma: f64,
    pub trust_recovery_rho: f64,
    pub trust_recovery_anomaly_floor: f64,

    // --- IPS Policy Engine (§4.10) ---
    pub ips_recovery_seconds: f64,
    pub ips_off_threshold: f64,
    pub ips_soft_limit_threshold: f64,
    pub ips_safe_mode_threshold: f64,

    // --- Listener fusion weights (§4.11) ---
    pub control_energy_threshold: f64,
    pub control_jerk_threshold: f64,
    pub control_oscillation_threshold: f64,
    pub control_aggression_threshold: f64,
    pub physics_invalid_anomaly_floor: f64,
    pub alert_anomaly_threshold: f64,

    // --- Bus exchange (§5/§6) ---
    pub bus_exchange_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            replay_gap_threshold: 100,
            timestamp_window_ms: 5000,
            accept_unsigned: false,

            feature_window_seconds: 1.0,

            behavior_window_len: 20,

            contextual_window_len: 20,

            max_acceleration_mps2: 4.0,
            max_deceleration_mps2: 9.0,
            max_speed_delta_per_cycle_kmh: 5.0,
            max_speed_delta_cycle_seconds: 0.2,
            max_steering_rate_deg_per_s: 30.0,

            training_min_samples: 10,
            training_threshold: 25,
            contamination: 0.1,

            trust_alpha: 0.10,
            trust_beta: 0.20,
            trust_gamma: 0.05,
            trust_recovery_rho: 0.01,
            trust_recovery_anomaly_floor: 0.1,

            ips_recovery_seconds: 5.0,
            ips_off_threshold: 0.8,
            ips_soft_limit_threshold: 0.7,
            ips_safe_mode_threshold: 0.5,

            control_energy_threshold: 5.0,
            control_jerk_threshold: 3.0,
            control_oscillation_threshold: 1.0,
            control_aggression_threshold: 5.0,
            physics_invalid_anomaly_floor: 0.8,
            alert_anomaly_threshold: 0.3,

            bus_exchange_capacity: 10,
        }
    }
}

impl PipelineConfig {
    pub fn with_trust_params(mut self, alpha: f64, beta: f64, gamma: f64, rho: f64) -> Self {
        self.trust_alpha = alpha;
        self.trust_beta = beta;
        self.trust_gamma = gamma;
        self.trust_recovery_rho = rho;
        self
    }

    pub fn with_training_threshold(mut self, threshold: usize) -> Self {
        self.training_threshold = threshold;
        self
    }

    pub fn with_ips_recovery_seconds(mut self, seconds: f64) -> Self {
        self.ips_recovery_seconds = seconds;
        self
    }

    pub fn with_accept_unsigned(mut self, accept: bool) -> Self {
        self.accept_unsigned = accept;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.replay_gap_threshold, 100);
        assert_eq!(cfg.timestamp_window_ms, 5000);
        assert!(!cfg.accept_unsigned);
        assert_eq!(cfg.training_threshold, 25);
        assert_eq!(cfg.ips_recovery_seconds, 5.0);
    }

    #[test]
    fn builder_overrides_compose() {
        let cfg = PipelineConfig::default()
            .with_trust_params(0.2, 0.1, 0.05, 0.02)
            .with_training_threshold(50);
        assert_eq!(cfg.trust_alpha, 0.2);
        assert_eq!(cfg.training_threshold, 50);
    }
}
