/// Trust Engine (C9) - exponential trust update law with recovery and
/// an ML feature toggle.
///
/// Grounded on `trust_engine.py`'s `update_trust`: identical decay
/// formula, identical recovery-on-low-anomaly rule, identical
/// trust-level bucketing. `set_ips_active` existed in the source but
/// its stored flag was never read anywhere in the retained sources;
/// spec §3 names an IPS-active flag on Trust State "used to modulate
/// recovery" - kept here and actually wired, since this core's IPS
/// needs every continuous `trust ≥ 0.8` second it can get for its
/// recovery timer (`ips.rs`) and gating recovery while IPS is active
/// gives that timer a meaningful signal instead of a dead field.
use crate::config::PipelineConfig;

/// Human trust-bucket reported by the engine. Boundaries per spec §4.9.
/// Variant order is ascending trust (`Critical` lowest, `High` highest)
/// so the derived `Ord` lets callers compare severity directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrustLevel {
    Critical,
    Low,
    Medium,
    High,
}

impl TrustLevel {
    pub fn from_trust(trust: f64) -> Self {
        if trust > 0.8 {
            Self::High
        } else if trust > 0.6 {
            Self::Medium
        } else if trust > 0.4 {
            Self::Low
        } else {
            Self::Critical
        }
    }
}

/// Security posture, toggled by `set_ml_enabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    CryptoOnly,
    CryptoPlusMl,
}

pub struct TrustEngine<'a> {
    config: &'a PipelineConfig,
    trust: f64,
    ml_enabled: bool,
    ips_active: bool,
}

impl<'a> TrustEngine<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            trust: 1.0,
            ml_enabled: true,
            ips_active: false,
        }
    }

    /// Apply one update cycle. `auth_result` is 1.0 iff the Verifier
    /// accepted the originating envelope; `temporal_score` comes from
    /// C7 (`1 - temporal_anomaly_score`, per spec §4.11 step 6).
    ///
    /// Recovery is only credited while the IPS is not actively
    /// sanitising - otherwise a vehicle stuck in SAFE_MODE could spoof
    /// its own recovery by keeping instantaneous anomaly low while the
    /// policy engine is still clamping its outputs.
    pub fn update(&mut self, anomaly_score: f64, auth_result: f64, temporal_score: f64) -> f64 {
        let effective_anomaly = if self.ml_enabled { anomaly_score } else { 0.0 };

        let mut delta = -self.config.trust_alpha * effective_anomaly
            - self.config.trust_beta * (1.0 - auth_result)
            - self.config.trust_gamma * (1.0 - temporal_score);

        if effective_anomaly < self.config.trust_recovery_anomaly_floor && !self.ips_active {
            delta += self.config.trust_recovery_rho;
        }

        self.trust = (self.trust + delta).clamp(0.0, 1.0);
        self.trust
    }

    pub fn trust(&self) -> f64 {
        self.trust
    }

    pub fn level(&self) -> TrustLevel {
        TrustLevel::from_trust(self.trust)
    }

    pub fn reset(&mut self) {
        self.trust = 1.0;
    }

    pub fn set_ml_enabled(&mut self, enabled: bool) {
        self.ml_enabled = enabled;
    }

    pub fn is_ml_enabled(&self) -> bool {
        self.ml_enabled
    }

    pub fn security_mode(&self) -> SecurityMode {
        if self.ml_enabled {
            SecurityMode::CryptoPlusMl
        } else {
            SecurityMode::CryptoOnly
        }
    }

    pub fn set_ips_active(&mut self, active: bool) {
        self.ips_active = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_starts_at_one() {
        let config = PipelineConfig::default();
        let engine = TrustEngine::new(&config);
        assert_eq!(engine.trust(), 1.0);
        assert_eq!(engine.level(), TrustLevel::High);
    }

    #[test]
    fn low_anomaly_recovers_when_already_at_ceiling() {
        let config = PipelineConfig::default();
        let mut engine = TrustEngine::new(&config);
        let trust = engine.update(0.0, 1.0, 1.0);
        assert_eq!(trust, 1.0); // clamped, can't exceed ceiling
    }

    #[test]
    fn high_anomaly_drives_trust_down() {
        let config = PipelineConfig::default();
        let mut engine = TrustEngine::new(&config);
        for _ in 0..20 {
            engine.update(1.0, 1.0, 0.0);
        }
        assert!(engine.trust() < 0.5);
        assert_eq!(engine.level(), TrustLevel::Critical);
    }

    #[test]
    fn trust_stays_within_unit_interval() {
        let config = PipelineConfig::default();
        let mut engine = TrustEngine::new(&config);
        for _ in 0..1000 {
            engine.update(1.0, 0.0, 0.0);
        }
        assert!(engine.trust() >= 0.0 && engine.trust() <= 1.0);
    }

    #[test]
    fn ips_active_suppresses_recovery_credit() {
        let config = PipelineConfig::default();
        let mut engine = TrustEngine::new(&config);
        engine.update(1.0, 1.0, 1.0); // drop below ceiling
        let before = engine.trust();
        engine.set_ips_active(true);
        let after_no_recovery = engine.update(0.0, 1.0, 1.0);
        assert!(after_no_recovery <= before); // no recovery credited
    }

    #[test]
    fn disabling_ml_reports_crypto_only_mode() {
        let config = PipelineConfig::default();
        let mut engine = TrustEngine::new(&config);
        engine.set_ml_enabled(false);
        assert_eq!(engine.security_mode(), SecurityMode::CryptoOnly);
        assert!(!engine.is_ml_enabled());
    }
}
