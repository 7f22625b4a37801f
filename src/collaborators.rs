/// Collaborator shims (§6) - storage/alert/V2V interfaces consumed by
/// the listener, explicitly out of scope as full implementations
/// (spec §1: "the persistent analytics sink, the event-bus
/// producer/consumer for fleet telemetry"). Narrow traits plus a
/// `tracing`-backed default implementation stand in for the
/// `self.storage`/`self.v2v_alerts` call sites in `can_listener.py`
/// (`log_security_alert`/`log_trust_update`, `should_publish_alert`/
/// `publish_v2v_alert`) - the modules those objects come from aren't
/// themselves in this pack, only their call sites and `trust_engine.py`'s
/// matching `get_storage_manager()` import.
///
/// All collaborator I/O is fire-and-forget (spec §5, §7): failures are
/// swallowed at the call site, never propagated into the listener loop.
use crate::trust::TrustLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Bucket an anomaly score into a severity, per the thresholds
    /// `can_listener.py` uses when logging security alerts.
    pub fn from_anomaly_score(score: f64) -> Self {
        if score > 0.7 {
            Self::High
        } else if score > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Non-blocking, best-effort telemetry sink. Grounded on the
/// `self.storage` surface `can_listener.py` and `trust_engine.py` both
/// import via `get_storage_manager()`.
pub trait AlertSink {
    fn log_security_alert(
        &mut self,
        vehicle_id: &str,
        kind: &str,
        severity: Severity,
        detail: &str,
    );
    fn log_trust_update(&mut self, vehicle_id: &str, trust: f64, ml_enabled: bool, anomaly: f64);
    fn log_attack_event(&mut self, vehicle_id: &str, threat_type: &str, confidence: f64);
}

/// Logs through `tracing` at a level matched to severity. This is the
/// pipeline's only default `AlertSink`; a test harness may substitute
/// a recording double to assert on emitted events.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn log_security_alert(&mut self, vehicle_id: &str, kind: &str, severity: Severity, detail: &str) {
        match severity {
            Severity::Critical | Severity::High => {
                tracing::warn!(vehicle_id, kind, ?severity, detail, "security alert");
            }
            Severity::Medium | Severity::Low => {
                tracing::info!(vehicle_id, kind, ?severity, detail, "security alert");
            }
        }
    }

    fn log_trust_update(&mut self, vehicle_id: &str, trust: f64, ml_enabled: bool, anomaly: f64) {
        tracing::debug!(vehicle_id, trust, ml_enabled, anomaly, "trust update");
    }

    fn log_attack_event(&mut self, vehicle_id: &str, threat_type: &str, confidence: f64) {
        tracing::warn!(vehicle_id, threat_type, confidence, "attack event");
    }
}

/// V2V alert fan-out (§6). Grounded on `can_listener.py`'s
/// `self.v2v_alerts.should_publish_alert`/`publish_v2v_alert` call sites:
/// publish only once IPS
/// has engaged or trust has dropped into LOW/CRITICAL, and cap
/// confidence at 0.95 regardless of how severe the anomaly reads.
pub trait V2vPublisher {
    fn should_publish(&self, trust: f64, ips_active: bool) -> bool;
    fn publish(&mut self, trust: f64, threat_type: &str, confidence: f64);
}

#[derive(Debug, Default)]
pub struct TracingV2vPublisher;

impl V2vPublisher for TracingV2vPublisher {
    fn should_publish(&self, trust: f64, ips_active: bool) -> bool {
        ips_active || TrustLevel::from_trust(trust) <= TrustLevel::Low
    }

    fn publish(&mut self, trust: f64, threat_type: &str, confidence: f64) {
        let capped = confidence.min(0.95);
        tracing::warn!(trust, threat_type, confidence = capped, "v2v alert published");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_buckets_match_source_thresholds() {
        assert_eq!(Severity::from_anomaly_score(0.9), Severity::High);
        assert_eq!(Severity::from_anomaly_score(0.6), Severity::Medium);
        assert_eq!(Severity::from_anomaly_score(0.1), Severity::Low);
    }

    #[test]
    fn v2v_publishes_when_ips_active_even_at_high_trust() {
        let publisher = TracingV2vPublisher;
        assert!(publisher.should_publish(0.95, true));
    }

    #[test]
    fn v2v_publishes_when_trust_drops_without_ips() {
        let publisher = TracingV2vPublisher;
        assert!(publisher.should_publish(0.3, false));
        assert!(!publisher.should_publish(0.95, false));
    }
}
