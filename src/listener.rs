/// Listener/Coordinator (C11) - sequences verify → decode → features →
/// fusion → trust → IPS → sanitise → apply.
///
/// Grounded on `can_listener.py`'s `_process_message`: the same
/// verify-then-decode-then-score ordering, the same UI-controller
/// bypass, the same training-vs-detecting branch, and the same
/// fusion/trust/IPS/V2V sequencing (spec §4.11). Where the Python
/// source threaded MongoDB analytics and a message log through every
/// branch, this keeps only the collaborator shims spec §6 names
/// (`AlertSink`, `V2vPublisher`, `VehicleModel`) plus a bounded
/// 50-entry rejection ring (spec §7).
use std::collections::VecDeque;

use crate::anomaly::{feature_vector, AnomalyDetector};
use crate::behavior::BehaviorAnalyser;
use crate::codec::decode_frame;
use crate::collaborators::{AlertSink, Severity, V2vPublisher};
use crate::config::PipelineConfig;
use crate::contextual::ContextualValidator;
use crate::contracts::{SignalKind, SignedEnvelope};
use crate::errors::GuardianError;
use crate::feature_extractor::FeatureExtractor;
use crate::ips::IpsPolicyEngine;
use crate::keys::{is_ui_controller, DeviceKeyTable};
use crate::physics::PhysicsValidator;
use crate::temporal::TemporalExtractor;
use crate::trust::TrustEngine;
use crate::vehicle::VehicleModel;
use crate::verifier::Verifier;

const REJECTION_LOG_CAPACITY: usize = 50;

/// One entry in the bounded rejection ring (spec §7).
#[derive(Debug, Clone)]
pub struct RejectionEntry {
    pub device_id: String,
    pub frame_id: u16,
    pub reason: String,
}

/// Outcome of processing a single accepted frame, returned mainly for
/// tests and observability - the listener itself acts on it directly.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub kind: SignalKind,
    pub value: f64,
    pub final_anomaly: f64,
    pub trust: f64,
    pub ips_mode: crate::ips::IpsMode,
    pub physics_valid: bool,
}

/// Owns every piece of mutable pipeline state the spec assigns to the
/// Listener (§3: "the Listener exclusively owns mutable Trust, IPS,
/// Training Buffer, and the decoded signal history").
pub struct Listener<'a, V, A, P> {
    vehicle_id: String,
    config: &'a PipelineConfig,
    verifier: Verifier<'a>,
    feature_extractor: FeatureExtractor,
    behavior: BehaviorAnalyser,
    contextual: ContextualValidator,
    physics: PhysicsValidator<'a>,
    temporal: TemporalExtractor,
    anomaly: AnomalyDetector,
    trust: TrustEngine<'a>,
    ips: IpsPolicyEngine<'a>,
    vehicle: V,
    alerts: A,
    v2v: P,
    rejected_count: u64,
    verified_count: u64,
    rejection_log: VecDeque<RejectionEntry>,
    current_speed: f64,
    current_steering: f64,
    current_brake: f64,
}

impl<'a, V, A, P> Listener<'a, V, A, P>
where
    V: VehicleModel,
    A: AlertSink,
    P: V2vPublisher,
{
    pub fn new(
        vehicle_id: impl Into<String>,
        keys: &'a DeviceKeyTable,
        config: &'a PipelineConfig,
        vehicle: V,
        alerts: A,
        v2v: P,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            config,
            verifier: Verifier::new(keys, config),
            feature_extractor: FeatureExtractor::new(config.feature_window_seconds),
            behavior: BehaviorAnalyser::new(config.behavior_window_len),
            contextual: ContextualValidator::new(config.contextual_window_len),
            physics: PhysicsValidator::new(config),
            temporal: TemporalExtractor::new(),
            anomaly: AnomalyDetector::new(
                config.training_min_samples,
                config.training_threshold,
                config.contamination,
            ),
            trust: TrustEngine::new(config),
            ips: IpsPolicyEngine::new(config),
            vehicle,
            alerts,
            v2v,
            rejected_count: 0,
            verified_count: 0,
            rejection_log: VecDeque::with_capacity(REJECTION_LOG_CAPACITY),
            current_speed: 30.0,
            current_steering: 0.0,
            current_brake: 0.0,
        }
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    pub fn verified_count(&self) -> u64 {
        self.verified_count
    }

    pub fn trust(&self) -> f64 {
        self.trust.trust()
    }

    pub fn ips_mode(&self) -> crate::ips::IpsMode {
        self.ips.mode()
    }

    pub fn vehicle_state(&self) -> crate::vehicle::VehicleState {
        self.vehicle.get_state()
    }

    /// Process one signed envelope arriving at `now_ms`/`now_seconds`
    /// (millisecond wall clock for verification, seconds for the
    /// feature/physics/IPS layers, matching each component's native
    /// unit per spec §3). Returns `None` if the frame was rejected by
    /// the Verifier or carries an unrecognised frame id - both
    /// non-fatal per spec §7.
    pub fn process(
        &mut self,
        envelope: &SignedEnvelope,
        now_ms: u64,
        now_seconds: f64,
    ) -> Option<CycleOutcome> {
        // Step 1: verify.
        if let Err(GuardianError::Rejected(reason)) = self.verifier.verify(envelope, now_ms) {
            self.rejected_count += 1;
            self.push_rejection(RejectionEntry {
                device_id: envelope.device_id.clone(),
                frame_id: envelope.frame_id,
                reason: reason.to_string(),
            });
            return None;
        }
        self.verified_count += 1;

        // Step 2: decode.
        let payload = envelope.payload_bytes()?;
        let (kind, value) = decode_frame(envelope.frame_id, payload)?;

        match kind {
            SignalKind::Speed => self.current_speed = value,
            SignalKind::Steering => self.current_steering = value,
            SignalKind::Brake => self.current_brake = value,
        }

        // Step 3: feed feature layers.
        self.feature_extractor.add_sample(kind, now_seconds, value);
        self.behavior.observe(
            &envelope.device_id,
            now_seconds,
            self.current_steering,
            self.current_speed,
            self.current_brake,
        );
        self.contextual.observe(
            &envelope.device_id,
            now_seconds,
            self.current_speed,
            self.current_steering,
            self.current_brake,
        );

        // Step 4: physics (mandatory, always runs).
        let physics_result = self.physics.validate(
            self.current_speed,
            self.current_steering,
            self.current_brake,
            now_seconds,
        );

        // Temporal extractor: commanded vs observed reduces, for a
        // verified bus frame, to the signal tracking itself - the
        // listener has no independent commanded-value channel for
        // producer-originated frames, so both vantage points are fed
        // the same decoded value. UI-originated commands get a real
        // divergence signal once sanitisation substitutes a different
        // value (step 9).
        let temporal_result = self.temporal.update(&envelope.device_id, now_seconds, value, value);
        let temporal_score = 1.0 - temporal_result.anomaly_score;

        let is_ui_command = is_ui_controller(&envelope.device_id);

        // Step 5/6: train or detect.
        let all_features = self.feature_extractor.extract_all();
        let vector = feature_vector(&all_features);

        let final_anomaly = if is_ui_command {
            0.0
        } else if !self.anomaly.is_trained() {
            self.anomaly.observe(vector);
            0.0
        } else {
            let ml_score = self.anomaly.detect(&vector);

            let behavior_features = self.behavior.features(&envelope.device_id);
            let control_score = behavior_features
                .map(|f| {
                    let mut score = 0.0;
                    if f.steering_energy > self.config.control_energy_threshold {
                        score += 0.4;
                    }
                    if f.steering_jerk > self.config.control_jerk_threshold {
                        score += 0.3;
                    }
                    if f.oscillation_rate > self.config.control_oscillation_threshold {
                        score += 0.5;
                    }
                    if f.control_aggression > self.config.control_aggression_threshold {
                        score += 0.3;
                    }
                    score.min(1.0)
                })
                .unwrap_or(0.0);

            let contextual_result = self.contextual.validate(&envelope.device_id);
            let physics_ctx = contextual_result.score;

            let ml_fusion = 0.4 * ml_score + 0.4 * control_score + 0.2 * physics_ctx;

            let mut anomaly = 1.0
                - (0.6 * (1.0 - ml_fusion)
                    + 0.25 * physics_result.physics_score
                    + 0.15 * temporal_score);

            if !physics_result.overall_valid {
                anomaly = anomaly.max(self.config.physics_invalid_anomaly_floor);
            }

            anomaly
        };

        // Step 7: update trust.
        self.trust.update(final_anomaly, 1.0, temporal_score);
        let trust_score = self.trust.trust();

        // Step 8: update IPS.
        self.ips.update(trust_score, now_seconds);
        self.trust.set_ips_active(self.ips.is_active());

        // Step 9: sanitise and apply to the vehicle model. Every frame
        // passes through the IPS sanitiser - not just UI commands - the
        // UI/ECU distinction only changes whether a speed update forces
        // the manual-control latch (matches `can_listener.py`'s
        // unconditional `sanitize_steering`/`sanitize_speed` calls).
        match kind {
            SignalKind::Steering => {
                let sanitized = self.ips.sanitize_steering(value);
                self.vehicle.update_steering(sanitized);
            }
            SignalKind::Speed => {
                let sanitized = self.ips.sanitize_speed(value, self.current_speed);
                if is_ui_command {
                    self.vehicle.force_speed_update(sanitized);
                } else {
                    self.vehicle.update_speed(sanitized);
                }
            }
            SignalKind::Brake => {
                self.vehicle.apply_brake(value);
            }
        }

        // Step 10: emit security events.
        self.alerts
            .log_trust_update(&self.vehicle_id, trust_score, self.trust.is_ml_enabled(), final_anomaly);
        if final_anomaly > self.config.alert_anomaly_threshold || !physics_result.overall_valid {
            let severity = Severity::from_anomaly_score(final_anomaly);
            let detail = if !physics_result.overall_valid {
                "physics constraint violated"
            } else {
                "multi-layer anomaly detected"
            };
            self.alerts
                .log_security_alert(&self.vehicle_id, "behavioral_anomaly", severity, detail);

            if self.v2v.should_publish(trust_score, self.ips.is_active()) {
                let threat_type = if final_anomaly > 0.7 {
                    "ECU_COMPROMISE"
                } else {
                    "BEHAVIORAL_ANOMALY"
                };
                let confidence = (final_anomaly + 0.2).min(0.95);
                self.v2v.publish(trust_score, threat_type, confidence);
                self.alerts.log_attack_event(&self.vehicle_id, threat_type, confidence);
            }
        }

        Some(CycleOutcome {
            kind,
            value,
            final_anomaly,
            trust: trust_score,
            ips_mode: self.ips.mode(),
            physics_valid: physics_result.overall_valid,
        })
    }

    fn push_rejection(&mut self, entry: RejectionEntry) {
        if self.rejection_log.len() == REJECTION_LOG_CAPACITY {
            self.rejection_log.pop_front();
        }
        self.rejection_log.push_back(entry);
    }

    pub fn rejection_log(&self) -> &VecDeque<RejectionEntry> {
        &self.rejection_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SequenceStore;
    use crate::collaborators::{TracingAlertSink, TracingV2vPublisher};
    use crate::signer::Signer;
    use crate::vehicle::KinematicVehicle;

    fn fixtures() -> (DeviceKeyTable, PipelineConfig) {
        (DeviceKeyTable::demo_fleet(), PipelineConfig::default())
    }

    fn make_listener<'a>(
        keys: &'a DeviceKeyTable,
        config: &'a PipelineConfig,
    ) -> Listener<'a, KinematicVehicle, TracingAlertSink, TracingV2vPublisher> {
        Listener::new(
            "vehicleA",
            keys,
            config,
            KinematicVehicle::new(),
            TracingAlertSink,
            TracingV2vPublisher,
        )
    }

    #[test]
    fn rejected_envelope_does_not_advance_any_state() {
        let (keys, config) = fixtures();
        let mut listener = make_listener(&keys, &config);

        let mut signer = Signer::new("vehicleA-speed-ecu", &keys, SequenceStore::in_memory()).unwrap();
        let mut envelope = signer.sign(0x130, [0; 8]).unwrap();
        envelope.signature = "0".repeat(64);

        let outcome = listener.process(&envelope, envelope.timestamp_ms, 0.0);
        assert!(outcome.is_none());
        assert_eq!(listener.rejected_count(), 1);
    }

    #[test]
    fn baseline_training_keeps_trust_high_and_ips_off() {
        let (keys, config) = fixtures();
        let mut listener = make_listener(&keys, &config);
        let mut speed_signer = Signer::new("vehicleA-speed-ecu", &keys, SequenceStore::in_memory()).unwrap();
        let mut steering_signer =
            Signer::new("vehicleA-steering-ecu", &keys, SequenceStore::in_memory()).unwrap();
        let mut brake_signer = Signer::new("vehicleA-brake-ecu", &keys, SequenceStore::in_memory()).unwrap();

        use crate::codec::{encode_brake, encode_speed, encode_steering};

        for i in 0..30 {
            let t = i as f64 * 0.1;
            let (signer, frame_id, payload) = match i % 3 {
                0 => (&mut speed_signer, 0x130, encode_speed(30.0)),
                1 => (&mut steering_signer, 0x120, encode_steering(0.0)),
                _ => (&mut brake_signer, 0x140, encode_brake(0.0)),
            };
            let envelope = signer.sign(frame_id, payload).unwrap();
            listener.process(&envelope, envelope.timestamp_ms, t);
        }

        assert!(listener.trust() >= 0.95);
        assert_eq!(listener.ips_mode(), crate::ips::IpsMode::Off);
    }
}
