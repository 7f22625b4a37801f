/// Verifier (C2) - validates signed envelopes before they reach the
/// feature layers.
///
/// Grounded on `security/verifier.py`'s `verify_message`: the same five
/// checks in the same order (unknown device, stale timestamp, sequence
/// replay with restart-gap forgiveness, HMAC signature, tracking
/// update). Rejection reasons are returned as a typed `RejectReason`
/// rather than the Python source's `(bool, str)` tuple.
use std::collections::HashMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::PipelineConfig;
use crate::contracts::SignedEnvelope;
use crate::errors::{GuardianError, RejectReason, Result};
use crate::keys::DeviceKeyTable;

type HmacSha256 = Hmac<Sha256>;

/// Stateful per-device replay tracking. One `Verifier` serves the whole
/// fleet, mirroring the source system's single `MessageVerifier`
/// instance shared across all inbound messages.
pub struct Verifier<'a> {
    keys: &'a DeviceKeyTable,
    config: &'a PipelineConfig,
    last_sequences: HashMap<String, u64>,
}

impl<'a> Verifier<'a> {
    pub fn new(keys: &'a DeviceKeyTable, config: &'a PipelineConfig) -> Self {
        Self {
            keys,
            config,
            last_sequences: HashMap::new(),
        }
    }

    /// Validate `envelope` against the current time (`now_ms`, injected
    /// for testability rather than read from the wall clock here).
    ///
    /// Returns `Ok(())` on success; tracking state (last sequence) is
    /// updated only on success, matching the Python source's ordering.
    pub fn verify(&mut self, envelope: &SignedEnvelope, now_ms: u64) -> Result<()> {
        // 1. Device ID validation.
        let key = self
            .keys
            .get_key(&envelope.device_id)
            .ok_or(GuardianError::Rejected(RejectReason::UnknownDevice))?;

        // 2. Timestamp validation (replay protection).
        let delta = now_ms.abs_diff(envelope.timestamp_ms);
        if delta > self.config.timestamp_window_ms {
            return Err(GuardianError::Rejected(RejectReason::Stale {
                now_ms,
                ts_ms: envelope.timestamp_ms,
            }));
        }

        // 3. Sequence validation - forgive a large backward jump as a
        // device restart, reject a replay or stall otherwise.
        let last_seq = self
            .last_sequences
            .get(&envelope.device_id)
            .copied()
            .unwrap_or(0);
        let is_restart = last_seq >= self.config.replay_gap_threshold
            && envelope.sequence < last_seq - self.config.replay_gap_threshold;
        if envelope.sequence <= last_seq && !is_restart {
            return Err(GuardianError::Rejected(RejectReason::Replay {
                sequence: envelope.sequence,
                last_sequence: last_seq,
            }));
        }

        // 4. HMAC signature validation, constant-time via `verify_slice`.
        //
        // `can_listener.py`'s original dispatcher would fall back to
        // "accept with warning" when no matching signed message existed
        // at all. This core always receives a `SignedEnvelope`, so the
        // closest analogue is a signature that fails to verify; per
        // spec §9's Open Question, that fallback is now an explicit
        // policy toggle (`accept_unsigned`), defaulting to reject.
        let signing_input = SignedEnvelope::signing_input(
            &envelope.device_id,
            envelope.timestamp_ms,
            envelope.sequence,
            envelope.frame_id,
            &envelope.payload,
        );
        let verified = hex::decode(&envelope.signature).ok().is_some_and(|signature_bytes| {
            let mut mac = HmacSha256::new_from_slice(key.as_bytes())
                .expect("HMAC accepts any key length");
            mac.update(signing_input.as_bytes());
            mac.verify_slice(&signature_bytes).is_ok()
        });
        if !verified && !self.config.accept_unsigned {
            return Err(GuardianError::Rejected(RejectReason::BadSignature));
        }

        // 5. Update tracking, only once every prior check has passed.
        self.last_sequences
            .insert(envelope.device_id.clone(), envelope.sequence);

        Ok(())
    }
}
