/// Signer (C1) - produces authenticated signed envelopes for outgoing
/// signal payloads.
///
/// Grounded on `security/signer.py`: per-device persisted sequence
/// counter, millisecond wall clock, HMAC-SHA256 over the colon-joined
/// field tuple. The teacher's `Transmitter` kept serialization
/// stateless and pushed configuration into a separate builder; here the
/// sequence counter is genuinely stateful (it must survive restarts),
/// so `Signer` owns one persisted counter per device through a
/// `SequenceStore` (see `bus.rs`), write-through on every signature.
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bus::SequenceStore;
use crate::contracts::SignedEnvelope;
use crate::errors::{GuardianError, Result};
use crate::keys::{DeviceKeyTable, CURRENT_KEY_VERSION};

type HmacSha256 = Hmac<Sha256>;

/// Signs outgoing frames on behalf of a single device identity.
///
/// One `Signer` per producer ECU, matching the source system's
/// per-device singleton (Design Notes §9: "Per-device singletons...
/// become explicit instances owned by their producer").
pub struct Signer {
    device_id: String,
    key: String,
    sequence: SequenceStore,
}

impl Signer {
    /// Construct a signer for `device_id`. Fails with `UnknownDevice`
    /// if no key is configured (spec §4.1 step 3) - this is the one
    /// construction-time error the rest of the pipeline never sees.
    pub fn new(device_id: impl Into<String>, keys: &DeviceKeyTable, sequence: SequenceStore) -> Result<Self> {
        let device_id = device_id.into();
        let key = keys
            .get_key(&device_id)
            .ok_or_else(|| GuardianError::UnknownDevice(device_id.clone()))?
            .to_string();
        Ok(Self {
            device_id,
            key,
            sequence,
        })
    }

    /// Sign `(frame_id, payload)` into a fully-formed envelope.
    ///
    /// Increments and write-through persists the sequence counter
    /// before computing the signature, so a crash between increment
    /// and send can never cause a sequence to be reissued (spec §4.1).
    pub fn sign(&mut self, frame_id: u16, payload: [u8; 8]) -> Result<SignedEnvelope> {
        let sequence = self.sequence.next(&self.device_id)?;
        let timestamp_ms = now_ms();
        let payload_hex = hex::encode(payload);

        let signing_input = SignedEnvelope::signing_input(
            &self.device_id,
            timestamp_ms,
            sequence,
            frame_id,
            &payload_hex,
        );
        let signature = hmac_hex(&self.key, signing_input.as_bytes());

        Ok(SignedEnvelope {
            device_id: self.device_id.clone(),
            timestamp_ms,
            sequence,
            key_version: CURRENT_KEY_VERSION,
            frame_id,
            payload: payload_hex,
            signature,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// Compute `HMAC_SHA256(key, message)` and return it as lowercase hex.
pub fn hmac_hex(key: &str, message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the epoch")
        .as_millis() as u64
}
