/// Core data structures for the guardian pipeline.
///
/// `SignedEnvelope` is the wire unit between producers (ECUs, the UI
/// controller) and the `Verifier`; `SignalSample` is the decoded form
/// handed to the feature layers. Field shapes follow spec §3 exactly.
use serde::{Deserialize, Serialize};

use crate::errors::{GuardianError, RejectReason, Result};

/// Control-bus signal kinds this core understands. Order here is the
/// fixed order the anomaly detector's feature vector concatenates in
/// (spec §4.8) - do not reorder without updating `anomaly.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Steering,
    Speed,
    Brake,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [SignalKind::Steering, SignalKind::Speed, SignalKind::Brake];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Steering => "steering",
            Self::Speed => "speed",
            Self::Brake => "brake",
        }
    }
}

/// A decoded control-bus sample, ready for the feature extractors.
///
/// `timestamp` is seconds, monotonic within a process (spec §3); wire
/// envelopes carry millisecond epoch time separately (`timestamp_ms`).
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSample {
    pub kind: SignalKind,
    pub value: f64,
    pub timestamp: f64,
    pub sender: String,
}

/// Signed Envelope - the wire unit between producers and the Verifier.
///
/// Serializes as the JSON-compatible object spec §6 describes: `payload`
/// hex-encoded lowercase, `signature` a 64-char lowercase hex HMAC-SHA256
/// digest over `device_id:timestamp_ms:sequence:frame_id:payload_hex`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub device_id: String,
    pub timestamp_ms: u64,
    pub sequence: u64,
    pub key_version: u32,
    pub frame_id: u16,
    /// Lowercase hex-encoded 8-byte payload.
    pub payload: String,
    /// Lowercase hex-encoded 64-char HMAC-SHA256 digest.
    pub signature: String,
}

/// Wire field names a `SignedEnvelope` JSON object must carry (spec §3).
const REQUIRED_FIELDS: [&str; 7] = [
    "device_id",
    "timestamp_ms",
    "sequence",
    "key_version",
    "frame_id",
    "payload",
    "signature",
];

impl SignedEnvelope {
    /// Parse a wire-format JSON object into a `SignedEnvelope`.
    ///
    /// Checks each required field's presence by name before handing the
    /// value to serde, so a producer that drops a field is rejected with
    /// spec §4.2's `MissingField` reason rather than a generic
    /// deserialization failure.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        for field in REQUIRED_FIELDS {
            if value.get(field).is_none() {
                return Err(GuardianError::Rejected(RejectReason::MissingField(field)));
            }
        }
        serde_json::from_value(value).map_err(GuardianError::from)
    }

    /// The exact byte string the HMAC is computed over (spec §3).
    pub fn signing_input(
        device_id: &str,
        timestamp_ms: u64,
        sequence: u64,
        frame_id: u16,
        payload_hex: &str,
    ) -> String {
        format!("{device_id}:{timestamp_ms}:{sequence}:{frame_id}:{payload_hex}")
    }

    /// Decode `payload` from hex into the 8 raw bytes a frame carries.
    /// Returns `None` if the hex is malformed or not exactly 8 bytes -
    /// treated as a decode error by the caller, never a security one.
    pub fn payload_bytes(&self) -> Option<[u8; 8]> {
        let bytes = hex::decode(&self.payload).ok()?;
        bytes.try_into().ok()
    }
}

/// The conventional frame ids this system assigns meaning to (spec §3).
pub mod frame_ids {
    pub const STEERING: u16 = 0x120;
    pub const SPEED: u16 = 0x130;
    pub const BRAKE: u16 = 0x140;
}
