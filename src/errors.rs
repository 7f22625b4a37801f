/// Error types for the Aegis guardian core
///
/// Follows the same hand-rolled enum-plus-Display shape the teacher
/// crate used: narrow, per-variant context fields, no `thiserror`
/// indirection.
use std::fmt;
use std::io;

/// Result type alias for guardian core operations
pub type Result<T> = std::result::Result<T, GuardianError>;

/// Reason a `Verifier` rejected an envelope. Mirrors spec §4.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    UnknownDevice,
    Stale { now_ms: u64, ts_ms: u64 },
    Replay { sequence: u64, last_sequence: u64 },
    BadSignature,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::UnknownDevice => write!(f, "unknown device"),
            Self::Stale { now_ms, ts_ms } => {
                write!(f, "stale timestamp: |{now_ms} - {ts_ms}| exceeds window")
            }
            Self::Replay {
                sequence,
                last_sequence,
            } => write!(
                f,
                "sequence replay: {sequence} <= last accepted {last_sequence}"
            ),
            Self::BadSignature => write!(f, "HMAC signature verification failed"),
        }
    }
}

/// Guardian core error enumeration.
///
/// Covers the failure modes in the ingestion/detection/prevention
/// pipeline: authentication, decode, persistence, and construction-time
/// configuration errors. Per spec §7, none of these are fatal to the
/// listener loop except construction-time signer errors.
#[derive(Debug, Clone)]
pub enum GuardianError {
    /// Signer has no key configured for this device (construction-time).
    UnknownDevice(String),

    /// Envelope failed verification; carries the specific reason.
    Rejected(RejectReason),

    /// A frame id has no known signal mapping. Not a security error.
    UnknownFrame(u16),

    /// A decoded signal value fell outside its physical range.
    OutOfRange { field: &'static str, value: f64 },

    /// Persistence (sequence file, journal) I/O failure. Never fatal.
    PersistenceError(String),

    /// JSON (de)serialization of an envelope failed.
    SerializationError(String),
}

impl fmt::Display for GuardianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDevice(id) => write!(f, "no signing key configured for device: {id}"),
            Self::Rejected(reason) => write!(f, "envelope rejected: {reason}"),
            Self::UnknownFrame(id) => write!(f, "unrecognised frame id: {id:#05x}"),
            Self::OutOfRange { field, value } => {
                write!(f, "{field} out of range: {value}")
            }
            Self::PersistenceError(msg) => write!(f, "persistence error: {msg}"),
            Self::SerializationError(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for GuardianError {}

impl From<io::Error> for GuardianError {
    fn from(err: io::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<serde_json::Error> for GuardianError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
