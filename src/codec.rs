/// Signal Codec (C12) - bit-exact conversion between signal values and
/// 8-byte frame payloads.
///
/// Grounded on the frame decode logic in `can_listener.py`
/// (`int.from_bytes(data[:2], 'big') / 10.0 - 45.0`, etc.), generalized
/// into symmetric encode/decode pairs per spec §4.12. All encodings are
/// big-endian: two value bytes followed by six zero bytes.
use crate::contracts::{frame_ids, SignalKind};

/// Encode a steering angle in degrees (range [-45, 45]) into an 8-byte
/// payload: `round((angle + 45) * 10)` as a big-endian u16, zero-padded.
pub fn encode_steering(angle_deg: f64) -> [u8; 8] {
    encode_scaled(angle_deg + 45.0, 10.0)
}

/// Decode a steering payload back into degrees. Out-of-range results
/// are returned as-is (spec §4.12: codec never fails on range).
pub fn decode_steering(payload: [u8; 8]) -> f64 {
    decode_scaled(payload, 10.0) - 45.0
}

/// Encode a speed in km/h (range [0, 6553.5]) into an 8-byte payload:
/// `round(speed * 10)` as a big-endian u16, zero-padded.
pub fn encode_speed(speed_kmh: f64) -> [u8; 8] {
    encode_scaled(speed_kmh, 10.0)
}

pub fn decode_speed(payload: [u8; 8]) -> f64 {
    decode_scaled(payload, 10.0)
}

/// Encode a brake percentage (range [0, 100]) into an 8-byte payload:
/// `round(brake * 10)` as a big-endian u16, zero-padded.
pub fn encode_brake(brake_pct: f64) -> [u8; 8] {
    encode_scaled(brake_pct, 10.0)
}

pub fn decode_brake(payload: [u8; 8]) -> f64 {
    decode_scaled(payload, 10.0)
}

fn encode_scaled(value: f64, scale: f64) -> [u8; 8] {
    let scaled = (value * scale).round();
    let clamped = scaled.clamp(0.0, u16::MAX as f64) as u16;
    let mut buf = [0u8; 8];
    buf[0..2].copy_from_slice(&clamped.to_be_bytes());
    buf
}

fn decode_scaled(payload: [u8; 8], scale: f64) -> f64 {
    let raw = u16::from_be_bytes([payload[0], payload[1]]);
    raw as f64 / scale
}

/// Encode a signal kind + physical value into its conventional frame id
/// and payload bytes, per the mapping in spec §3/§4.12.
pub fn encode_signal(kind: SignalKind, value: f64) -> (u16, [u8; 8]) {
    match kind {
        SignalKind::Steering => (frame_ids::STEERING, encode_steering(value)),
        SignalKind::Speed => (frame_ids::SPEED, encode_speed(value)),
        SignalKind::Brake => (frame_ids::BRAKE, encode_brake(value)),
    }
}

/// Decode a frame id + payload into a signal kind and physical value.
/// Returns `None` for frame ids this system assigns no meaning to -
/// spec §4.11 step 2 treats this as "silently ignore", not an error.
pub fn decode_frame(frame_id: u16, payload: [u8; 8]) -> Option<(SignalKind, f64)> {
    match frame_id {
        frame_ids::STEERING => Some((SignalKind::Steering, decode_steering(payload))),
        frame_ids::SPEED => Some((SignalKind::Speed, decode_speed(payload))),
        frame_ids::BRAKE => Some((SignalKind::Brake, decode_brake(payload))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steering_round_trips_within_tolerance() {
        for angle in [-45.0, -20.3, 0.0, 12.7, 45.0] {
            let decoded = decode_steering(encode_steering(angle));
            assert!((decoded - angle).abs() <= 0.05, "angle {angle} -> {decoded}");
        }
    }

    #[test]
    fn speed_round_trips_within_tolerance() {
        for speed in [0.0, 30.0, 123.4, 6553.5] {
            let decoded = decode_speed(encode_speed(speed));
            assert!((decoded - speed).abs() <= 0.05, "speed {speed} -> {decoded}");
        }
    }

    #[test]
    fn brake_round_trips_within_tolerance() {
        for brake in [0.0, 50.0, 100.0] {
            let decoded = decode_brake(encode_brake(brake));
            assert!((decoded - brake).abs() <= 0.05, "brake {brake} -> {decoded}");
        }
    }

    #[test]
    fn unknown_frame_id_decodes_to_none() {
        assert!(decode_frame(0x999, [0; 8]).is_none());
    }

    #[test]
    fn padding_bytes_are_zero() {
        let payload = encode_speed(42.0);
        assert_eq!(&payload[2..], &[0u8; 6]);
    }

    #[test]
    fn encode_decode_signal_round_trip() {
        let (frame_id, payload) = encode_signal(SignalKind::Brake, 37.5);
        assert_eq!(frame_id, frame_ids::BRAKE);
        let (kind, value) = decode_frame(frame_id, payload).unwrap();
        assert_eq!(kind, SignalKind::Brake);
        assert!((value - 37.5).abs() <= 0.05);
    }
}
