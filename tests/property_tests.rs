use aegis_guardian_core::bus::SequenceStore;
use aegis_guardian_core::codec::{
    decode_brake, decode_speed, decode_steering, encode_brake, encode_speed, encode_steering,
};
use aegis_guardian_core::keys::DeviceKeyTable;
use aegis_guardian_core::signer::Signer;
use aegis_guardian_core::trust::TrustEngine;
use aegis_guardian_core::verifier::Verifier;
use aegis_guardian_core::PipelineConfig;
use proptest::prelude::*;

proptest! {
    /// Codec round-trip (spec §8): `decode(encode(x)) == x` within the
    /// 0.05 tolerance implied by the scale-of-10 integer encoding.
    #[test]
    fn steering_codec_round_trips(angle in -45.0f64..=45.0) {
        let decoded = decode_steering(encode_steering(angle));
        prop_assert!((decoded - angle).abs() <= 0.05);
    }

    #[test]
    fn speed_codec_round_trips(speed in 0.0f64..=6553.5) {
        let decoded = decode_speed(encode_speed(speed));
        prop_assert!((decoded - speed).abs() <= 0.05);
    }

    #[test]
    fn brake_codec_round_trips(brake in 0.0f64..=100.0) {
        let decoded = decode_brake(encode_brake(brake));
        prop_assert!((decoded - brake).abs() <= 0.05);
    }

    /// Invariant (spec §8): trust always stays in [0, 1] no matter what
    /// sequence of anomaly/auth/temporal inputs it is driven with.
    #[test]
    fn trust_stays_in_unit_interval(
        steps in prop::collection::vec(
            (0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0),
            1..200,
        )
    ) {
        let config = PipelineConfig::default();
        let mut engine = TrustEngine::new(&config);
        for (anomaly, auth, temporal) in steps {
            let trust = engine.update(anomaly, auth, temporal);
            prop_assert!((0.0..=1.0).contains(&trust));
        }
    }

    /// Invariant (spec §8): a freshly signed envelope always verifies,
    /// for any payload and any registered device identity.
    #[test]
    fn any_freshly_signed_envelope_verifies(payload in prop::array::uniform8(any::<u8>())) {
        let mut keys = DeviceKeyTable::new();
        keys.insert("prop-device", "prop-device-secret");
        let config = PipelineConfig::default();

        let mut signer = Signer::new("prop-device", &keys, SequenceStore::in_memory()).unwrap();
        let envelope = signer.sign(0x130, payload).unwrap();

        let mut verifier = Verifier::new(&keys, &config);
        prop_assert!(verifier.verify(&envelope, envelope.timestamp_ms).is_ok());
    }

    /// Invariant (spec §8): flipping any single hex character of the
    /// payload breaks verification (the signature no longer matches).
    #[test]
    fn tampering_the_payload_breaks_verification(
        payload in prop::array::uniform8(any::<u8>()),
        tamper_byte in 0usize..8,
    ) {
        let mut keys = DeviceKeyTable::new();
        keys.insert("prop-device", "prop-device-secret");
        let config = PipelineConfig::default();

        let mut signer = Signer::new("prop-device", &keys, SequenceStore::in_memory()).unwrap();
        let envelope = signer.sign(0x130, payload).unwrap();

        let mut tampered_payload = payload;
        tampered_payload[tamper_byte] = tampered_payload[tamper_byte].wrapping_add(1);
        prop_assume!(tampered_payload != payload);

        let mut tampered = envelope.clone();
        tampered.payload = hex::encode(tampered_payload);

        let mut verifier = Verifier::new(&keys, &config);
        prop_assert!(verifier.verify(&tampered, tampered.timestamp_ms).is_err());
    }
}
