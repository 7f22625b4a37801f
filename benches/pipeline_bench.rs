use aegis_guardian_core::bus::SequenceStore;
use aegis_guardian_core::codec::encode_speed;
use aegis_guardian_core::keys::DeviceKeyTable;
use aegis_guardian_core::signer::Signer;
use aegis_guardian_core::verifier::Verifier;
use aegis_guardian_core::PipelineConfig;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_signing(c: &mut Criterion) {
    let keys = DeviceKeyTable::demo_fleet();
    let mut signer = Signer::new("vehicleA-speed-ecu", &keys, SequenceStore::in_memory()).unwrap();
    let payload = encode_speed(42.0);

    c.bench_function("sign_speed_envelope", |b| {
        b.iter(|| signer.sign(black_box(0x130), black_box(payload)));
    });
}

fn benchmark_verification(c: &mut Criterion) {
    let keys = DeviceKeyTable::demo_fleet();
    let config = PipelineConfig::default();
    let mut signer = Signer::new("vehicleA-speed-ecu", &keys, SequenceStore::in_memory()).unwrap();

    c.bench_function("verify_speed_envelope", |b| {
        b.iter_batched(
            || signer.sign(0x130, encode_speed(42.0)).unwrap(),
            |envelope| {
                let mut verifier = Verifier::new(&keys, &config);
                verifier.verify(black_box(&envelope), envelope.timestamp_ms)
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn benchmark_full_cycle(c: &mut Criterion) {
    use aegis_guardian_core::collaborators::{TracingAlertSink, TracingV2vPublisher};
    use aegis_guardian_core::vehicle::KinematicVehicle;
    use aegis_guardian_core::Listener;

    let keys = DeviceKeyTable::demo_fleet();
    let config = PipelineConfig::default();
    let mut signer = Signer::new("vehicleA-speed-ecu", &keys, SequenceStore::in_memory()).unwrap();

    c.bench_function("listener_process_single_frame", |b| {
        b.iter_batched(
            || {
                let listener = Listener::new(
                    "vehicleA",
                    &keys,
                    &config,
                    KinematicVehicle::new(),
                    TracingAlertSink,
                    TracingV2vPublisher,
                );
                let envelope = signer.sign(0x130, encode_speed(30.0)).unwrap();
                (listener, envelope)
            },
            |(mut listener, envelope)| {
                listener.process(black_box(&envelope), envelope.timestamp_ms, 0.0)
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    benchmark_signing,
    benchmark_verification,
    benchmark_full_cycle
);
criterion_main!(benches);
