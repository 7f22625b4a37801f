/// Listener task scheduler (§5) - the async receive loop that owns the
/// bus boundary's only suspension point.
///
/// Grounded on `can_listener.py`'s `run()`, which polls a python-can bus
/// with a 1 s timeout in a loop and falls straight back into `recv()` on
/// timeout, with no hard deadline on any single cycle (spec §5: "the
/// design tolerates dropped frames"). Detection itself stays entirely
/// synchronous - `Listener::process` never awaits anything - only the
/// bus boundary and the stop signal are async.
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Duration};

use crate::collaborators::{AlertSink, V2vPublisher};
use crate::contracts::SignedEnvelope;
use crate::listener::Listener;
use crate::vehicle::VehicleModel;

/// Bound on a single bus receive (spec §5: "bus receive (bounded 1 s
/// timeout)"). Expired polls just loop back to re-check the stop signal.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Drive `listener` from `envelopes` until `stop` reports `true` or the
/// channel is closed (the producer side is gone).
///
/// `now` is called once per received envelope and must return
/// `(now_ms, now_seconds)` - millisecond wall clock for the Verifier,
/// elapsed seconds for the feature/physics/IPS layers (spec §3). It is
/// a closure rather than a direct `SystemTime::now()` read so tests can
/// drive the loop with a deterministic clock.
///
/// Returns the listener so the caller can inspect final state (trust,
/// IPS mode, rejection log) after shutdown.
pub async fn run<'a, V, A, P>(
    mut listener: Listener<'a, V, A, P>,
    mut envelopes: mpsc::Receiver<SignedEnvelope>,
    mut stop: watch::Receiver<bool>,
    mut now: impl FnMut() -> (u64, f64),
) -> Listener<'a, V, A, P>
where
    V: VehicleModel,
    A: AlertSink,
    P: V2vPublisher,
{
    loop {
        if *stop.borrow() {
            break;
        }

        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            received = timeout(RECEIVE_TIMEOUT, envelopes.recv()) => {
                match received {
                    Ok(Some(envelope)) => {
                        let (now_ms, now_seconds) = now();
                        listener.process(&envelope, now_ms, now_seconds);
                    }
                    Ok(None) => break,
                    Err(_) => continue,
                }
            }
        }
    }

    listener
}
