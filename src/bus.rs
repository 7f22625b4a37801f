/// Bus exchange - the in-process stand-in for the vehicle's control bus.
///
/// Grounded on `can_generator.py`'s `MockCANBus`: a bounded FIFO of the
/// last N messages plus a per-device persisted sequence counter. The
/// source system backed both with pickle files under `/tmp`; Design
/// Notes §9 calls that out as "global mutable state masquerading as a
/// shared resource" and asks for explicit owned instances instead, so
/// `SequenceStore` and `BusExchange` are plain structs callers construct
/// and pass around rather than process-wide singletons.
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::contracts::SignedEnvelope;
use crate::errors::Result;

/// Persists per-device sequence counters, write-through on every
/// `next()` call (`security/signer.py`'s `_save_sequence`, called after
/// every increment so a crash can never re-issue a sequence number).
#[derive(Debug, Clone)]
pub enum SequenceStore {
    Memory(HashMap<String, u64>),
    File { dir: PathBuf, cache: HashMap<String, u64> },
}

impl SequenceStore {
    /// A store backed by nothing but process memory. Sequences reset on
    /// restart - fine for tests and for devices that don't need
    /// cross-restart replay protection.
    pub fn in_memory() -> Self {
        Self::Memory(HashMap::new())
    }

    /// A store that write-through persists each counter as
    /// `<dir>/<device_id>.seq`, mirroring the one-file-per-device layout
    /// of the source system's `/tmp/{device_id}_sequence.txt`.
    pub fn persisted(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self::File {
            dir,
            cache: HashMap::new(),
        })
    }

    /// Advance and return the next sequence number for `device_id`,
    /// starting from 1 on first use (spec §9: "Start from 1 for clean
    /// sequences").
    pub fn next(&mut self, device_id: &str) -> Result<u64> {
        match self {
            Self::Memory(map) => {
                let entry = map.entry(device_id.to_string()).or_insert(0);
                *entry += 1;
                Ok(*entry)
            }
            Self::File { dir, cache } => {
                let current = match cache.get(device_id) {
                    Some(value) => *value,
                    None => load_sequence_file(dir, device_id),
                };
                let next = current + 1;
                cache.insert(device_id.to_string(), next);
                save_sequence_file(dir, device_id, next)?;
                Ok(next)
            }
        }
    }
}

fn sequence_path(dir: &Path, device_id: &str) -> PathBuf {
    dir.join(format!("{device_id}.seq"))
}

fn load_sequence_file(dir: &Path, device_id: &str) -> u64 {
    fs::read_to_string(sequence_path(dir, device_id))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn save_sequence_file(dir: &Path, device_id: &str, value: u64) -> Result<()> {
    let path = sequence_path(dir, device_id);
    let tmp_path = path.with_extension("seq.tmp");
    fs::write(&tmp_path, value.to_string())?;
    fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// Bounded FIFO exchange of signed envelopes, modeling the control bus
/// between producers and the coordinator. Retains only the most recent
/// `capacity` envelopes, matching `MockCANBus.send`'s `messages[-10:]`
/// truncation.
#[derive(Debug, Clone)]
pub struct BusExchange {
    capacity: usize,
    queue: VecDeque<SignedEnvelope>,
}

impl BusExchange {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an envelope onto the bus, dropping the oldest if at capacity.
    pub fn send(&mut self, envelope: SignedEnvelope) {
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(envelope);
    }

    /// Pop the oldest pending envelope, if any.
    pub fn recv(&mut self) -> Option<SignedEnvelope> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::frame_ids;

    fn sample_envelope(sequence: u64) -> SignedEnvelope {
        SignedEnvelope {
            device_id: "vehicleA-speed-ecu".into(),
            timestamp_ms: 0,
            sequence,
            key_version: 1,
            frame_id: frame_ids::SPEED,
            payload: "00".repeat(8),
            signature: "a".repeat(64),
        }
    }

    #[test]
    fn in_memory_sequence_starts_at_one_and_increments() {
        let mut store = SequenceStore::in_memory();
        assert_eq!(store.next("dev-1").unwrap(), 1);
        assert_eq!(store.next("dev-1").unwrap(), 2);
        assert_eq!(store.next("dev-2").unwrap(), 1);
    }

    #[test]
    fn persisted_sequence_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("aegis_seq_test_{}", std::process::id()));
        {
            let mut store = SequenceStore::persisted(&dir).unwrap();
            assert_eq!(store.next("dev-1").unwrap(), 1);
            assert_eq!(store.next("dev-1").unwrap(), 2);
        }
        {
            let mut store = SequenceStore::persisted(&dir).unwrap();
            assert_eq!(store.next("dev-1").unwrap(), 3);
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn bus_exchange_drops_oldest_past_capacity() {
        let mut bus = BusExchange::new(2);
        bus.send(sample_envelope(1));
        bus.send(sample_envelope(2));
        bus.send(sample_envelope(3));
        assert_eq!(bus.len(), 2);
        assert_eq!(bus.recv().unwrap().sequence, 2);
        assert_eq!(bus.recv().unwrap().sequence, 3);
        assert!(bus.recv().is_none());
    }
}
