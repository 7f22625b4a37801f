/// Device key table - opaque mapping from device identity to HMAC secret.
///
/// Grounded on `security/keys.py` in the source system: a flat map from
/// device id to a shared secret, plus a key-version constant for future
/// rotation. Key distribution and safe-at-rest storage are explicitly
/// out of scope (spec §1 Non-goals); this is an in-memory lookup table
/// only, with `Zeroize` applied to secrets on drop as cheap hygiene.
use std::collections::HashMap;

use zeroize::Zeroize;

/// Current key version. Bumped on rotation; verification against an
/// older version is not implemented (no Non-goal coverage for rotation).
pub const CURRENT_KEY_VERSION: u32 = 1;

#[derive(Clone)]
struct DeviceKey(String);

impl Drop for DeviceKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// In-memory device identity -> secret table.
#[derive(Clone, Default)]
pub struct DeviceKeyTable {
    keys: HashMap<String, DeviceKey>,
}

impl DeviceKeyTable {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Register (or overwrite) a device's secret.
    pub fn insert(&mut self, device_id: impl Into<String>, secret: impl Into<String>) {
        self.keys
            .insert(device_id.into(), DeviceKey(secret.into()));
    }

    /// `get_key(device_id) -> secret|None` per spec §6.
    pub fn get_key(&self, device_id: &str) -> Option<&str> {
        self.keys.get(device_id).map(|k| k.0.as_str())
    }

    /// `is_valid(device_id) -> bool` per spec §6.
    pub fn is_valid(&self, device_id: &str) -> bool {
        self.keys.contains_key(device_id)
    }

    /// Convenience constructor reproducing the demo vehicle fleet from
    /// `security/keys.py`: one key per ECU plus the UI controller and
    /// the V2V identities of two vehicles. Useful for tests and for
    /// harnesses that don't need a custom roster.
    pub fn demo_fleet() -> Self {
        let mut table = Self::new();
        table.insert("vehicleA-steering-ecu", "steering_key_v1_secret_2024");
        table.insert("vehicleA-speed-ecu", "speed_key_v1_secret_2024");
        table.insert("vehicleA-brake-ecu", "brake_key_v1_secret_2024");
        table.insert("vehicleA-ui-controller", "ui_key_v1_secret_2024");
        table.insert("vehicleA-v2v", "v2v_key_v1_secret_2024");
        table.insert("vehicleB-v2v", "v2v_key_v1_secret_2024");
        table
    }
}

/// True for device ids that represent the UI/manual controller, whose
/// commands bypass anomaly scoring per spec §4.11.
pub fn is_ui_controller(device_id: &str) -> bool {
    device_id.contains("ui-controller")
}
