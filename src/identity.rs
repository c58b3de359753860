use crate::error::Result;
use crate::storage::Storage;
use rand::Rng;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub const DEVICE_ID_KEY: &str = "covenant_chat_device_id";

const DEVICE_ID_PREFIX: &str = "device_";
const SUFFIX_MIN_LEN: usize = 11;
const SUFFIX_MAX_LEN: usize = 13;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque per-profile identifier used only to attribute message ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    #[cfg(test)]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn now_millis() -> u128 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis(),
        Err(_) => 0,
    }
}

fn random_base36_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.gen_range(SUFFIX_MIN_LEN..=SUFFIX_MAX_LEN);
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

pub fn generate_device_id() -> DeviceId {
    let suffix = random_base36_suffix(&mut rand::thread_rng());
    DeviceId(format!("{DEVICE_ID_PREFIX}{}_{suffix}", now_millis()))
}

/// Returns the persisted device id, generating and storing one on first use.
pub fn get_or_create_device_id(storage: &dyn Storage) -> Result<DeviceId> {
    if let Some(existing) = storage.get(DEVICE_ID_KEY) {
        if !existing.trim().is_empty() {
            return Ok(DeviceId(existing));
        }
    }

    let device_id = generate_device_id();
    storage.set(DEVICE_ID_KEY, device_id.as_str())?;
    info!(device_id = %device_id, "generated new device identifier");
    Ok(device_id)
}
