use crate::identity::DeviceId;
use std::fmt;

pub mod gate;
pub mod store;

pub use gate::{LockState, UnlockGate};
pub use store::SessionStore;

/// Everything a data-layer call needs to act on behalf of this device.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatContext {
    passphrase: String,
    device_id: DeviceId,
}

impl ChatContext {
    pub fn new(passphrase: impl Into<String>, device_id: DeviceId) -> Self {
        Self {
            passphrase: passphrase.into(),
            device_id,
        }
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }
}

impl fmt::Debug for ChatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatContext")
            .field("passphrase", &"<redacted>")
            .field("device_id", &self.device_id)
            .finish()
    }
}
