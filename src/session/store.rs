use crate::error::Result;
use crate::storage::{MemoryStorage, Storage};
use std::sync::Arc;

pub const SESSION_PASSWORD_KEY: &str = "covenant_chat_password";

/// Holds the unlock passphrase for the lifetime of the backing storage.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStorage::default()))
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn set(&self, passphrase: &str) -> Result<()> {
        self.storage.set(SESSION_PASSWORD_KEY, passphrase)
    }

    pub fn get(&self) -> Option<String> {
        self.storage.get(SESSION_PASSWORD_KEY)
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove(SESSION_PASSWORD_KEY)
    }
}
