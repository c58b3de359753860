//! In-process message store with the same contract as the remote one.
//!
//! Backs `--demo` mode and the data-layer tests.

use super::{Message, RemoteActor, RemoteError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_PASSWORD: &str = "icp";

#[derive(Debug)]
struct StoreState {
    password: String,
    messages: Vec<Message>,
    next_id: u64,
}

#[derive(Debug)]
pub struct MemoryActor {
    state: Mutex<StoreState>,
}

impl Default for MemoryActor {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD)
    }
}

impl MemoryActor {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                password: password.into(),
                messages: Vec::new(),
                next_id: 0,
            }),
        }
    }

    fn with_authorized<T>(
        &self,
        password: &str,
        f: impl FnOnce(&mut StoreState) -> T,
    ) -> Result<T, RemoteError> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.password != password {
            return Err(RemoteError::Rejected("Invalid password".to_string()));
        }
        Ok(f(&mut state))
    }
}

fn now_nanos() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

#[async_trait]
impl RemoteActor for MemoryActor {
    async fn add_message(&self, password: &str, content: &str) -> Result<Message, RemoteError> {
        self.with_authorized(password, |state| {
            let message = Message {
                message_id: state.next_id,
                content: content.to_string(),
                timestamp: now_nanos(),
            };
            state.next_id += 1;
            state.messages.push(message.clone());
            message
        })
    }

    async fn clear_chat(&self, password: &str) -> Result<(), RemoteError> {
        self.with_authorized(password, |state| state.messages.clear())
    }

    async fn get_messages(
        &self,
        password: &str,
        since_message_id: Option<u64>,
    ) -> Result<Vec<Message>, RemoteError> {
        self.with_authorized(password, |state| match since_message_id {
            Some(since) => state
                .messages
                .iter()
                .filter(|message| message.message_id > since)
                .cloned()
                .collect(),
            None => state.messages.clone(),
        })
    }

    async fn set_password(&self, old_password: &str, new_password: &str) -> Result<(), RemoteError> {
        self.with_authorized(old_password, |state| {
            state.password = new_password.to_string();
        })
    }
}
