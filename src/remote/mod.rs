//! The remote message store this client talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod http;
pub mod memory;

pub use http::HttpActor;
pub use memory::MemoryActor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: u64,
    pub content: String,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("remote rejected the request: {0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(String),
}

#[async_trait]
pub trait RemoteActor: Send + Sync {
    async fn add_message(&self, password: &str, content: &str) -> Result<Message, RemoteError>;

    async fn clear_chat(&self, password: &str) -> Result<(), RemoteError>;

    async fn get_messages(
        &self,
        password: &str,
        since_message_id: Option<u64>,
    ) -> Result<Vec<Message>, RemoteError>;

    async fn set_password(&self, old_password: &str, new_password: &str) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::Message;

    #[test]
    fn message_uses_camel_case_wire_names() {
        let message: Message = serde_json::from_str(
            r#"{"messageId":7,"content":"device_1_abc|||DEVICE|||hi","timestamp":1700000000000000000}"#,
        )
        .expect("message should deserialize");
        assert_eq!(message.message_id, 7);
        assert_eq!(message.timestamp, 1_700_000_000_000_000_000);

        let value = serde_json::to_value(&message).expect("message should serialize");
        assert!(value.get("messageId").is_some());
        assert!(value.get("message_id").is_none());
    }
}
