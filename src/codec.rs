//! Device attribution for message content.
//!
//! Outgoing text is prefixed with the sender's device id and a fixed
//! separator. Decoding splits on the first separator only, so text that
//! itself contains the separator survives intact. Content without any
//! separator predates attribution and is assigned to [`UNKNOWN_DEVICE`].

use crate::identity::DeviceId;

pub const SEPARATOR: &str = "|||DEVICE|||";
pub const UNKNOWN_DEVICE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub device_id: String,
    pub text: String,
}

pub fn encode(text: &str, device_id: &DeviceId) -> String {
    format!("{}{SEPARATOR}{text}", device_id.as_str())
}

pub fn decode(content: &str) -> DecodedMessage {
    match content.split_once(SEPARATOR) {
        Some((device_id, text)) => DecodedMessage {
            device_id: device_id.to_string(),
            text: text.to_string(),
        },
        None => DecodedMessage {
            device_id: UNKNOWN_DEVICE.to_string(),
            text: content.to_string(),
        },
    }
}

pub fn is_own(content: &str, device_id: &DeviceId) -> bool {
    decode(content).device_id == device_id.as_str()
}
