use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_START: &str = "start";
pub const EVENT_START_RESPONSE: &str = "start-response";
pub const EVENT_GET_CONNECTIONS: &str = "get_connections";
pub const EVENT_START_CHAT: &str = "start_chat";
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_DISCONNECT: &str = "disconnect";

/// Một khung JSON trên socket.
///
/// `{"event": "start", "data": {...}}` là sự kiện thường, thêm `"ack": 7` khi
/// cần gateway trả lời; `{"ack": 7, "data": ...}` (không có `event`) là lời đáp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
}

impl Frame {
    pub fn event(name: &str, data: Value) -> Self {
        Self {
            event: Some(name.to_string()),
            data,
            ack: None,
        }
    }

    pub fn request(name: &str, data: Value, ack: u64) -> Self {
        Self {
            event: Some(name.to_string()),
            data,
            ack: Some(ack),
        }
    }

    #[cfg(test)]
    pub fn ack_reply(ack: u64, data: Value) -> Self {
        Self {
            event: None,
            data,
            ack: Some(ack),
        }
    }

    pub fn is_event(&self, name: &str) -> bool {
        self.event.as_deref() == Some(name)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
