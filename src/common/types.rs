use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thông tin khách nhập ở màn hình chào. Chỉ tồn tại trong bộ nhớ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub telephone: String,
}

impl Identity {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        telephone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            telephone: telephone.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Một bên (khách hoặc doanh nghiệp) đang có socket sống trên gateway.
/// `id` ổn định, `socket_id` đổi sau mỗi lần kết nối lại.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    #[serde(default)]
    pub socket_id: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: ConnectionUser,
}

impl Connection {
    pub fn display_name(&self) -> &str {
        if self.user.name.is_empty() {
            &self.id
        } else {
            &self.user.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Domain model đại diện một tin nhắn chat. Bất biến sau khi gateway tạo ra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default, alias = "name")]
    pub author_name: String,
    pub text: String,
    #[serde(alias = "chatroom_id")]
    pub room_id: String,
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub socket_id: String,
    #[serde(default)]
    pub connection: Option<Connection>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Một dòng trong lịch sử hiển thị: tin nhắn kèm connection đã gửi nó.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatHistoryEntry {
    pub message: Message,
    pub connection_id: String,
}

impl ChatHistoryEntry {
    pub fn from_message(message: Message) -> Self {
        let connection_id = message.connection_id.clone();
        Self {
            message,
            connection_id,
        }
    }

    pub fn is_from(&self, connection: &Connection) -> bool {
        self.connection_id == connection.id
    }
}

/// Payload of the `start-response` push.
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Ack payload of `start_chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomSnapshot {
    pub room: Room,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Payload of an inbound `message` event.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub message: Message,
    #[serde(rename = "connection")]
    pub connection_id: String,
}

impl InboundMessage {
    pub fn into_entry(self) -> ChatHistoryEntry {
        ChatHistoryEntry {
            message: self.message,
            connection_id: self.connection_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_accepts_legacy_field_names() {
        let json = serde_json::json!({
            "id": "m1",
            "name": "Ana",
            "text": "Oi",
            "chatroom_id": "r1",
            "connection_id": "c9",
            "socket_id": "s1",
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        });

        let message: Message = serde_json::from_value(json).unwrap();
        assert_eq!(message.author_name, "Ana");
        assert_eq!(message.room_id, "r1");
        assert!(message.created_at.is_some());
        assert!(message.connection.is_none());
    }

    #[test]
    fn inbound_message_pairs_connection_id() {
        let json = serde_json::json!({
            "message": { "id": "m1", "text": "Hello", "room_id": "r1", "connection_id": "c1" },
            "connection": "c2"
        });

        let inbound: InboundMessage = serde_json::from_value(json).unwrap();
        let entry = inbound.into_entry();
        assert_eq!(entry.connection_id, "c2");
        assert_eq!(entry.message.text, "Hello");
    }

    #[test]
    fn connection_tolerates_missing_optional_fields() {
        let json = serde_json::json!({ "id": "c1", "user": { "id": "u1", "name": "Loja" } });
        let connection: Connection = serde_json::from_value(json).unwrap();
        assert_eq!(connection.display_name(), "Loja");
        assert!(connection.user.avatar.is_none());
        assert!(connection.socket_id.is_empty());
    }

    #[test]
    fn history_entry_knows_its_author() {
        let counterpart: Connection =
            serde_json::from_value(serde_json::json!({ "id": "c1" })).unwrap();
        let message: Message = serde_json::from_value(serde_json::json!({
            "id": "m1", "text": "Hi", "room_id": "r1", "connection_id": "c1"
        }))
        .unwrap();

        let entry = ChatHistoryEntry::from_message(message);
        assert!(entry.is_from(&counterpart));
        assert_eq!(counterpart.display_name(), "c1");
    }
}
