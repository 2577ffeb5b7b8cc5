use super::types::{Connection, Identity};

/// Lệnh UI gửi xuống tầng mạng.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Open the gateway link again after a connectivity failure.
    Reconnect,
    SubmitIdentity(Identity),
    /// Fetch the contact list again (retry after `DirectoryUnavailable`).
    RefreshContacts,
    EnterRoom(Connection),
    SendMessage(String),
    /// Leave the room; this also ends the gateway connection.
    LeaveRoom,
}
