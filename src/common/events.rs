use super::error::ChatError;
use super::types::{ChatHistoryEntry, Connection, Room};
use crate::session::Screen;

/// Sự kiện từ tầng mạng gửi lên UI.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ScreenChanged(Screen),
    Busy(bool),
    ContactsLoaded(Vec<Connection>),
    RoomOpened {
        room: Room,
        counterpart: Connection,
        history: Vec<ChatHistoryEntry>,
    },
    MessageAppended(ChatHistoryEntry),
    Error(ChatError),
}
