pub mod commands;
pub mod error;
pub mod events;
pub mod types;

pub use commands::SessionCommand;
pub use error::{ChatError, ChatResult};
pub use events::SessionEvent;
pub use types::{
    ChatHistoryEntry, Connection, Identity, InboundMessage, Room, RoomSnapshot, StartResponse,
};
