use std::sync::LazyLock;

use regex::Regex;

use crate::common::{
    ChatError, ChatHistoryEntry, ChatResult, Connection, Identity, InboundMessage,
};

use super::connection::{ConnectionSession, SessionState};
use super::directory::{ContactDirectory, DirectoryListing};
use super::room::{ChatRoomController, RoomEntry};
use super::stream::{MessageStream, SendOutcome};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});
static TELEPHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ()\-]{3,}$").expect("telephone pattern is valid")
});

/// Màn hình hiện tại của khung chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Identify,
    Directory,
    Conversation,
}

/// Something the machine must react to without a UI command.
#[derive(Debug)]
pub enum Signal {
    Inbound(InboundMessage),
    LinkDropped,
}

/// Drives `Identify -> Directory -> Conversation -> Identify` on top of the
/// session components. Every failure lands in `Identify` or `Directory`.
pub struct ChatSessionStateMachine {
    screen: Screen,
    session: ConnectionSession,
    directory: ContactDirectory,
    rooms: ChatRoomController,
    stream: MessageStream,
    last_error: Option<ChatError>,
}

impl ChatSessionStateMachine {
    pub fn new(session: ConnectionSession) -> Self {
        Self {
            screen: Screen::Identify,
            session,
            directory: ContactDirectory::new(),
            rooms: ChatRoomController::new(),
            stream: MessageStream::new(),
            last_error: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[cfg(test)]
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn last_error(&self) -> Option<&ChatError> {
        self.last_error.as_ref()
    }

    #[cfg(test)]
    pub fn contacts(&self) -> &[Connection] {
        self.directory.contacts()
    }

    #[cfg(test)]
    pub fn history(&self) -> &[ChatHistoryEntry] {
        self.stream.history()
    }

    #[cfg(test)]
    pub fn active_room_id(&self) -> Option<&str> {
        self.rooms.active_room_id()
    }

    #[cfg(test)]
    pub fn counterpart(&self) -> Option<&Connection> {
        self.rooms.counterpart()
    }

    #[cfg(test)]
    pub async fn listener_count(&self) -> usize {
        self.session.listener_count().await
    }

    fn fail<T>(&mut self, err: ChatError) -> ChatResult<T> {
        self.last_error = Some(err.clone());
        Err(err)
    }

    /// Opens the gateway link (mount, or the manual retry after a drop).
    pub async fn open(&mut self) -> ChatResult<()> {
        if self.session.state() != SessionState::Disconnected {
            return Ok(());
        }
        match self.session.open().await {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Manual retry after a connectivity error. No-op while a link is live.
    pub async fn reconnect(&mut self) -> ChatResult<()> {
        log::info!("Reconnect requested");
        self.open().await
    }

    /// Identify form submit. Ends in `Directory` on success; otherwise stays
    /// in `Identify` with the error recorded.
    pub async fn submit_identity(&mut self, identity: Identity) -> ChatResult<DirectoryListing> {
        if self.screen != Screen::Identify {
            return self.fail(ChatError::InvalidState("identity already submitted"));
        }
        if let Err(err) = validate_identity(&identity) {
            return self.fail(err);
        }

        self.open().await?;
        if let Err(err) = self.session.identify(&identity).await {
            if err.is_connectivity() {
                self.session.close().await;
            }
            return self.fail(err);
        }

        self.screen = Screen::Directory;
        self.last_error = None;
        let listing = self.directory.list(&mut self.session).await;
        if let Some(warning) = &listing.warning {
            self.last_error = Some(warning.clone());
        }
        Ok(listing)
    }

    pub async fn refresh_contacts(&mut self) -> ChatResult<DirectoryListing> {
        if self.screen != Screen::Directory {
            return self.fail(ChatError::InvalidState("contacts are shown only in the directory"));
        }
        let listing = self.directory.refresh(&mut self.session).await;
        self.last_error = listing.warning.clone();
        Ok(listing)
    }

    /// Opens the room shared with `counterpart`. From `Conversation` this is a
    /// room switch: the old listener and history go first.
    pub async fn enter(&mut self, counterpart: Connection) -> ChatResult<RoomEntry> {
        if self.screen == Screen::Identify {
            return self.fail(ChatError::InvalidState("identify before choosing a contact"));
        }

        self.stream.detach(&mut self.session).await;
        let entry = match self.rooms.enter(&mut self.session, counterpart).await {
            Ok(entry) => entry,
            Err(err) => {
                self.screen = Screen::Directory;
                return self.fail(err);
            }
        };

        if let Err(err) = self
            .stream
            .attach(&mut self.session, &entry.room.id, entry.history.clone())
            .await
        {
            self.rooms.abandon();
            self.screen = Screen::Directory;
            return self.fail(ChatError::RoomResolutionFailed(err.to_string()));
        }

        self.screen = Screen::Conversation;
        self.last_error = None;
        Ok(entry)
    }

    pub async fn send(&mut self, text: &str) -> ChatResult<SendOutcome> {
        let Some(room_id) = self.rooms.active_room_id().map(str::to_string) else {
            return self.fail(ChatError::InvalidState("no room is open"));
        };
        match self.stream.send(&mut self.session, &room_id, text).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.fail(err),
        }
    }

    /// Leaves the room and, with it, the connection. Back to `Identify`.
    pub async fn leave(&mut self) {
        self.stream.detach(&mut self.session).await;
        self.rooms.leave(&mut self.session).await;
        self.directory.reset();
        self.screen = Screen::Identify;
        self.last_error = None;
    }

    /// Unmount: close whatever is open, from any screen.
    pub async fn shutdown(&mut self) {
        self.stream.detach(&mut self.session).await;
        self.rooms.abandon();
        self.session.close().await;
        self.directory.reset();
        self.screen = Screen::Identify;
    }

    /// Waits for the next inbound message of the open room or a link drop.
    pub async fn next_signal(&mut self) -> Signal {
        tokio::select! {
            _ = self.session.wait_dropped() => Signal::LinkDropped,
            Some(inbound) = self.stream.recv() => Signal::Inbound(inbound),
        }
    }

    /// Applies a signal; returns the history entry it appended, if any.
    pub fn handle_signal(&mut self, signal: Signal) -> Option<ChatHistoryEntry> {
        match signal {
            Signal::Inbound(inbound) => self.stream.apply(inbound).cloned(),
            Signal::LinkDropped => {
                self.stream.discard();
                self.rooms.abandon();
                self.directory.reset();
                self.screen = Screen::Identify;
                self.last_error = Some(ChatError::Connectivity(
                    "connection to the chat gateway was lost".to_string(),
                ));
                None
            }
        }
    }
}

pub fn validate_identity(identity: &Identity) -> ChatResult<()> {
    if identity.name.trim().is_empty() {
        return Err(ChatError::InvalidIdentity("name is required".to_string()));
    }
    if !EMAIL_PATTERN.is_match(identity.email.trim()) {
        return Err(ChatError::InvalidIdentity(format!(
            "`{}` is not an email address",
            identity.email
        )));
    }
    if !TELEPHONE_PATTERN.is_match(identity.telephone.trim()) {
        return Err(ChatError::InvalidIdentity(format!(
            "`{}` is not a telephone number",
            identity.telephone
        )));
    }
    Ok(())
}
