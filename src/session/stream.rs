use serde_json::json;

use crate::common::{ChatHistoryEntry, ChatResult, InboundMessage};
use crate::network::protocol::EVENT_MESSAGE;

use super::connection::{ConnectionSession, MessageSubscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Blank text; nothing reached the transport.
    IgnoredEmpty,
}

/// Outbound sends, the single inbound listener of the open room, and the
/// room's append-only history in delivery order.
#[derive(Default)]
pub struct MessageStream {
    room_id: Option<String>,
    subscription: Option<MessageSubscription>,
    history: Vec<ChatHistoryEntry>,
}

impl MessageStream {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn history(&self) -> &[ChatHistoryEntry] {
        &self.history
    }

    /// Registers the room's listener once and seeds the hydrated history.
    pub async fn attach(
        &mut self,
        session: &mut ConnectionSession,
        room_id: &str,
        history: Vec<ChatHistoryEntry>,
    ) -> ChatResult<()> {
        self.detach(session).await;
        self.subscription = Some(session.subscribe_messages().await?);
        self.room_id = Some(room_id.to_string());
        self.history = history;
        Ok(())
    }

    /// Deregisters the listener and forgets the room's history.
    pub async fn detach(&mut self, session: &mut ConnectionSession) {
        if let Some(subscription) = self.subscription.take() {
            session.unsubscribe(subscription).await;
        }
        self.discard();
    }

    /// Drops listener and history when the link is already gone.
    pub fn discard(&mut self) {
        self.subscription = None;
        self.room_id = None;
        self.history.clear();
    }

    /// Fire-and-forget: the authoritative copy comes back through the
    /// inbound listener, so history is left untouched here.
    pub async fn send(
        &self,
        session: &mut ConnectionSession,
        room_id: &str,
        text: &str,
    ) -> ChatResult<SendOutcome> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::IgnoredEmpty);
        }

        session
            .emit(EVENT_MESSAGE, json!({ "text": text, "room_id": room_id }))
            .await?;
        Ok(SendOutcome::Sent)
    }

    /// Next inbound message for the attached room. Pending forever when detached.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Appends `inbound` if it belongs to the open room; returns the new entry.
    pub fn apply(&mut self, inbound: InboundMessage) -> Option<&ChatHistoryEntry> {
        match self.room_id.as_deref() {
            Some(room_id) if room_id == inbound.message.room_id => {
                self.history.push(inbound.into_entry());
                self.history.last()
            }
            Some(room_id) => {
                log::debug!(
                    "Dropping message {} for room {} (open room {room_id})",
                    inbound.message.id,
                    inbound.message.room_id
                );
                None
            }
            None => {
                log::debug!("Dropping message {} with no open room", inbound.message.id);
                None
            }
        }
    }
}
