use serde_json::json;

use crate::common::{ChatError, ChatHistoryEntry, ChatResult, Connection, Room, RoomSnapshot};
use crate::network::protocol::EVENT_START_CHAT;

use super::connection::ConnectionSession;

/// Phòng vừa được gateway giải quyết, kèm lịch sử đã chiếu sang `ChatHistoryEntry`.
#[derive(Debug, Clone)]
pub struct RoomEntry {
    pub room: Room,
    pub counterpart: Connection,
    pub history: Vec<ChatHistoryEntry>,
}

/// Resolves (or creates) the room shared with a counterpart and owns the
/// active room id. At most one room is active.
#[derive(Default)]
pub struct ChatRoomController {
    active: Option<(Room, Connection)>,
}

impl ChatRoomController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_room_id(&self) -> Option<&str> {
        self.active.as_ref().map(|(room, _)| room.id.as_str())
    }

    #[cfg(test)]
    pub fn counterpart(&self) -> Option<&Connection> {
        self.active.as_ref().map(|(_, counterpart)| counterpart)
    }

    pub async fn enter(
        &mut self,
        session: &mut ConnectionSession,
        counterpart: Connection,
    ) -> ChatResult<RoomEntry> {
        if !session.is_identified() {
            return Err(ChatError::InvalidState("entering a room requires an identity"));
        }

        if let Some((previous, _)) = self.active.take() {
            log::info!("Abandoning room {}", previous.id);
        }

        let payload = json!({ "counterpart_id": counterpart.id });
        let data = session
            .request(EVENT_START_CHAT, payload)
            .await
            .map_err(|err| ChatError::RoomResolutionFailed(err.to_string()))?;
        let snapshot: RoomSnapshot = serde_json::from_value(data)
            .map_err(|err| ChatError::RoomResolutionFailed(err.to_string()))?;

        let history = snapshot
            .messages
            .into_iter()
            .map(ChatHistoryEntry::from_message)
            .collect::<Vec<_>>();
        log::info!(
            "Entered room {} with {} ({} messages)",
            snapshot.room.id,
            counterpart.display_name(),
            history.len()
        );

        self.active = Some((snapshot.room.clone(), counterpart.clone()));
        Ok(RoomEntry {
            room: snapshot.room,
            counterpart,
            history,
        })
    }

    /// Clears the active room and ends the whole session: a room lives on
    /// exactly one connection, so re-entering needs a fresh open + identify.
    pub async fn leave(&mut self, session: &mut ConnectionSession) {
        if let Some((room, _)) = self.active.take() {
            log::info!("Leaving room {}", room.id);
        }
        session.close().await;
    }

    /// Forget the room without touching the session (link already gone).
    pub fn abandon(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::common::Identity;
    use crate::network::testing::{FakeGateway, contact, message};
    use crate::session::connection::SessionState;

    async fn identified(gateway: &FakeGateway) -> ConnectionSession {
        let mut session = ConnectionSession::new(
            gateway.connector(),
            "ws://gateway.test".to_string(),
            Duration::from_millis(300),
        );
        session.open().await.unwrap();
        session
            .identify(&Identity::new("Ana", "ana@x.com", "119999"))
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn enter_projects_history_and_records_room() {
        let gateway = FakeGateway::new();
        gateway.set_room(
            "c1",
            "r1",
            vec![message("m1", "r1", "c1", "Olá"), message("m2", "r1", "me", "Oi")],
        );
        let mut session = identified(&gateway).await;
        let mut rooms = ChatRoomController::new();

        let entry = rooms.enter(&mut session, contact("c1", "Loja")).await.unwrap();

        assert_eq!(entry.room.id, "r1");
        assert_eq!(rooms.active_room_id(), Some("r1"));
        let ids: Vec<_> = entry.history.iter().map(|e| e.connection_id.as_str()).collect();
        assert_eq!(ids, ["c1", "me"]);
        assert!(entry.history[0].is_from(&entry.counterpart));

        let sent = gateway.sent_events(EVENT_START_CHAT);
        assert_eq!(sent[0].data["counterpart_id"], "c1");
    }

    #[tokio::test]
    async fn enter_requires_identified_session() {
        let gateway = FakeGateway::new();
        let mut session = ConnectionSession::new(
            gateway.connector(),
            "ws://gateway.test".to_string(),
            Duration::from_millis(300),
        );
        session.open().await.unwrap();
        let mut rooms = ChatRoomController::new();

        let err = rooms.enter(&mut session, contact("c1", "Loja")).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidState(_)));
        assert!(gateway.sent_events(EVENT_START_CHAT).is_empty());
    }

    #[tokio::test]
    async fn failed_resolution_leaves_no_active_room() {
        let gateway = FakeGateway::new();
        gateway.set_room("c1", "r1", Vec::new());
        let mut session = identified(&gateway).await;
        let mut rooms = ChatRoomController::new();
        rooms.enter(&mut session, contact("c1", "Loja")).await.unwrap();

        gateway.set_silent(true);
        let err = rooms.enter(&mut session, contact("c2", "Outra")).await.unwrap_err();

        assert!(matches!(err, ChatError::RoomResolutionFailed(_)));
        assert_eq!(rooms.active_room_id(), None);
    }

    #[tokio::test]
    async fn leave_closes_the_session() {
        let gateway = FakeGateway::new();
        gateway.set_room("c1", "r1", Vec::new());
        let mut session = identified(&gateway).await;
        let mut rooms = ChatRoomController::new();
        rooms.enter(&mut session, contact("c1", "Loja")).await.unwrap();

        rooms.leave(&mut session).await;

        assert_eq!(rooms.active_room_id(), None);
        assert!(rooms.counterpart().is_none());
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}
