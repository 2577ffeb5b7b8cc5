//! In-memory gateway used by the unit tests.
//!
//! Scripted replies for `start`, `get_connections` and `start_chat`, echo of
//! outbound `message` frames, and a record of every frame the client sent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common::types::{ConnectionUser, Message};
use crate::common::{ChatError, ChatResult, Connection, InboundMessage};

use super::protocol::{
    EVENT_GET_CONNECTIONS, EVENT_MESSAGE, EVENT_START, EVENT_START_CHAT, EVENT_START_RESPONSE,
    Frame,
};
use super::transport::{Connector, GatewayLink};

struct Script {
    reachable: bool,
    silent: bool,
    echo: bool,
    identity_error: Option<String>,
    contacts: Value,
    rooms: HashMap<String, (String, Vec<Message>)>,
}

struct Shared {
    script: Script,
    sent: Vec<Frame>,
    to_client: Option<mpsc::Sender<Frame>>,
    connects: usize,
}

#[derive(Clone)]
pub struct FakeGateway {
    shared: Arc<Mutex<Shared>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let script = Script {
            reachable: true,
            silent: false,
            echo: true,
            identity_error: None,
            contacts: json!([]),
            rooms: HashMap::new(),
        };
        Self {
            shared: Arc::new(Mutex::new(Shared {
                script,
                sent: Vec::new(),
                to_client: None,
                connects: 0,
            })),
        }
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(FakeConnector {
            shared: self.shared.clone(),
        })
    }

    fn with_script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.shared.lock().unwrap().script);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.with_script(|s| s.reachable = reachable);
    }

    pub fn set_silent(&self, silent: bool) {
        self.with_script(|s| s.silent = silent);
    }

    pub fn set_echo(&self, echo: bool) {
        self.with_script(|s| s.echo = echo);
    }

    pub fn reject_identity(&self, reason: &str) {
        let reason = reason.to_string();
        self.with_script(|s| s.identity_error = Some(reason));
    }

    pub fn accept_identity(&self) {
        self.with_script(|s| s.identity_error = None);
    }

    pub fn set_contacts(&self, contacts: Vec<Connection>) {
        let contacts = serde_json::to_value(contacts).unwrap();
        self.with_script(|s| s.contacts = contacts);
    }

    pub fn set_raw_contacts(&self, contacts: Value) {
        self.with_script(|s| s.contacts = contacts);
    }

    pub fn set_room(&self, counterpart_id: &str, room_id: &str, messages: Vec<Message>) {
        let entry = (room_id.to_string(), messages);
        let key = counterpart_id.to_string();
        self.with_script(|s| {
            s.rooms.insert(key, entry);
        });
    }

    pub fn connects(&self) -> usize {
        self.shared.lock().unwrap().connects
    }

    pub fn sent_events(&self, name: &str) -> Vec<Frame> {
        self.shared
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|frame| frame.is_event(name))
            .cloned()
            .collect()
    }

    /// Pushes a frame to the client; false when no live link accepts it.
    pub fn push(&self, frame: Frame) -> bool {
        let sender = self.shared.lock().unwrap().to_client.clone();
        match sender {
            Some(sender) => sender.try_send(frame).is_ok(),
            None => false,
        }
    }

    pub fn push_message(&self, id: &str, room_id: &str, connection_id: &str, text: &str) -> bool {
        let payload = json!({
            "message": message(id, room_id, connection_id, text),
            "connection": connection_id,
        });
        self.push(Frame::event(EVENT_MESSAGE, payload))
    }

    /// Simulates the gateway going away.
    pub fn drop_link(&self) {
        self.shared.lock().unwrap().to_client = None;
    }

    /// Lets in-flight frames reach both ends.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

struct FakeConnector {
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &str) -> ChatResult<GatewayLink> {
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(100);
        let (inbound_tx, inbound_rx) = mpsc::channel::<Frame>(100);

        {
            let mut shared = self.shared.lock().unwrap();
            if !shared.script.reachable {
                return Err(ChatError::Connectivity("connection refused".to_string()));
            }
            shared.connects += 1;
            shared.to_client = Some(inbound_tx);
        }

        let shared = self.shared.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let (replies, sender) = {
                    let mut shared = shared.lock().unwrap();
                    shared.sent.push(frame.clone());
                    (respond(&shared.script, &frame), shared.to_client.clone())
                };
                let Some(sender) = sender else { continue };
                for reply in replies {
                    let _ = sender.send(reply).await;
                }
            }
        });

        Ok(GatewayLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

fn respond(script: &Script, frame: &Frame) -> Vec<Frame> {
    if script.silent {
        return Vec::new();
    }

    match (frame.event.as_deref(), frame.ack) {
        (Some(EVENT_START), _) => {
            let data = match &script.identity_error {
                Some(error) => json!({ "success": false, "error": error }),
                None => json!({ "success": true }),
            };
            vec![Frame::event(EVENT_START_RESPONSE, data)]
        }
        (Some(EVENT_GET_CONNECTIONS), Some(ack)) => {
            vec![Frame::ack_reply(ack, script.contacts.clone())]
        }
        (Some(EVENT_START_CHAT), Some(ack)) => {
            let counterpart = frame.data["counterpart_id"].as_str().unwrap_or_default();
            let (room_id, messages) = script
                .rooms
                .get(counterpart)
                .cloned()
                .unwrap_or_else(|| (format!("room-{counterpart}"), Vec::new()));
            let data = json!({
                "room": { "id": room_id, "created_at": "2024-03-01T10:00:00Z" },
                "messages": messages,
            });
            vec![Frame::ack_reply(ack, data)]
        }
        (Some(EVENT_MESSAGE), _) if script.echo => {
            let room_id = frame.data["room_id"].as_str().unwrap_or_default();
            let text = frame.data["text"].as_str().unwrap_or_default();
            let id = Uuid::new_v4().to_string();
            let data = json!({
                "message": message(&id, room_id, "me", text),
                "connection": "me",
            });
            vec![Frame::event(EVENT_MESSAGE, data)]
        }
        _ => Vec::new(),
    }
}

pub fn contact(id: &str, name: &str) -> Connection {
    Connection {
        id: id.to_string(),
        socket_id: format!("sock-{id}"),
        created_at: None,
        user: ConnectionUser {
            id: format!("user-{id}"),
            name: name.to_string(),
            email: format!("{id}@example.com"),
            avatar: None,
        },
    }
}

pub fn message(id: &str, room_id: &str, connection_id: &str, text: &str) -> Message {
    Message {
        id: id.to_string(),
        author_name: connection_id.to_string(),
        text: text.to_string(),
        room_id: room_id.to_string(),
        connection_id: connection_id.to_string(),
        socket_id: format!("sock-{connection_id}"),
        connection: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn inbound(id: &str, room_id: &str, connection_id: &str, text: &str) -> InboundMessage {
    InboundMessage {
        message: message(id, room_id, connection_id, text),
        connection_id: connection_id.to_string(),
    }
}
