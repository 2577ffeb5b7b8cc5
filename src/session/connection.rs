use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

use crate::common::{ChatError, ChatResult, Identity, InboundMessage, StartResponse};
use crate::network::protocol::{
    EVENT_DISCONNECT, EVENT_MESSAGE, EVENT_START, EVENT_START_RESPONSE, Frame,
};
use crate::network::transport::{Connector, GatewayLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Identifying,
    Identified,
    Closing,
}

/// Bảng định tuyến của dispatcher. Chỉ giữ khóa trong các đoạn đồng bộ.
#[derive(Default)]
struct Routes {
    pending_acks: HashMap<u64, oneshot::Sender<Value>>,
    start_waiter: Option<oneshot::Sender<Value>>,
    listener: Option<(u64, mpsc::UnboundedSender<InboundMessage>)>,
}

impl Routes {
    fn clear(&mut self) {
        self.pending_acks.clear();
        self.start_waiter = None;
        self.listener = None;
    }

    fn route(&mut self, frame: Frame, tag: &Uuid) {
        let Frame { event, data, ack } = frame;
        match (event.as_deref(), ack) {
            (None, Some(id)) => match self.pending_acks.remove(&id) {
                Some(waiter) => {
                    let _ = waiter.send(data);
                }
                None => log::debug!("[{tag}] ack {id} has no pending request"),
            },
            (Some(EVENT_START_RESPONSE), _) => match self.start_waiter.take() {
                Some(waiter) => {
                    let _ = waiter.send(data);
                }
                None => log::debug!("[{tag}] unsolicited start-response ignored"),
            },
            (Some(EVENT_MESSAGE), _) => {
                let inbound = match serde_json::from_value::<InboundMessage>(data) {
                    Ok(inbound) => inbound,
                    Err(err) => {
                        log::warn!("[{tag}] undecodable message event: {err}");
                        return;
                    }
                };
                match &self.listener {
                    Some((_, sender)) => {
                        if sender.send(inbound).is_err() {
                            log::debug!("[{tag}] message listener already gone");
                        }
                    }
                    None => log::debug!("[{tag}] message with no listener dropped"),
                }
            }
            (Some(other), _) => log::debug!("[{tag}] ignoring event `{other}`"),
            (None, None) => log::warn!("[{tag}] frame without event or ack skipped"),
        }
    }
}

struct LiveLink {
    outbound: mpsc::Sender<Frame>,
    routes: Arc<Mutex<Routes>>,
    dispatcher: JoinHandle<()>,
    dropped: oneshot::Receiver<()>,
}

/// Đăng ký nhận sự kiện `message` của phiên. Mỗi phiên chỉ có tối đa một.
pub struct MessageSubscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<InboundMessage>,
}

impl MessageSubscription {
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.receiver.recv().await
    }
}

/// Owns exactly one gateway link for the lifetime of the chat UI.
///
/// Lifecycle: `Disconnected -> Connecting -> Connected -> Identifying ->
/// Identified -> Closing -> Disconnected`. A dropped link returns to
/// `Disconnected`; reconnecting is always an explicit [`open`](Self::open).
pub struct ConnectionSession {
    connector: Arc<dyn Connector>,
    url: String,
    request_timeout: Duration,
    state: SessionState,
    tag: Uuid,
    link: Option<LiveLink>,
    next_id: u64,
}

impl ConnectionSession {
    pub fn new(connector: Arc<dyn Connector>, url: String, request_timeout: Duration) -> Self {
        Self {
            connector,
            url,
            request_timeout,
            state: SessionState::Disconnected,
            tag: Uuid::new_v4(),
            link: None,
            next_id: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_identified(&self) -> bool {
        self.state == SessionState::Identified
    }

    pub async fn open(&mut self) -> ChatResult<()> {
        if self.state != SessionState::Disconnected {
            return Err(ChatError::InvalidState("session is already open"));
        }

        self.state = SessionState::Connecting;
        self.tag = Uuid::new_v4();
        log::info!("[{}] Connecting to gateway {}", self.tag, self.url);

        let link = match timeout(self.request_timeout, self.connector.connect(&self.url)).await {
            Ok(Ok(link)) => link,
            Ok(Err(err)) => {
                self.state = SessionState::Disconnected;
                log::warn!("[{}] Gateway unreachable: {err}", self.tag);
                return Err(err);
            }
            Err(_) => {
                self.state = SessionState::Disconnected;
                log::warn!("[{}] Gateway connect timed out", self.tag);
                return Err(ChatError::Connectivity(format!(
                    "no answer from {} within {:?}",
                    self.url, self.request_timeout
                )));
            }
        };

        self.link = Some(spawn_dispatcher(link, self.tag));
        self.state = SessionState::Connected;
        log::info!("[{}] Gateway link established", self.tag);
        Ok(())
    }

    /// Sends `start {telephone, email}` and waits for `start-response`.
    ///
    /// On rejection the session stays `Connected` so a corrected identity
    /// can be submitted again.
    pub async fn identify(&mut self, identity: &Identity) -> ChatResult<()> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Identified => {
                return Err(ChatError::InvalidState("identity already set for this session"));
            }
            _ => return Err(ChatError::InvalidState("session is not connected")),
        }

        let (waiter, reply) = oneshot::channel();
        let outbound = {
            let link = self.live_link()?;
            link.routes.lock().await.start_waiter = Some(waiter);
            link.outbound.clone()
        };

        self.state = SessionState::Identifying;
        let payload = json!({ "telephone": identity.telephone, "email": identity.email });
        let outcome = match outbound.send(Frame::event(EVENT_START, payload)).await {
            Ok(()) => self.await_start_response(reply).await,
            Err(_) => Err(ChatError::Connectivity("gateway link closed".to_string())),
        };

        self.state = if outcome.is_ok() {
            log::info!("[{}] Identified as {}", self.tag, identity.email);
            SessionState::Identified
        } else {
            SessionState::Connected
        };
        outcome
    }

    async fn await_start_response(&self, reply: oneshot::Receiver<Value>) -> ChatResult<()> {
        let data = match timeout(self.request_timeout, reply).await {
            Ok(Ok(data)) => data,
            Ok(Err(_)) => {
                return Err(ChatError::Connectivity(
                    "gateway link closed during identify".to_string(),
                ));
            }
            Err(_) => {
                if let Some(link) = &self.link {
                    link.routes.lock().await.start_waiter = None;
                }
                return Err(ChatError::Connectivity(format!(
                    "no start-response within {:?}",
                    self.request_timeout
                )));
            }
        };

        let response: StartResponse = serde_json::from_value(data)?;
        if response.success {
            Ok(())
        } else {
            Err(ChatError::IdentityRejected(
                response
                    .error
                    .unwrap_or_else(|| "identity declined by gateway".to_string()),
            ))
        }
    }

    /// Emits `event` with a fresh ack id and resolves with the matching ack payload.
    pub async fn request(&mut self, event: &str, payload: Value) -> ChatResult<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let (waiter, reply) = oneshot::channel();

        let (outbound, routes) = {
            let link = self.live_link()?;
            (link.outbound.clone(), link.routes.clone())
        };
        routes.lock().await.pending_acks.insert(id, waiter);

        if outbound.send(Frame::request(event, payload, id)).await.is_err() {
            routes.lock().await.pending_acks.remove(&id);
            return Err(ChatError::Connectivity("gateway link closed".to_string()));
        }

        match timeout(self.request_timeout, reply).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(_)) => Err(ChatError::Connectivity(format!(
                "gateway link closed before `{event}` was answered"
            ))),
            Err(_) => {
                routes.lock().await.pending_acks.remove(&id);
                log::warn!("[{}] `{event}` timed out (ack {id})", self.tag);
                Err(ChatError::Connectivity(format!(
                    "no reply to `{event}` within {:?}",
                    self.request_timeout
                )))
            }
        }
    }

    /// Fire-and-forget frame.
    pub async fn emit(&mut self, event: &str, payload: Value) -> ChatResult<()> {
        let outbound = self.live_link()?.outbound.clone();
        outbound
            .send(Frame::event(event, payload))
            .await
            .map_err(|_| ChatError::Connectivity("gateway link closed".to_string()))
    }

    pub async fn subscribe_messages(&mut self) -> ChatResult<MessageSubscription> {
        self.next_id += 1;
        let id = self.next_id;
        let link = self.live_link()?;
        let mut routes = link.routes.lock().await;
        if routes.listener.is_some() {
            return Err(ChatError::InvalidState(
                "a message listener is already registered",
            ));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        routes.listener = Some((id, sender));
        log::debug!("[{}] message listener {id} registered", self.tag);
        Ok(MessageSubscription { id, receiver })
    }

    pub async fn unsubscribe(&mut self, subscription: MessageSubscription) {
        if let Some(link) = &self.link {
            let mut routes = link.routes.lock().await;
            if matches!(&routes.listener, Some((id, _)) if *id == subscription.id) {
                routes.listener = None;
                log::debug!("[{}] message listener {} removed", self.tag, subscription.id);
            }
        }
    }

    #[cfg(test)]
    pub async fn listener_count(&self) -> usize {
        match &self.link {
            Some(link) => usize::from(link.routes.lock().await.listener.is_some()),
            None => 0,
        }
    }

    /// Resolves once the live link ends without [`close`](Self::close).
    /// Pending forever while no link is open.
    pub async fn wait_dropped(&mut self) {
        match self.link.as_mut() {
            Some(link) => {
                let _ = (&mut link.dropped).await;
            }
            None => std::future::pending::<()>().await,
        }

        // Không còn await nào sau điểm này: hủy future giữa chừng không để lại trạng thái dở dang.
        // The dispatcher cleared the routes before signalling.
        self.link = None;
        self.state = SessionState::Disconnected;
        log::warn!("[{}] Gateway link dropped", self.tag);
    }

    /// Releases the link. Once this returns no inbound event reaches any
    /// listener. Closing an already closed session is a no-op.
    pub async fn close(&mut self) {
        let Some(link) = self.link.take() else {
            self.state = SessionState::Disconnected;
            return;
        };

        self.state = SessionState::Closing;
        link.routes.lock().await.clear();
        link.dispatcher.abort();
        if let Err(err) = link
            .outbound
            .try_send(Frame::event(EVENT_DISCONNECT, Value::Null))
        {
            log::debug!("[{}] disconnect frame not sent: {err}", self.tag);
        }
        self.state = SessionState::Disconnected;
        log::info!("[{}] Session closed", self.tag);
    }

    fn live_link(&self) -> ChatResult<&LiveLink> {
        self.link
            .as_ref()
            .ok_or(ChatError::InvalidState("session is not open"))
    }
}

fn spawn_dispatcher(link: GatewayLink, tag: Uuid) -> LiveLink {
    let GatewayLink {
        outbound,
        mut inbound,
    } = link;
    let routes = Arc::new(Mutex::new(Routes::default()));
    let (dropped_tx, dropped_rx) = oneshot::channel();

    let task_routes = routes.clone();
    let dispatcher = tokio::spawn(async move {
        while let Some(frame) = inbound.recv().await {
            task_routes.lock().await.route(frame, &tag);
        }
        task_routes.lock().await.clear();
        let _ = dropped_tx.send(());
    });

    LiveLink {
        outbound,
        routes,
        dispatcher,
        dropped: dropped_rx,
    }
}
