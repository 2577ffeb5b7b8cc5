use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::common::{ChatError, ChatResult};

use super::protocol::{EVENT_DISCONNECT, Frame};

const LINK_CAPACITY: usize = 100;

/// Hai đầu kênh của một kết nối sống tới gateway.
///
/// Dropping `outbound` closes the socket; `inbound` yields `None` once the
/// gateway side is gone.
pub struct GatewayLink {
    pub outbound: mpsc::Sender<Frame>,
    pub inbound: mpsc::Receiver<Frame>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> ChatResult<GatewayLink>;
}

/// Connector dùng WebSocket thật (tokio-tungstenite).
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> ChatResult<GatewayLink> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|err| ChatError::Connectivity(err.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(LINK_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<Frame>(LINK_CAPACITY);

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let closing = frame.is_event(EVENT_DISCONNECT);
                match frame.encode() {
                    Ok(text) => {
                        if let Err(err) = sink.send(WsMessage::Text(text.into())).await {
                            log::warn!("Socket write failed: {err}");
                            break;
                        }
                    }
                    Err(err) => log::warn!("Failed to encode frame: {err}"),
                }
                if closing {
                    break;
                }
            }
            if let Err(err) = sink.close().await {
                log::debug!("Socket close: {err}");
            }
        });

        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let text = match message {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        log::warn!("Socket read failed: {err}");
                        break;
                    }
                };
                match Frame::decode(text.as_str()) {
                    Ok(frame) => {
                        if inbound_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => log::warn!("Skipping malformed frame: {err}"),
                }
            }
            log::info!("Gateway socket reader finished");
        });

        Ok(GatewayLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
