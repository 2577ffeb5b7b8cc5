use serde_json::Value;

use crate::common::{ChatError, Connection};
use crate::network::protocol::EVENT_GET_CONNECTIONS;

use super::connection::ConnectionSession;

/// Kết quả một lần lấy danh bạ: luôn là danh sách đầy đủ hoặc rỗng.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryListing {
    pub contacts: Vec<Connection>,
    pub warning: Option<ChatError>,
}

/// Point-in-time snapshot of reachable counterparts, fetched once per session.
#[derive(Default)]
pub struct ContactDirectory {
    snapshot: Option<Vec<Connection>>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn contacts(&self) -> &[Connection] {
        self.snapshot.as_deref().unwrap_or(&[])
    }

    /// Returns the cached snapshot, fetching it on first use.
    pub async fn list(&mut self, session: &mut ConnectionSession) -> DirectoryListing {
        if let Some(contacts) = &self.snapshot {
            return DirectoryListing {
                contacts: contacts.clone(),
                warning: None,
            };
        }

        if !session.is_identified() {
            return DirectoryListing {
                contacts: Vec::new(),
                warning: Some(ChatError::InvalidState(
                    "contacts require an identified session",
                )),
            };
        }

        match fetch(session).await {
            Ok(contacts) => {
                log::info!("Loaded {} contacts", contacts.len());
                self.snapshot = Some(contacts.clone());
                DirectoryListing {
                    contacts,
                    warning: None,
                }
            }
            Err(err) => {
                log::warn!("Contact directory unavailable: {err}");
                DirectoryListing {
                    contacts: Vec::new(),
                    warning: Some(ChatError::DirectoryUnavailable(err.to_string())),
                }
            }
        }
    }

    pub async fn refresh(&mut self, session: &mut ConnectionSession) -> DirectoryListing {
        self.snapshot = None;
        self.list(session).await
    }

    pub fn reset(&mut self) {
        self.snapshot = None;
    }
}

async fn fetch(session: &mut ConnectionSession) -> Result<Vec<Connection>, ChatError> {
    let data = session.request(EVENT_GET_CONNECTIONS, Value::Null).await?;
    Ok(serde_json::from_value(data)?)
}
