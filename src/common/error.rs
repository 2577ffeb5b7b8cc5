use thiserror::Error;

/// Lỗi mà lõi chat có thể đẩy lên UI. Không lỗi nào làm dừng tiến trình.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Gateway unreachable, link dropped or a round trip timed out.
    #[error("gateway connectivity lost: {0}")]
    Connectivity(String),

    #[error("identity rejected: {0}")]
    IdentityRejected(String),

    #[error("contact directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("could not open chat room: {0}")]
    RoomResolutionFailed(String),

    /// Local form validation; never reaches the transport.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("operation not allowed: {0}")]
    InvalidState(&'static str),

    #[error("malformed gateway payload: {0}")]
    Protocol(String),
}

impl ChatError {
    /// Connectivity failures are the only ones the user recovers from with "retry".
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ChatError::Connectivity(_))
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Protocol(err.to_string())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
