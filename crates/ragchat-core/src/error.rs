use thiserror::Error;

/// Why a chat exchange with the backend failed.
///
/// The user only ever sees one generic message; the variants exist so the
/// cause ends up in the log.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid chat endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("chat request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("chat backend returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("chat backend returned an unreadable body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
