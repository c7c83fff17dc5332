use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ActivityError>;

/// Where a piece of inbound data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    WebhookPayload,
    ExternalEvent,
    RequestBody,
    MessageData,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WebhookPayload => "webhook payload",
            Self::ExternalEvent => "external event",
            Self::RequestBody => "request body",
            Self::MessageData => "message data",
        })
    }
}

#[derive(Debug, Error)]
pub enum ActivityError {
    /// Non-fatal: population falls back to empty defaults after logging it.
    #[error("malformed {input}: {detail}")]
    MalformedInput { input: InputSource, detail: String },

    #[error("service url is not configured")]
    MissingServiceUrl,

    #[error("conversation id is required to address an activity")]
    MissingConversationId,

    #[error("invalid service url: {0}")]
    InvalidServiceUrl(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("send rejected: status={status} body={body}")]
    SendRejected { status: u16, body: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ActivityError {
    pub(crate) fn malformed(input: InputSource, detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            input,
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for ActivityError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<serde_json::Error> for ActivityError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
