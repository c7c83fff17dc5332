//! Skype activity adapter.
//!
//! Maps Bot Framework webhook activities (and relayed HyperChat events) onto a
//! small identity context, derives stable identifiers from it, and sends
//! replies in the connector's activity shape through an [`ActivitySender`].

mod client;
mod connector;
mod context;
mod error;
mod identity;
mod mapping;
mod traits;
mod types;

pub use client::SkypeApiClient;
pub use connector::{BotConnectorSender, DEFAULT_TIMEOUT};
pub use context::{ActivityContext, ContextSnapshot, extract_service_url};
pub use error::{ActivityError, InputSource, Result};
pub use identity::{
    EXTERNAL_ID_DELIMITER, PLATFORM_TAG, external_id, placeholder_email, sanitize,
    session_id_from_request_body, user_id_from_external_id,
};
pub use traits::ActivitySender;
pub use types::{
    Activity, ActivityType, Attachment, AttachmentLayout, CardAction, ChannelAccount, ExternalId,
    HyperChatAttachment, OutgoingMessage, SendReceipt, SessionId, SuggestedActions,
};
