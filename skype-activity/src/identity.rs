//! Identifier helpers shared by the context and the connector layer.
//!
//! The external id format `skype--<conversation>--<user>` is read back by other
//! systems, so it must not change.

use crate::error::{ActivityError, InputSource, Result};
use crate::types::{ExternalId, SessionId};

pub const PLATFORM_TAG: &str = "skype";
pub const EXTERNAL_ID_DELIMITER: &str = "--";
pub const EMAIL_DOMAIN: &str = "skype.com";

/// Strips every character outside `[A-Za-z0-9-]`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect()
}

pub fn external_id(conversation_id: &str, user_id: &str) -> ExternalId {
    ExternalId::new(format!(
        "{PLATFORM_TAG}{EXTERNAL_ID_DELIMITER}{}{EXTERNAL_ID_DELIMITER}{}",
        sanitize(conversation_id),
        sanitize(user_id)
    ))
}

/// Returns the user id part of an id built by [`external_id`], or `None` when
/// the id belongs to another platform.
///
/// The user id is the last `--` segment, so a sanitized user id that itself
/// contains `--` only comes back partially.
pub fn user_id_from_external_id(external_id: &str) -> Option<String> {
    let mut segments = external_id.split(EXTERNAL_ID_DELIMITER);
    if segments.next() != Some(PLATFORM_TAG) {
        return None;
    }
    segments.last().map(ToOwned::to_owned)
}

pub fn placeholder_email(user_name: &str, user_id: &str) -> String {
    format!(
        "{}_{}@{EMAIL_DOMAIN}",
        sanitize(user_name),
        sanitize(user_id)
    )
}

/// Derives a session key from the raw body of an inbound webhook request.
///
/// Returns `None` when the body carries no `conversation.id`. A body that is
/// not JSON is logged and treated the same way.
pub fn session_id_from_request_body(body: &str) -> Option<SessionId> {
    match conversation_id_from_body(body) {
        Ok(Some(conversation_id)) => Some(SessionId::new(sanitize(&conversation_id))),
        Ok(None) => None,
        Err(error) => {
            tracing::warn!(%error, "unable to derive session id");
            None
        }
    }
}

fn conversation_id_from_body(body: &str) -> Result<Option<String>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ActivityError::malformed(InputSource::RequestBody, e.to_string()))?;
    Ok(value
        .get("conversation")
        .and_then(|conversation| conversation.get("id"))
        .and_then(crate::mapping::non_empty_string))
}
