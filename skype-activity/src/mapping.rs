//! Field mapping from inbound shapes into an [`ActivityContext`].
//!
//! Both inbound shapes are reduced to a JSON object and run through
//! [`apply_field_map`] with their own table. The tables are the single place
//! where the from/recipient orientation is decided:
//!
//! | source key           | webhook payload  | external event   |
//! |----------------------|------------------|------------------|
//! | `conversation.id`    | conversation id  | conversation id  |
//! | `conversation.name`  | conversation name| conversation name|
//! | `recipient.id/name`  | **from** (bot)   | recipient (user) |
//! | `from.id/name`       | **recipient** (user) | from (bot)   |
//! | `locale`             | locale           | locale           |
//! | `id`                 | reply-to id      | -                |
//! | `replyToId`          | -                | reply-to id      |
//! | `serviceUrl`         | -                | service url      |
//!
//! The webhook swap is required: an inbound activity is addressed *to* the bot,
//! and replies go back the other way. External events carry the snapshot
//! written by [`ActivityContext::message_data`], which is already in outbound
//! orientation.
//!
//! [`ActivityContext`]: crate::ActivityContext
//! [`ActivityContext::message_data`]: crate::ActivityContext::message_data

use crate::error::{ActivityError, InputSource, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    ConversationId,
    ConversationName,
    FromId,
    FromName,
    RecipientId,
    RecipientName,
    Locale,
    ReplyToId,
    ServiceUrl,
}

#[derive(Debug)]
pub(crate) struct FieldMapping {
    path: &'static [&'static str],
    slot: Slot,
}

const fn map(path: &'static [&'static str], slot: Slot) -> FieldMapping {
    FieldMapping { path, slot }
}

pub(crate) const WEBHOOK_FIELD_MAP: &[FieldMapping] = &[
    map(&["conversation", "id"], Slot::ConversationId),
    map(&["conversation", "name"], Slot::ConversationName),
    map(&["recipient", "id"], Slot::FromId),
    map(&["recipient", "name"], Slot::FromName),
    map(&["from", "id"], Slot::RecipientId),
    map(&["from", "name"], Slot::RecipientName),
    map(&["locale"], Slot::Locale),
    map(&["id"], Slot::ReplyToId),
];

pub(crate) const EXTERNAL_EVENT_FIELD_MAP: &[FieldMapping] = &[
    map(&["conversation", "id"], Slot::ConversationId),
    map(&["conversation", "name"], Slot::ConversationName),
    map(&["recipient", "id"], Slot::RecipientId),
    map(&["recipient", "name"], Slot::RecipientName),
    map(&["from", "id"], Slot::FromId),
    map(&["from", "name"], Slot::FromName),
    map(&["locale"], Slot::Locale),
    map(&["replyToId"], Slot::ReplyToId),
    map(&["serviceUrl"], Slot::ServiceUrl),
];

/// Normalized result of one mapping pass. Every identity field is present;
/// `service_url` is only set when the source carried a non-empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MappedFields {
    pub conversation_id: String,
    pub conversation_name: String,
    pub from_id: String,
    pub from_name: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub locale: String,
    pub reply_to_id: String,
    pub service_url: Option<String>,
}

impl MappedFields {
    fn assign(&mut self, slot: Slot, value: String) {
        match slot {
            Slot::ConversationId => self.conversation_id = value,
            Slot::ConversationName => self.conversation_name = value,
            Slot::FromId => self.from_id = value,
            Slot::FromName => self.from_name = value,
            Slot::RecipientId => self.recipient_id = value,
            Slot::RecipientName => self.recipient_name = value,
            Slot::Locale => self.locale = value,
            Slot::ReplyToId => self.reply_to_id = value,
            Slot::ServiceUrl => self.service_url = Some(value),
        }
    }
}

pub(crate) fn apply_field_map(
    table: &[FieldMapping],
    object: &Map<String, Value>,
    input: InputSource,
) -> MappedFields {
    let mut fields = MappedFields::default();
    for mapping in table {
        match lookup(object, mapping.path) {
            Lookup::Found(value) => fields.assign(mapping.slot, value),
            Lookup::Absent => {}
            Lookup::WrongType(found) => {
                let error = ActivityError::malformed(
                    input,
                    format!(
                        "field {} has unexpected type {found}",
                        mapping.path.join(".")
                    ),
                );
                tracing::warn!(%error, "ignoring field");
            }
        }
    }
    fields
}

enum Lookup {
    Found(String),
    Absent,
    WrongType(&'static str),
}

fn lookup(object: &Map<String, Value>, path: &[&str]) -> Lookup {
    let Some((first, rest)) = path.split_first() else {
        return Lookup::Absent;
    };
    let mut current = match object.get(*first) {
        Some(value) => value,
        None => return Lookup::Absent,
    };
    for key in rest {
        current = match current {
            Value::Object(inner) => match inner.get(*key) {
                Some(value) => value,
                None => return Lookup::Absent,
            },
            Value::Null => return Lookup::Absent,
            other => return Lookup::WrongType(type_name(other)),
        };
    }
    match current {
        Value::String(_) | Value::Number(_) | Value::Null => {
            non_empty_string(current).map_or(Lookup::Absent, Lookup::Found)
        }
        other => Lookup::WrongType(type_name(other)),
    }
}

/// Strings and numbers render as text; empty strings and everything else are
/// treated as absent.
pub(crate) fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parses a raw webhook body into its top-level object. `Ok(None)` means the
/// body was empty.
pub(crate) fn parse_webhook_object(raw: &str) -> Result<Option<Map<String, Value>>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ActivityError::malformed(InputSource::WebhookPayload, e.to_string()))?;
    match value {
        Value::Object(object) => Ok(Some(object)),
        other => Err(ActivityError::malformed(
            InputSource::WebhookPayload,
            format!("expected an object, found {}", type_name(&other)),
        )),
    }
}

/// Returns the external event as an object, or `None` for empty or
/// non-object input.
pub(crate) fn external_event_object(data: &Value) -> Option<&Map<String, Value>> {
    match data {
        Value::Object(object) if !object.is_empty() => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EXTERNAL_EVENT_FIELD_MAP, MappedFields, WEBHOOK_FIELD_MAP, apply_field_map,
        external_event_object, non_empty_string, parse_webhook_object,
    };
    use crate::error::{ActivityError, InputSource};

    fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(object) => object,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn webhook_map_swaps_from_and_recipient() {
        let payload = object(serde_json::json!({
            "conversation": { "id": "c1", "name": "Team" },
            "recipient": { "id": "bot1", "name": "Bot" },
            "from": { "id": "u1", "name": "Al" },
            "locale": "en-US",
            "id": "m5",
            "replyToId": "ignored",
            "serviceUrl": "https://ignored.example"
        }));
        let fields = apply_field_map(WEBHOOK_FIELD_MAP, &payload, InputSource::WebhookPayload);
        assert_eq!(
            fields,
            MappedFields {
                conversation_id: "c1".to_string(),
                conversation_name: "Team".to_string(),
                from_id: "bot1".to_string(),
                from_name: "Bot".to_string(),
                recipient_id: "u1".to_string(),
                recipient_name: "Al".to_string(),
                locale: "en-US".to_string(),
                reply_to_id: "m5".to_string(),
                service_url: None,
            }
        );
    }

    #[test]
    fn external_event_map_keeps_snapshot_orientation() {
        let data = object(serde_json::json!({
            "from": { "id": "bot1", "name": "Bot" },
            "conversation": { "id": "c1", "name": "Team" },
            "recipient": { "id": "u1", "name": "Al" },
            "replyToId": "m5",
            "serviceUrl": "https://smba.example/emea/"
        }));
        let fields = apply_field_map(EXTERNAL_EVENT_FIELD_MAP, &data, InputSource::ExternalEvent);
        assert_eq!(fields.from_id, "bot1");
        assert_eq!(fields.recipient_id, "u1");
        assert_eq!(fields.conversation_name, "Team");
        assert_eq!(fields.reply_to_id, "m5");
        assert_eq!(fields.service_url.as_deref(), Some("https://smba.example/emea/"));
    }

    #[test]
    fn wrong_types_and_missing_nesting_resolve_to_empty() {
        let payload = object(serde_json::json!({
            "conversation": "c1",
            "recipient": null,
            "from": { "id": { "nested": true }, "name": ["Al"] },
            "locale": false,
            "id": 42
        }));
        let fields = apply_field_map(WEBHOOK_FIELD_MAP, &payload, InputSource::WebhookPayload);
        assert_eq!(
            fields,
            MappedFields {
                reply_to_id: "42".to_string(),
                ..MappedFields::default()
            }
        );
    }

    #[test]
    fn non_empty_string_accepts_text_and_numbers_only() {
        assert_eq!(non_empty_string(&serde_json::json!("a")).as_deref(), Some("a"));
        assert_eq!(non_empty_string(&serde_json::json!(7)).as_deref(), Some("7"));
        assert_eq!(non_empty_string(&serde_json::json!("")), None);
        assert_eq!(non_empty_string(&serde_json::json!(true)), None);
    }

    #[test]
    fn parse_webhook_object_classifies_input() {
        assert!(parse_webhook_object("").expect("empty is ok").is_none());
        assert!(parse_webhook_object("  \n").expect("blank is ok").is_none());
        assert!(parse_webhook_object("{}").expect("object").is_some());
        assert!(matches!(
            parse_webhook_object("[]"),
            Err(ActivityError::MalformedInput {
                input: InputSource::WebhookPayload,
                ..
            })
        ));
        assert!(parse_webhook_object("{oops").is_err());
    }

    #[test]
    fn external_event_object_rejects_non_maps() {
        assert!(external_event_object(&serde_json::json!({})).is_none());
        assert!(external_event_object(&serde_json::json!("text")).is_none());
        assert!(external_event_object(&serde_json::json!([{"a": 1}])).is_none());
        assert!(external_event_object(&serde_json::json!({"locale": "en"})).is_some());
    }
}
