use crate::error::{ActivityError, InputSource, Result};
use crate::identity;
use crate::mapping::{self, EXTERNAL_EVENT_FIELD_MAP, MappedFields, WEBHOOK_FIELD_MAP};
use crate::types::{
    Activity, ActivityType, ChannelAccount, ExternalId, OutgoingMessage, SuggestedActions,
};
use serde::{Deserialize, Serialize};

/// Identity fields of one Skype conversation turn.
///
/// `from` is the bot and `recipient` is the user, in outbound orientation.
/// Missing inbound fields are stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityContext {
    conversation_id: String,
    conversation_name: String,
    from_id: String,
    from_name: String,
    recipient_id: String,
    recipient_name: String,
    locale: String,
    reply_to_id: String,
    service_url: String,
}

/// Serialized form written by [`ActivityContext::message_data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub from: ChannelAccount,
    pub conversation: ChannelAccount,
    pub recipient: ChannelAccount,
    pub reply_to_id: String,
    pub service_url: String,
}

impl ActivityContext {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Self::default()
        }
    }

    /// Builds a context for an inbound webhook body: the service URL is read
    /// first, then the identity fields.
    pub fn from_webhook(raw: &str) -> Self {
        let mut context = Self::new(extract_service_url(raw).unwrap_or_default());
        context.populate_from_webhook_payload(raw);
        context
    }

    /// Re-hydrates a context from a [`message_data`](Self::message_data) string.
    pub fn from_message_data(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ActivityError::malformed(InputSource::MessageData, e.to_string()))?;
        if mapping::external_event_object(&value).is_none() {
            return Err(ActivityError::malformed(
                InputSource::MessageData,
                "expected a non-empty object",
            ));
        }
        let mut context = Self::default();
        context.populate_from_external_event(&value);
        Ok(context)
    }

    pub fn populate_from_webhook_payload(&mut self, raw: &str) {
        let object = match mapping::parse_webhook_object(raw) {
            Ok(Some(object)) => object,
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(%error, "webhook payload unreadable; identity fields reset");
                self.apply(MappedFields::default());
                return;
            }
        };
        let fields = mapping::apply_field_map(
            WEBHOOK_FIELD_MAP,
            &object,
            InputSource::WebhookPayload,
        );
        self.apply(fields);
        tracing::debug!(
            conversation_id = %self.conversation_id,
            recipient_id = %self.recipient_id,
            "activity context populated from webhook payload"
        );
    }

    /// Applies a relayed external event. A non-empty `serviceUrl` in the event
    /// replaces the stored one.
    pub fn populate_from_external_event(&mut self, data: &serde_json::Value) {
        let Some(object) = mapping::external_event_object(data) else {
            tracing::debug!("external event is empty or not a map; ignoring");
            return;
        };
        let fields =
            mapping::apply_field_map(EXTERNAL_EVENT_FIELD_MAP, object, InputSource::ExternalEvent);
        self.apply(fields);
        tracing::debug!(
            conversation_id = %self.conversation_id,
            recipient_id = %self.recipient_id,
            has_service_url = !self.service_url.is_empty(),
            "activity context populated from external event"
        );
    }

    fn apply(&mut self, fields: MappedFields) {
        self.conversation_id = fields.conversation_id;
        self.conversation_name = fields.conversation_name;
        self.from_id = fields.from_id;
        self.from_name = fields.from_name;
        self.recipient_id = fields.recipient_id;
        self.recipient_name = fields.recipient_name;
        self.locale = fields.locale;
        self.reply_to_id = fields.reply_to_id;
        if let Some(service_url) = fields.service_url {
            self.service_url = service_url;
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn conversation_name(&self) -> &str {
        &self.conversation_name
    }

    pub fn from_id(&self) -> &str {
        &self.from_id
    }

    pub fn from_name(&self) -> &str {
        &self.from_name
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    pub fn recipient_name(&self) -> &str {
        &self.recipient_name
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn reply_to_id(&self) -> &str {
        &self.reply_to_id
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn set_service_url(&mut self, service_url: impl Into<String>) {
        self.service_url = service_url.into();
    }

    /// Display name of the user.
    pub fn full_name(&self) -> &str {
        &self.recipient_name
    }

    pub fn external_id(&self) -> ExternalId {
        identity::external_id(&self.conversation_id, &self.recipient_id)
    }

    /// Email-shaped key for systems that require one. Not deliverable.
    pub fn email(&self) -> String {
        identity::placeholder_email(&self.recipient_name, &self.recipient_id)
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            from: ChannelAccount::new(&self.from_id, &self.from_name),
            conversation: ChannelAccount::new(&self.conversation_id, &self.conversation_name),
            recipient: ChannelAccount::new(&self.recipient_id, &self.recipient_name),
            reply_to_id: self.reply_to_id.clone(),
            service_url: self.service_url.clone(),
        }
    }

    pub fn message_data(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    pub fn typing_activity(&self) -> Activity {
        self.activity(ActivityType::Typing)
    }

    /// Builds a `message` activity. Empty optional fields are left out.
    pub fn message_activity(&self, message: OutgoingMessage) -> Activity {
        let mut activity = self.activity(ActivityType::Message);
        activity.text = message.text.filter(|text| !text.is_empty());
        activity.suggested_actions = message
            .suggested_actions
            .filter(|actions: &SuggestedActions| !actions.actions.is_empty());
        activity.attachments = message
            .attachments
            .filter(|attachments| !attachments.is_empty());
        activity.attachment_layout = message.attachment_layout;
        activity
    }

    fn activity(&self, kind: ActivityType) -> Activity {
        Activity {
            kind,
            from: ChannelAccount::new(&self.from_id, &self.from_name),
            conversation: ChannelAccount::new(&self.conversation_id, &self.conversation_name),
            recipient: ChannelAccount::new(&self.recipient_id, &self.recipient_name),
            reply_to_id: self.reply_to_id.clone(),
            text: None,
            suggested_actions: None,
            attachments: None,
            attachment_layout: None,
        }
    }
}

/// Top-level `serviceUrl` of a webhook body, if any.
pub fn extract_service_url(raw: &str) -> Option<String> {
    match mapping::parse_webhook_object(raw) {
        Ok(object) => object?
            .get("serviceUrl")
            .and_then(mapping::non_empty_string),
        Err(error) => {
            tracing::debug!(%error, "no service url in unreadable webhook payload");
            None
        }
    }
}
