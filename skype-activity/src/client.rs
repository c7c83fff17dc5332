use crate::context::ActivityContext;
use crate::error::{ActivityError, Result};
use crate::traits::ActivitySender;
use crate::types::{Activity, Attachment, HyperChatAttachment, OutgoingMessage, SendReceipt};
use std::sync::Arc;

/// An [`ActivityContext`] bound to the sender that delivers its replies.
#[derive(Clone)]
pub struct SkypeApiClient {
    context: ActivityContext,
    sender: Arc<dyn ActivitySender>,
}

impl SkypeApiClient {
    pub fn new(context: ActivityContext, sender: Arc<dyn ActivitySender>) -> Self {
        Self { context, sender }
    }

    /// Client for an inbound webhook body. An empty body leaves every field
    /// empty; populate it later with [`populate_from_external_event`].
    ///
    /// [`populate_from_external_event`]: Self::populate_from_external_event
    pub fn from_request(raw: &str, sender: Arc<dyn ActivitySender>) -> Self {
        Self::new(ActivityContext::from_webhook(raw), sender)
    }

    pub fn context(&self) -> &ActivityContext {
        &self.context
    }

    pub fn populate_from_external_event(&mut self, data: &serde_json::Value) {
        self.context.populate_from_external_event(data);
    }

    /// Sends a typing indicator. `show = false` skips the send and returns
    /// `Ok(None)`.
    #[tracing::instrument(level = "info", skip(self), fields(conversation_id = %self.context.conversation_id()))]
    pub async fn show_bot_typing(&self, show: bool) -> Result<Option<SendReceipt>> {
        if !show {
            tracing::debug!("typing indicator suppressed");
            return Ok(None);
        }
        let activity = self.context.typing_activity();
        self.deliver(&activity).await.map(Some)
    }

    /// Sends a typing indicator followed by `message`. A failed typing
    /// indicator is logged and does not block the message.
    #[tracing::instrument(level = "info", skip_all, fields(conversation_id = %self.context.conversation_id()))]
    pub async fn send_message(&self, message: OutgoingMessage) -> Result<SendReceipt> {
        if let Err(error) = self.show_bot_typing(true).await {
            tracing::warn!(%error, "typing indicator failed; sending message anyway");
        }
        let activity = self.context.message_activity(message);
        self.deliver(&activity).await
    }

    pub async fn send_text_message(&self, text: &str) -> Result<SendReceipt> {
        self.send_message(OutgoingMessage::text(text)).await
    }

    pub async fn send_attachment_message_from_hyperchat(
        &self,
        message: HyperChatAttachment,
    ) -> Result<SendReceipt> {
        self.send_message(OutgoingMessage::default().with_attachments(vec![Attachment::from(message)]))
            .await
    }

    async fn deliver(&self, activity: &Activity) -> Result<SendReceipt> {
        let service_url = self.context.service_url();
        if service_url.trim().is_empty() {
            return Err(ActivityError::MissingServiceUrl);
        }
        let receipt = self.sender.send(service_url, activity).await?;
        tracing::info!(
            kind = ?activity.kind,
            activity_id = ?receipt.id,
            "activity delivered"
        );
        Ok(receipt)
    }
}
