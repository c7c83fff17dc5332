use crate::config::ConnectorAppConfig;
use anyhow::Result;
use skype_activity::{
    ActivityContext, BotConnectorSender, HyperChatAttachment, SendReceipt, SkypeApiClient,
    session_id_from_request_body, user_id_from_external_id,
};
use std::sync::Arc;

/// What `relay` sends on behalf of the handoff agent.
#[derive(Debug, Clone)]
pub enum RelayContent {
    Text(String),
    Attachment(HyperChatAttachment),
}

pub fn inspect(payload: &str) -> Result<serde_json::Value> {
    let context = ActivityContext::from_webhook(payload);
    Ok(serde_json::json!({
        "context": context.snapshot(),
        "locale": context.locale(),
        "external_id": context.external_id(),
        "full_name": context.full_name(),
        "email": context.email(),
        "session_id": session_id_from_request_body(payload),
    }))
}

pub fn session_id(body: &str) -> Result<String> {
    session_id_from_request_body(body)
        .map(String::from)
        .ok_or_else(|| anyhow::anyhow!("request body has no conversation.id"))
}

pub fn resolve_user(external_id: &str) -> Result<String> {
    user_id_from_external_id(external_id)
        .ok_or_else(|| anyhow::anyhow!("{external_id:?} is not a skype external id"))
}

pub async fn reply(cfg: &ConnectorAppConfig, payload: &str, text: &str) -> Result<SendReceipt> {
    let client = SkypeApiClient::from_request(payload, build_sender(cfg)?);
    tracing::info!(
        external_id = %client.context().external_id(),
        "replying to webhook activity"
    );
    Ok(client.send_text_message(text).await?)
}

pub async fn relay(
    cfg: &ConnectorAppConfig,
    message_data: &str,
    content: RelayContent,
) -> Result<SendReceipt> {
    let context = ActivityContext::from_message_data(message_data)?;
    let client = SkypeApiClient::new(context, build_sender(cfg)?);
    tracing::info!(
        external_id = %client.context().external_id(),
        "relaying handoff message"
    );
    let receipt = match content {
        RelayContent::Text(text) => client.send_text_message(&text).await?,
        RelayContent::Attachment(attachment) => {
            client
                .send_attachment_message_from_hyperchat(attachment)
                .await?
        }
    };
    Ok(receipt)
}

fn build_sender(cfg: &ConnectorAppConfig) -> Result<Arc<BotConnectorSender>> {
    let sender = BotConnectorSender::new(cfg.connector.request_timeout())?
        .with_auth_token(cfg.connector.auth_token.clone());
    Ok(Arc::new(sender))
}
