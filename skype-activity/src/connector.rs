use crate::error::{ActivityError, Result};
use crate::traits::ActivitySender;
use crate::types::{Activity, SendReceipt};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers activities through the Bot Framework connector REST API.
///
/// Token acquisition is out of scope: a bearer token obtained elsewhere can
/// be attached with [`with_auth_token`](Self::with_auth_token).
#[derive(Clone)]
pub struct BotConnectorSender {
    http: reqwest::Client,
    auth_token: Option<String>,
}

impl BotConnectorSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, auth_token: Option<String>) -> Self {
        self.auth_token = auth_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(ToOwned::to_owned);
        self
    }

    fn authorized_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait::async_trait]
impl ActivitySender for BotConnectorSender {
    #[tracing::instrument(level = "debug", skip_all, fields(kind = ?activity.kind))]
    async fn send(&self, service_url: &str, activity: &Activity) -> Result<SendReceipt> {
        let url = activities_url(
            service_url,
            &activity.conversation.id,
            &activity.reply_to_id,
        )?;
        let response = self
            .authorized_request(self.http.post(url))
            .json(activity)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ActivityError::SendRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(parse_receipt(&body))
    }
}

/// `{service_url}/v3/conversations/{conversation_id}/activities[/{reply_to_id}]`
pub(crate) fn activities_url(
    service_url: &str,
    conversation_id: &str,
    reply_to_id: &str,
) -> Result<Url> {
    let service_url = service_url.trim();
    if service_url.is_empty() {
        return Err(ActivityError::MissingServiceUrl);
    }
    if conversation_id.is_empty() {
        return Err(ActivityError::MissingConversationId);
    }
    let mut url = Url::parse(service_url)
        .map_err(|e| ActivityError::InvalidServiceUrl(format!("{service_url}: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ActivityError::InvalidServiceUrl(format!(
                "unsupported scheme {other}"
            )));
        }
    }
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            ActivityError::InvalidServiceUrl(format!("{service_url} cannot be a base url"))
        })?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", conversation_id, "activities"]);
        if !reply_to_id.is_empty() {
            segments.push(reply_to_id);
        }
    }
    Ok(url)
}

fn parse_receipt(body: &str) -> SendReceipt {
    if body.trim().is_empty() {
        return SendReceipt::default();
    }
    match serde_json::from_str(body) {
        Ok(receipt) => receipt,
        Err(error) => {
            tracing::debug!(%error, "connector response is not a resource response");
            SendReceipt::default()
        }
    }
}
