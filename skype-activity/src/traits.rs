use crate::error::Result;
use crate::types::{Activity, SendReceipt};
use async_trait::async_trait;

#[async_trait]
pub trait ActivitySender: Send + Sync {
    /// Deliver one activity to the connector service at `service_url`.
    /// Callers guarantee `service_url` is non-empty.
    async fn send(&self, service_url: &str, activity: &Activity) -> Result<SendReceipt>;
}
