//! SMS sender — Fast2SMS bulk gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{Channel, Message, SendResult, service};
use crate::senders::{Sender, transport_error};
use crate::store::Store;

const FAST2SMS_API_URL: &str = "https://www.fast2sms.com/dev/bulkV2";

/// SMS channel sender backed by the Fast2SMS gateway.
pub struct Fast2SmsSender {
    store: Arc<dyn Store>,
    client: reqwest::Client,
    timeout: Duration,
}

impl Fast2SmsSender {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self {
            store,
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl Sender for Fast2SmsSender {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(&self, tenant_id: &str, message: &Message) -> SendResult {
        let api_key = match self
            .store
            .get_tenant_config(tenant_id, service::FAST2SMS)
            .await
        {
            Ok(Some(cfg)) => match cfg.api_key {
                Some(key) => key,
                None => return SendResult::failed("Fast2SMS configuration is missing an api_key"),
            },
            Ok(None) => {
                return SendResult::failed(
                    "SMS is not configured: add a fast2sms service for this tenant",
                );
            }
            Err(e) => return SendResult::failed(format!("Config lookup failed: {e}")),
        };

        let body = serde_json::json!({
            "route": "q",
            "message": message.body_text.as_deref().unwrap_or(""),
            "numbers": message.to.as_deref().unwrap_or_default(),
        });

        let response = match self
            .client
            .post(FAST2SMS_API_URL)
            .header("authorization", api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return SendResult::failed(transport_error(&e)),
        };

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return SendResult::failed(format!("Fast2SMS error ({status}): {text}"));
        }

        // Gateway reports success in-body: {"return": true, "request_id": ...}
        match response.json::<serde_json::Value>().await {
            Ok(value) => {
                if value.get("return").and_then(|v| v.as_bool()).unwrap_or(false) {
                    let request_id = value
                        .get("request_id")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    SendResult::sent(request_id)
                } else {
                    SendResult::failed(format!("Fast2SMS rejected the send: {value}"))
                }
            }
            Err(e) => SendResult::failed(format!("Fast2SMS returned unreadable body: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageStatus;
    use crate::store::LibSqlBackend;

    #[tokio::test]
    async fn unconfigured_tenant_fails_normalized() {
        let store: Arc<dyn Store> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let sender = Fast2SmsSender::new(store, Duration::from_secs(5));

        let msg = Message::outbound_draft("t1", Channel::Sms, "+1555");
        let result = sender.send("t1", &msg).await;

        assert_eq!(result.status, MessageStatus::Failed);
        assert!(result.error.unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn config_without_key_fails_normalized() {
        let store: Arc<dyn Store> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        store
            .put_tenant_config(&crate::model::TenantConfig {
                tenant_id: "t1".into(),
                service_name: service::FAST2SMS.into(),
                api_key: None,
                config_data: serde_json::json!({}),
            })
            .await
            .unwrap();
        let sender = Fast2SmsSender::new(store, Duration::from_secs(5));

        let msg = Message::outbound_draft("t1", Channel::Sms, "+1555");
        let result = sender.send("t1", &msg).await;

        assert_eq!(result.status, MessageStatus::Failed);
        assert!(result.error.unwrap().contains("api_key"));
    }
}
