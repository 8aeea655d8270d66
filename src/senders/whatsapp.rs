//! WhatsApp sender — Cloud API (Graph) text messages.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{Channel, Message, SendResult, service};
use crate::senders::{Sender, transport_error};
use crate::store::Store;

/// WhatsApp channel sender backed by the Cloud API.
pub struct WhatsAppSender {
    store: Arc<dyn Store>,
    client: reqwest::Client,
    graph_api_base: String,
    graph_api_version: String,
    timeout: Duration,
}

impl WhatsAppSender {
    pub fn new(
        store: Arc<dyn Store>,
        graph_api_base: String,
        graph_api_version: String,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            client: reqwest::Client::new(),
            graph_api_base,
            graph_api_version,
            timeout,
        }
    }

    fn messages_url(&self, phone_number_id: &str) -> String {
        format!(
            "{}/{}/{}/messages",
            self.graph_api_base, self.graph_api_version, phone_number_id
        )
    }
}

#[async_trait]
impl Sender for WhatsAppSender {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    async fn send(&self, tenant_id: &str, message: &Message) -> SendResult {
        let cfg = match self
            .store
            .get_tenant_config(tenant_id, service::WHATSAPP)
            .await
        {
            Ok(Some(cfg)) => cfg,
            Ok(None) => {
                return SendResult::failed(
                    "WhatsApp is not configured: add a whatsapp service for this tenant",
                );
            }
            Err(e) => return SendResult::failed(format!("Config lookup failed: {e}")),
        };

        let Some(api_key) = cfg.api_key.as_deref() else {
            return SendResult::failed("WhatsApp configuration is missing an access token");
        };
        let Some(phone_number_id) = cfg.config_str("phone_number_id") else {
            return SendResult::failed("WhatsApp configuration is missing 'phone_number_id'");
        };

        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": message.to.as_deref().unwrap_or_default(),
            "type": "text",
            "text": {
                "preview_url": false,
                "body": message.body_text.as_deref().unwrap_or(""),
            },
        });

        let response = match self
            .client
            .post(self.messages_url(phone_number_id))
            .bearer_auth(api_key)
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
            return SendResult::failed(format!("WhatsApp API error ({status}): {text}"));
        }

        let provider_id = response.json::<serde_json::Value>().await.ok().and_then(|v| {
            v.get("messages")
                .and_then(|m| m.get(0))
                .and_then(|m| m.get("id"))
                .and_then(|id| id.as_str())
                .map(str::to_string)
        });
        SendResult::sent(provider_id)
    }
}
