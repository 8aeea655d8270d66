//! Email sender — Resend HTTP API when configured, SMTP via lettre otherwise.
//!
//! A tenant may hold either a `resend_email` row (api_key + from_address) or
//! an `smtp` row (host/port/username/password/from_address). Resend wins when
//! both are present.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};

use crate::model::{Channel, Message, SendResult, service};
use crate::senders::{Sender, transport_error};
use crate::store::Store;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Email channel sender.
pub struct EmailSender {
    store: Arc<dyn Store>,
    client: reqwest::Client,
    timeout: Duration,
}

impl EmailSender {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self {
            store,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Send via the Resend HTTP API.
    async fn send_resend(&self, api_key: &str, from: &str, message: &Message) -> SendResult {
        let body = serde_json::json!({
            "from": from,
            "to": [message.to.as_deref().unwrap_or_default()],
            "subject": message.subject.as_deref().unwrap_or(""),
            "text": message.body_text.as_deref().unwrap_or(""),
            "html": message.body_html,
        });

        let response = match self
            .client
            .post(RESEND_API_URL)
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
            return SendResult::failed(format!("Resend API error ({status}): {text}"));
        }

        let provider_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string));
        SendResult::sent(provider_id)
    }

    /// Send via SMTP with lettre's blocking transport, bounded by the
    /// request timeout.
    async fn send_smtp(&self, smtp: SmtpParams, message: &Message) -> SendResult {
        let to = message.to.clone().unwrap_or_default();
        let subject = message.subject.clone().unwrap_or_default();
        let text = message.body_text.clone().unwrap_or_default();
        let html = message.body_html.clone();

        let task = tokio::task::spawn_blocking(move || smtp_send(&smtp, &to, &subject, &text, html));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => SendResult::failed(format!("SMTP task failed: {join_err}")),
            Err(_) => SendResult::failed("timeout"),
        }
    }
}

#[async_trait]
impl Sender for EmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, tenant_id: &str, message: &Message) -> SendResult {
        // Resend first, SMTP as the fallback.
        match self
            .store
            .get_tenant_config(tenant_id, service::RESEND_EMAIL)
            .await
        {
            Ok(Some(cfg)) => {
                if let Some(api_key) = cfg.api_key.as_deref() {
                    let from = cfg
                        .config_str("from_address")
                        .unwrap_or("onboarding@resend.dev")
                        .to_string();
                    return self.send_resend(api_key, &from, message).await;
                }
            }
            Ok(None) => {}
            Err(e) => return SendResult::failed(format!("Config lookup failed: {e}")),
        }

        let smtp_cfg = match self.store.get_tenant_config(tenant_id, service::SMTP).await {
            Ok(Some(cfg)) => cfg,
            Ok(None) => {
                return SendResult::failed(
                    "Email is not configured: add a resend_email or smtp service for this tenant",
                );
            }
            Err(e) => return SendResult::failed(format!("Config lookup failed: {e}")),
        };

        let Some(host) = smtp_cfg.config_str("host").map(str::to_string) else {
            return SendResult::failed("SMTP configuration is missing 'host'");
        };
        let username = smtp_cfg.config_str("username").unwrap_or_default().to_string();
        let params = SmtpParams {
            host,
            port: smtp_cfg
                .config_data
                .get("port")
                .and_then(|v| v.as_u64())
                .unwrap_or(587) as u16,
            username: username.clone(),
            password: smtp_cfg.config_str("password").unwrap_or_default().to_string(),
            from_address: smtp_cfg
                .config_str("from_address")
                .map(str::to_string)
                .unwrap_or(username),
        };

        self.send_smtp(params, message).await
    }
}

/// Resolved SMTP connection parameters.
#[derive(Clone)]
struct SmtpParams {
    host: String,
    port: u16,
    username: String,
    password: String,
    from_address: String,
}

/// Blocking SMTP send — run in `spawn_blocking`.
fn smtp_send(
    smtp: &SmtpParams,
    to: &str,
    subject: &str,
    text: &str,
    html: Option<String>,
) -> SendResult {
    let from = match smtp.from_address.parse() {
        Ok(addr) => addr,
        Err(e) => return SendResult::failed(format!("Invalid from address: {e}")),
    };
    let to_addr = match to.parse() {
        Ok(addr) => addr,
        Err(e) => return SendResult::failed(format!("Invalid to address: {e}")),
    };

    let builder = lettre::Message::builder()
        .from(from)
        .to(to_addr)
        .subject(subject);

    let email = match html {
        Some(html) => builder.header(ContentType::TEXT_HTML).body(html),
        None => builder.body(text.to_string()),
    };
    let email = match email {
        Ok(email) => email,
        Err(e) => return SendResult::failed(format!("Failed to build email: {e}")),
    };

    let transport = match SmtpTransport::relay(&smtp.host) {
        Ok(relay) => relay
            .port(smtp.port)
            .credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ))
            .build(),
        Err(e) => return SendResult::failed(format!("SMTP relay error: {e}")),
    };

    match transport.send(&email) {
        Ok(response) => {
            tracing::info!(to = to, "Email sent via SMTP");
            SendResult::sent(response.message().next().map(str::to_string))
        }
        Err(e) => SendResult::failed(format!("SMTP send failed: {e}")),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
