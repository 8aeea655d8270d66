//! Inbound webhook router.
//!
//! Provider callbacks carry no tenant id. The router collapses the two
//! supported payload shapes (flat SMS fields, nested WhatsApp business
//! payload) to `{from, to, text}` and resolves the owning tenant by matching
//! the provider-supplied routing identifier against tenant config rows.
//!
//! Ingestion is error-swallowing by design: providers treat non-2xx as a
//! delivery failure and retry indefinitely, so malformed or unrecognized
//! payloads are accepted and dropped, never errored.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::{Channel, Message, TenantConfig, service};
use crate::store::Store;

/// Result of routing one inbound callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// No message content (heartbeat / status callback). Nothing written.
    Ignored,
    /// Payload was processed; `stored` messages were written (0 when the
    /// routing identifier matched no tenant).
    Accepted { stored: usize },
}

/// A payload collapsed to the common inbound shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInbound {
    pub from: String,
    pub to: String,
    pub text: String,
}

/// Routes inbound provider callbacks to the owning tenant.
pub struct InboundRouter {
    store: Arc<dyn Store>,
}

impl InboundRouter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Route an SMS-style callback (flat fields, JSON or form-decoded).
    pub async fn route_sms(&self, payload: &Value) -> InboundOutcome {
        let Some(inbound) = normalize_sms(payload) else {
            debug!("SMS webhook without message content ignored");
            return InboundOutcome::Ignored;
        };

        let Some(tenant_id) = self
            .resolve_tenant(service::COMPANY_PHONE, "number", &inbound.to)
            .await
        else {
            debug!(to = %inbound.to, "SMS webhook matched no tenant; discarded");
            return InboundOutcome::Accepted { stored: 0 };
        };

        let message = Message::inbound(
            &tenant_id,
            Channel::Sms,
            &inbound.from,
            &inbound.to,
            &inbound.text,
        );
        match self.store.insert_message(message).await {
            Ok(stored) => {
                info!(id = %stored.id, tenant = %tenant_id, "Inbound SMS stored");
                InboundOutcome::Accepted { stored: 1 }
            }
            Err(e) => {
                warn!(tenant = %tenant_id, "Failed to store inbound SMS: {e}");
                InboundOutcome::Accepted { stored: 0 }
            }
        }
    }

    /// Route a WhatsApp business callback. A single callback may carry
    /// several messages; each is routed independently and a failure on one
    /// never cancels the rest.
    pub async fn route_whatsapp(&self, payload: &Value) -> InboundOutcome {
        let messages = normalize_whatsapp(payload);
        if messages.is_empty() {
            debug!("WhatsApp webhook without message content ignored");
            return InboundOutcome::Ignored;
        }

        let mut stored = 0;
        for inbound in messages {
            let Some(tenant_id) = self
                .resolve_tenant(service::WHATSAPP, "phone_number_id", &inbound.to_routing_id)
                .await
            else {
                debug!(
                    phone_number_id = %inbound.to_routing_id,
                    "WhatsApp webhook matched no tenant; discarded"
                );
                continue;
            };

            let mut message = Message::inbound(
                &tenant_id,
                Channel::Whatsapp,
                &inbound.from,
                &inbound.to_routing_id,
                &inbound.text,
            );
            message.provider_message_id = inbound.provider_message_id.clone();

            match self.store.insert_message(message).await {
                Ok(row) => {
                    info!(id = %row.id, tenant = %tenant_id, "Inbound WhatsApp message stored");
                    stored += 1;
                }
                Err(e) => {
                    warn!(tenant = %tenant_id, "Failed to store inbound WhatsApp message: {e}");
                }
            }
        }
        InboundOutcome::Accepted { stored }
    }

    /// Linear scan of the service's config rows for a matching routing
    /// identifier. The config table holds one row per service per tenant,
    /// so the scan stays small; a larger deployment would index this.
    async fn resolve_tenant(
        &self,
        service_name: &str,
        key_field: &str,
        routing_id: &str,
    ) -> Option<String> {
        let configs: Vec<TenantConfig> = match self
            .store
            .list_configs_for_service(service_name)
            .await
        {
            Ok(configs) => configs,
            Err(e) => {
                warn!(service = service_name, "Tenant config scan failed: {e}");
                return None;
            }
        };

        configs
            .into_iter()
            .find(|cfg| {
                cfg.config_str(key_field)
                    .is_some_and(|v| v.trim() == routing_id.trim())
            })
            .map(|cfg| cfg.tenant_id)
    }
}

// ── Payload normalization ───────────────────────────────────────────

/// Parse a webhook body that may be JSON or form-encoded.
pub fn parse_webhook_body(bytes: &[u8]) -> Value {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return value;
    }
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes) {
        Ok(pairs) => Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        ),
        Err(_) => Value::Null,
    }
}

/// Field aliases accepted for SMS-style flat payloads (case-insensitive).
const FROM_KEYS: &[&str] = &["from", "sender"];
const TO_KEYS: &[&str] = &["to", "receiver", "destination"];
const TEXT_KEYS: &[&str] = &["text", "message", "body", "content"];

/// Collapse an SMS-style flat payload to the common shape.
/// Returns `None` when any required field is missing or empty.
pub fn normalize_sms(payload: &Value) -> Option<NormalizedInbound> {
    let obj = payload.as_object()?;

    let field = |aliases: &[&str]| -> Option<String> {
        obj.iter()
            .find(|(k, _)| aliases.iter().any(|a| k.eq_ignore_ascii_case(a)))
            .and_then(|(_, v)| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(NormalizedInbound {
        from: field(FROM_KEYS)?,
        to: field(TO_KEYS)?,
        text: field(TEXT_KEYS)?,
    })
}

/// One inbound WhatsApp message with its routing identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppInbound {
    pub from: String,
    /// The receiving phone-number-id — a routing identifier, not a phone
    /// number.
    pub to_routing_id: String,
    pub text: String,
    pub provider_message_id: Option<String>,
}

/// Flatten a WhatsApp business payload into its individual text messages.
/// Status-only callbacks (no `messages` array) yield an empty vec.
pub fn normalize_whatsapp(payload: &Value) -> Vec<WhatsAppInbound> {
    let mut out = Vec::new();

    let entries = payload
        .get("entry")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for entry in &entries {
        let changes = entry
            .get("changes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for change in &changes {
            let Some(value) = change.get("value") else {
                continue;
            };
            let Some(phone_number_id) = value
                .get("metadata")
                .and_then(|m| m.get("phone_number_id"))
                .and_then(Value::as_str)
            else {
                continue;
            };

            let messages = value
                .get("messages")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for msg in &messages {
                let Some(from) = msg.get("from").and_then(Value::as_str) else {
                    continue;
                };
                let Some(text) = msg
                    .get("text")
                    .and_then(|t| t.get("body"))
                    .and_then(Value::as_str)
                else {
                    continue;
                };

                out.push(WhatsAppInbound {
                    from: from.to_string(),
                    to_routing_id: phone_number_id.to_string(),
                    text: text.to_string(),
                    provider_message_id: msg
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
        }
    }

    out
}

// ── Tests ───────────────────────────────────────────────────────────
