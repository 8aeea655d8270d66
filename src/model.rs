//! Normalized message model shared by all three channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery channel tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Whatsapp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
        }
    }

    /// Parse a channel tag. Returns `None` for anything but the three
    /// supported channels.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "email" => Some(Channel::Email),
            "sms" => Some(Channel::Sms),
            "whatsapp" => Some(Channel::Whatsapp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "outbound" => Some(Direction::Outbound),
            "inbound" => Some(Direction::Inbound),
            _ => None,
        }
    }
}

/// Lifecycle status of a message.
///
/// Outbound: pending → queued (deferred) → sending → sent | failed.
/// Inbound messages are always `received`. Once `sent` or `failed` the
/// dispatch pipeline never re-dispatches a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Queued,
    Sending,
    Sent,
    Failed,
    Received,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Queued => "queued",
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
            MessageStatus::Received => "received",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => MessageStatus::Queued,
            "sending" => MessageStatus::Sending,
            "sent" => MessageStatus::Sent,
            "failed" => MessageStatus::Failed,
            "received" => MessageStatus::Received,
            _ => MessageStatus::Pending,
        }
    }
}

/// A persisted message, outbound or inbound, scoped to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned id; empty on a draft that has not been persisted yet.
    pub id: String,
    pub tenant_id: String,
    pub channel: Channel,
    pub direction: Direction,
    pub to: Option<String>,
    pub from: Option<String>,
    /// Email only; `None` for other channels.
    pub subject: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub status: MessageStatus,
    pub error: Option<String>,
    /// Set once a provider accepts the send (or from the inbound callback).
    pub provider_message_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build an outbound draft with `status = pending`.
    pub fn outbound_draft(tenant_id: &str, channel: Channel, to: &str) -> Self {
        Self {
            id: String::new(),
            tenant_id: tenant_id.to_string(),
            channel,
            direction: Direction::Outbound,
            to: Some(to.to_string()),
            from: None,
            subject: None,
            body_text: None,
            body_html: None,
            status: MessageStatus::Pending,
            error: None,
            provider_message_id: None,
            scheduled_at: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    /// Build an inbound message with `status = received`.
    pub fn inbound(tenant_id: &str, channel: Channel, from: &str, to: &str, text: &str) -> Self {
        Self {
            id: String::new(),
            tenant_id: tenant_id.to_string(),
            channel,
            direction: Direction::Inbound,
            to: Some(to.to_string()),
            from: Some(from.to_string()),
            subject: None,
            body_text: Some(text.to_string()),
            body_html: None,
            status: MessageStatus::Received,
            error: None,
            provider_message_id: None,
            scheduled_at: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }
}

/// A generic send request, as received from the API layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    pub channel: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub html: Option<String>,
    pub schedule_at: Option<DateTime<Utc>>,
}

/// Normalized result of a channel sender call.
///
/// Senders never fail with an `Err` — transport problems are folded into
/// `status = Failed` with a diagnostic in `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub status: MessageStatus,
    pub error: Option<String>,
    pub provider_message_id: Option<String>,
}

impl SendResult {
    pub fn sent(provider_message_id: Option<String>) -> Self {
        Self {
            status: MessageStatus::Sent,
            error: None,
            provider_message_id,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: MessageStatus::Failed,
            error: Some(error.into()),
            provider_message_id: None,
        }
    }
}

// ── Tenant configuration ────────────────────────────────────────────

/// Service names used as `TenantConfig` keys.
pub mod service {
    pub const RESEND_EMAIL: &str = "resend_email";
    pub const SMTP: &str = "smtp";
    pub const FAST2SMS: &str = "fast2sms";
    pub const WHATSAPP: &str = "whatsapp";
    pub const COMPANY_PHONE: &str = "company_phone";
    pub const API_TOKEN: &str = "api_token";
}

/// One per-tenant configuration row, keyed `(tenant_id, service_name)`.
///
/// Owned by tenant-facing configuration flows; the core reads it read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub service_name: String,
    pub api_key: Option<String>,
    /// Open mapping of channel-specific fields (`host`/`username` for SMTP,
    /// `waba_id`/`phone_number_id` for WhatsApp, `number` for company phone).
    pub config_data: serde_json::Value,
}

impl TenantConfig {
    /// Read a string field out of `config_data`.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config_data.get(key).and_then(|v| v.as_str())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
