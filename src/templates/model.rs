//! Template rows and remote-payload normalization.
//!
//! The remote catalog speaks the provider's vocabulary (APPROVED, IN_APPEAL,
//! PAUSED, ...); locally templates carry a small fixed vocabulary
//! (approved / rejected / draft / failed) plus the raw remote value for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A mirrored remote template, as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub tenant_id: String,
    pub provider_template_id: String,
    pub name: String,
    pub category: Option<String>,
    pub language: Option<String>,
    pub body_text: String,
    /// Local status vocabulary.
    pub status: String,
    /// Raw remote status value, preserved for audit.
    pub review_status: Option<String>,
    pub rejection_reason: Option<String>,
    pub buttons: Option<Value>,
    /// Full remote payload, preserved for forward compatibility.
    pub raw: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

/// One template as prepared for the batched upsert.
#[derive(Debug, Clone)]
pub struct TemplateUpsert {
    pub provider_template_id: String,
    pub name: String,
    pub category: Option<String>,
    pub language: Option<String>,
    pub body_text: String,
    pub status: String,
    pub review_status: Option<String>,
    pub rejection_reason: Option<String>,
    pub buttons: Option<Value>,
    pub raw: Value,
}

/// Map a remote status onto the local vocabulary (case-insensitive).
///
/// Unknown values pass through lower-cased; an empty value means the
/// provider hasn't reviewed the template yet, which locally is `draft`.
pub fn map_remote_status(remote: &str) -> String {
    match remote.trim().to_uppercase().as_str() {
        "" => "draft".to_string(),
        "APPROVED" => "approved".to_string(),
        "REJECTED" => "rejected".to_string(),
        "PENDING" | "IN_APPEAL" => "draft".to_string(),
        "PAUSED" | "DISABLED" => "failed".to_string(),
        other => other.to_lowercase(),
    }
}

/// Remote field names that may carry a rejection reason, in precedence order.
const REJECTION_REASON_KEYS: &[&str] = &["rejected_reason", "rejection_reason", "reason"];

impl TemplateUpsert {
    /// Normalize one remote catalog entry.
    ///
    /// `provider_template_id` falls back to `"{name}:{language}"` when the
    /// remote payload omits an id, keeping the upsert key stable for
    /// providers that never assign one.
    pub fn from_remote(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let language = value
            .get("language")
            .and_then(Value::as_str)
            .map(str::to_string);

        let provider_template_id = value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}:{}", name, language.as_deref().unwrap_or_default()));

        let remote_status = value.get("status").and_then(Value::as_str);

        Self {
            provider_template_id,
            name,
            category: value
                .get("category")
                .and_then(Value::as_str)
                .map(str::to_string),
            language,
            body_text: extract_body_text(value),
            status: map_remote_status(remote_status.unwrap_or_default()),
            review_status: remote_status.map(str::to_string),
            rejection_reason: extract_rejection_reason(value),
            buttons: extract_buttons(value),
            raw: value.clone(),
        }
    }
}

/// First BODY-typed component's text, or empty string if none.
fn extract_body_text(value: &Value) -> String {
    components(value)
        .iter()
        .find(|c| component_type(c) == Some("BODY"))
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// All BUTTONS-typed components, or `None` if there are none.
fn extract_buttons(value: &Value) -> Option<Value> {
    let buttons: Vec<Value> = components(value)
        .iter()
        .filter(|c| component_type(c) == Some("BUTTONS"))
        .map(|c| (*c).clone())
        .collect();
    if buttons.is_empty() {
        None
    } else {
        Some(Value::Array(buttons))
    }
}

/// First non-null rejection reason across the known remote field names.
fn extract_rejection_reason(value: &Value) -> Option<String> {
    REJECTION_REASON_KEYS
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .next()
}

fn components(value: &Value) -> Vec<&Value> {
    value
        .get("components")
        .and_then(Value::as_array)
        .map(|a| a.iter().collect())
        .unwrap_or_default()
}

fn component_type(component: &Value) -> Option<&str> {
    component.get("type").and_then(Value::as_str)
}

// ── Tests ───────────────────────────────────────────────────────────
