//! Per-tenant configuration diagnostics.
//!
//! Reports what a tenant still has to configure before each channel works,
//! without touching any provider. Purely a read over `tenant_configs`.

use std::sync::Arc;

use serde::Serialize;

use crate::error::DatabaseError;
use crate::model::{TenantConfig, service};
use crate::store::Store;

/// One actionable configuration gap.
#[derive(Debug, Clone, Serialize)]
pub struct StatusIssue {
    pub code: &'static str,
    pub message: String,
    /// `error` — channel cannot work; `warning` — degraded.
    pub severity: &'static str,
    /// What to configure to resolve the issue.
    pub action: String,
}

impl StatusIssue {
    fn error(code: &'static str, message: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity: "error",
            action: action.into(),
        }
    }

    fn warning(code: &'static str, message: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity: "warning",
            action: action.into(),
        }
    }
}

/// Collect configuration issues for a tenant. Empty means all three
/// channels are fully configured.
pub async fn tenant_status(
    store: &Arc<dyn Store>,
    tenant_id: &str,
) -> Result<Vec<StatusIssue>, DatabaseError> {
    let mut issues = Vec::new();

    check_email(store, tenant_id, &mut issues).await?;
    check_sms(store, tenant_id, &mut issues).await?;
    check_whatsapp(store, tenant_id, &mut issues).await?;

    Ok(issues)
}

fn has_api_key(cfg: &Option<TenantConfig>) -> bool {
    cfg.as_ref()
        .and_then(|c| c.api_key.as_deref())
        .is_some_and(|k| !k.is_empty())
}

async fn check_email(
    store: &Arc<dyn Store>,
    tenant_id: &str,
    issues: &mut Vec<StatusIssue>,
) -> Result<(), DatabaseError> {
    let resend = store
        .get_tenant_config(tenant_id, service::RESEND_EMAIL)
        .await?;
    let smtp = store.get_tenant_config(tenant_id, service::SMTP).await?;

    if has_api_key(&resend) {
        return Ok(());
    }

    match smtp {
        Some(cfg) => {
            for field in ["host", "username", "password", "from_address"] {
                if cfg.config_str(field).is_none() {
                    issues.push(StatusIssue::error(
                        "email_smtp_incomplete",
                        format!("SMTP configuration is missing '{field}'"),
                        format!("Set '{field}' on the smtp service"),
                    ));
                }
            }
        }
        None => issues.push(StatusIssue::error(
            "email_unconfigured",
            "No email provider is configured",
            "Add a resend_email api_key or an smtp service",
        )),
    }
    Ok(())
}

async fn check_sms(
    store: &Arc<dyn Store>,
    tenant_id: &str,
    issues: &mut Vec<StatusIssue>,
) -> Result<(), DatabaseError> {
    let fast2sms = store
        .get_tenant_config(tenant_id, service::FAST2SMS)
        .await?;
    if !has_api_key(&fast2sms) {
        issues.push(StatusIssue::error(
            "sms_unconfigured",
            "No SMS gateway key is configured",
            "Add a fast2sms service with an api_key",
        ));
    }

    let phone = store
        .get_tenant_config(tenant_id, service::COMPANY_PHONE)
        .await?;
    let has_number = phone
        .as_ref()
        .and_then(|c| c.config_str("number"))
        .is_some_and(|n| !n.trim().is_empty());
    if !has_number {
        // Outbound still works; inbound callbacks cannot be routed here.
        issues.push(StatusIssue::warning(
            "sms_inbound_unroutable",
            "No company phone number is configured; inbound SMS cannot be matched to this tenant",
            "Add a company_phone service with a 'number'",
        ));
    }
    Ok(())
}

async fn check_whatsapp(
    store: &Arc<dyn Store>,
    tenant_id: &str,
    issues: &mut Vec<StatusIssue>,
) -> Result<(), DatabaseError> {
    let Some(cfg) = store
        .get_tenant_config(tenant_id, service::WHATSAPP)
        .await?
    else {
        issues.push(StatusIssue::error(
            "whatsapp_unconfigured",
            "WhatsApp is not configured",
            "Add a whatsapp service with an access token, phone_number_id and waba_id",
        ));
        return Ok(());
    };

    if cfg.api_key.as_deref().is_none_or(str::is_empty) {
        issues.push(StatusIssue::error(
            "whatsapp_token_missing",
            "WhatsApp configuration has no access token",
            "Set api_key on the whatsapp service",
        ));
    }
    if cfg.config_str("phone_number_id").is_none() {
        issues.push(StatusIssue::error(
            "whatsapp_phone_number_id_missing",
            "WhatsApp configuration has no phone_number_id",
            "Set 'phone_number_id' on the whatsapp service",
        ));
    }
    if cfg.config_str("waba_id").is_none() {
        issues.push(StatusIssue::warning(
            "whatsapp_templates_unsyncable",
            "WhatsApp configuration has no waba_id; template sync is unavailable",
            "Set 'waba_id' on the whatsapp service",
        ));
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;
    use serde_json::json;

    async fn store() -> Arc<dyn Store> {
        Arc::new(LibSqlBackend::new_memory().await.unwrap())
    }

    async fn put(
        store: &Arc<dyn Store>,
        service_name: &str,
        api_key: Option<&str>,
        config_data: serde_json::Value,
    ) {
        store
            .put_tenant_config(&TenantConfig {
                tenant_id: "t1".into(),
                service_name: service_name.into(),
                api_key: api_key.map(str::to_string),
                config_data,
            })
            .await
            .unwrap();
    }

    fn codes(issues: &[StatusIssue]) -> Vec<&'static str> {
        issues.iter().map(|i| i.code).collect()
    }

    #[tokio::test]
    async fn blank_tenant_reports_every_channel() {
        let store = store().await;
        let issues = tenant_status(&store, "t1").await.unwrap();
        let codes = codes(&issues);
        assert!(codes.contains(&"email_unconfigured"));
        assert!(codes.contains(&"sms_unconfigured"));
        assert!(codes.contains(&"sms_inbound_unroutable"));
        assert!(codes.contains(&"whatsapp_unconfigured"));
    }

    #[tokio::test]
    async fn resend_key_satisfies_email() {
        let store = store().await;
        put(&store, service::RESEND_EMAIL, Some("re_key"), json!({})).await;
        let issues = tenant_status(&store, "t1").await.unwrap();
        assert!(!codes(&issues).iter().any(|c| c.starts_with("email")));
    }

    #[tokio::test]
    async fn partial_smtp_names_missing_fields() {
        let store = store().await;
        put(
            &store,
            service::SMTP,
            None,
            json!({"host": "smtp.example.com", "username": "u"}),
        )
        .await;
        let issues = tenant_status(&store, "t1").await.unwrap();
        let smtp: Vec<_> = issues
            .iter()
            .filter(|i| i.code == "email_smtp_incomplete")
            .collect();
        assert_eq!(smtp.len(), 2);
        assert!(smtp.iter().any(|i| i.message.contains("password")));
        assert!(smtp.iter().any(|i| i.message.contains("from_address")));
    }

    #[tokio::test]
    async fn whatsapp_without_waba_id_is_a_warning() {
        let store = store().await;
        put(
            &store,
            service::WHATSAPP,
            Some("token"),
            json!({"phone_number_id": "pnid"}),
        )
        .await;
        let issues = tenant_status(&store, "t1").await.unwrap();
        let wa: Vec<_> = issues
            .iter()
            .filter(|i| i.code.starts_with("whatsapp"))
            .collect();
        assert_eq!(wa.len(), 1);
        assert_eq!(wa[0].code, "whatsapp_templates_unsyncable");
        assert_eq!(wa[0].severity, "warning");
    }

    #[tokio::test]
    async fn fully_configured_tenant_is_clean() {
        let store = store().await;
        put(&store, service::RESEND_EMAIL, Some("re_key"), json!({})).await;
        put(&store, service::FAST2SMS, Some("sms_key"), json!({})).await;
        put(&store, service::COMPANY_PHONE, None, json!({"number": "+1555"})).await;
        put(
            &store,
            service::WHATSAPP,
            Some("token"),
            json!({"phone_number_id": "pnid", "waba_id": "waba"}),
        )
        .await;
        let issues = tenant_status(&store, "t1").await.unwrap();
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }
}
