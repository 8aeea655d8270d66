//! Backend-agnostic `Store` trait — single async interface for all
//! persistence: messages, tenant configuration rows, and the template mirror.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::model::{Channel, Direction, Message, TenantConfig};
use crate::templates::model::{Template, TemplateUpsert};

/// Optional exact-match filters for message listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFilter {
    pub channel: Option<Channel>,
    pub direction: Option<Direction>,
}

/// Backend-agnostic persistence trait.
#[async_trait]
pub trait Store: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Messages ────────────────────────────────────────────────────

    /// Persist a message draft. The store assigns the id and returns the
    /// stored record.
    async fn insert_message(&self, draft: Message) -> Result<Message, DatabaseError>;

    /// List a tenant's messages, newest first, up to `limit`.
    async fn list_messages(
        &self,
        tenant_id: &str,
        filter: MessageFilter,
        limit: usize,
    ) -> Result<Vec<Message>, DatabaseError>;

    /// Look up a message by id, scoped to a tenant.
    async fn get_message(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> Result<Option<Message>, DatabaseError>;

    // ── Tenant configuration (read-mostly; mutation belongs to the
    //    tenant-facing settings flows) ──────────────────────────────

    /// Get one tenant's config row for a service.
    async fn get_tenant_config(
        &self,
        tenant_id: &str,
        service_name: &str,
    ) -> Result<Option<TenantConfig>, DatabaseError>;

    /// All config rows for a service, across tenants. Used by the webhook
    /// router to resolve the owning tenant from a routing identifier.
    async fn list_configs_for_service(
        &self,
        service_name: &str,
    ) -> Result<Vec<TenantConfig>, DatabaseError>;

    /// Insert or replace a config row.
    async fn put_tenant_config(&self, config: &TenantConfig) -> Result<(), DatabaseError>;

    /// Resolve a bearer token to a tenant id via `api_token` config rows.
    async fn find_tenant_by_api_token(
        &self,
        token: &str,
    ) -> Result<Option<String>, DatabaseError>;

    // ── Templates ───────────────────────────────────────────────────

    /// Upsert a batch of templates keyed `(tenant_id, provider_template_id)`.
    ///
    /// With `include_optional = false` the `buttons` and `rejection_reason`
    /// columns are omitted, so the statement also works against a schema
    /// that predates them.
    async fn upsert_templates(
        &self,
        tenant_id: &str,
        rows: &[TemplateUpsert],
        include_optional: bool,
    ) -> Result<(), DatabaseError>;

    /// Look up one mirrored template.
    async fn get_template(
        &self,
        tenant_id: &str,
        provider_template_id: &str,
    ) -> Result<Option<Template>, DatabaseError>;

    /// Number of mirrored templates for a tenant.
    async fn count_templates(&self, tenant_id: &str) -> Result<usize, DatabaseError>;
}
