//! Route table and request handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::ApiError;
use crate::api::auth::Tenant;
use crate::api::status::tenant_status;
use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::model::{Channel, Direction, SendRequest};
use crate::store::{MessageFilter, Store};
use crate::templates::TemplateSyncEngine;
use crate::webhooks::{InboundOutcome, InboundRouter, parse_webhook_body};

const MAX_LIST_LIMIT: usize = 200;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<Dispatcher>,
    pub inbound: Arc<InboundRouter>,
    pub sync: Arc<TemplateSyncEngine>,
    pub config: AppConfig,
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/messages", get(list_messages))
        .route("/messages/send", post(send_message))
        .route("/webhooks/sms", post(sms_webhook))
        .route("/webhooks/whatsapp", get(whatsapp_verify).post(whatsapp_webhook))
        .route("/templates/sync", post(sync_templates))
        .route("/system/status", get(system_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Messages ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    channel: Option<String>,
    direction: Option<String>,
    limit: Option<usize>,
}

/// GET /messages
///
/// Most recent first, scoped to the authenticated tenant. Optional
/// `channel` / `direction` filters; `limit` is capped.
async fn list_messages(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut filter = MessageFilter::default();
    if let Some(tag) = query.channel.as_deref() {
        filter.channel = Some(Channel::parse(tag).ok_or_else(|| {
            DispatchError::InvalidRequest(format!("Unknown channel filter: {tag}"))
        })?);
    }
    if let Some(tag) = query.direction.as_deref() {
        filter.direction = Some(Direction::parse(tag).ok_or_else(|| {
            DispatchError::InvalidRequest(format!("Unknown direction filter: {tag}"))
        })?);
    }
    let limit = query.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);

    let messages = state.store.list_messages(&tenant_id, filter, limit).await?;
    Ok(Json(json!({"messages": messages})))
}

/// POST /messages/send
async fn send_message(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
    Json(request): Json<SendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.dispatcher.dispatch(&tenant_id, &request).await?;
    let body = if outcome.queued {
        json!({"message": outcome.message, "queued": true})
    } else {
        json!({"message": outcome.message})
    };
    Ok(Json(body))
}

// ── Webhooks ────────────────────────────────────────────────────────

fn webhook_response(outcome: InboundOutcome) -> Json<serde_json::Value> {
    match outcome {
        InboundOutcome::Ignored => Json(json!({"ignored": true})),
        InboundOutcome::Accepted { stored } => Json(json!({"ok": true, "stored": stored})),
    }
}

/// POST /webhooks/sms
///
/// Unauthenticated by design: gateways cannot carry our bearer tokens.
/// Tenant attribution happens by routing identifier, and the response is
/// 200 regardless so providers do not retry-storm us.
async fn sms_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload = parse_webhook_body(&body);
    webhook_response(state.inbound.route_sms(&payload).await)
}

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /webhooks/whatsapp — Meta's subscription handshake. Echo the
/// challenge when the verify token matches, 403 otherwise.
async fn whatsapp_verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> impl IntoResponse {
    let expected = state.config.whatsapp_verify_token.as_deref();
    let presented = query.verify_token.as_deref();
    if query.mode.as_deref() == Some("subscribe")
        && expected.is_some()
        && presented == expected
    {
        info!("WhatsApp webhook verification succeeded");
        (StatusCode::OK, query.challenge.unwrap_or_default()).into_response()
    } else {
        (StatusCode::FORBIDDEN, "verification failed").into_response()
    }
}

/// POST /webhooks/whatsapp
async fn whatsapp_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload = parse_webhook_body(&body);
    webhook_response(state.inbound.route_whatsapp(&payload).await)
}

// ── Templates & status ──────────────────────────────────────────────

/// POST /templates/sync
async fn sync_templates(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.sync.reconcile(&tenant_id).await?;
    Ok(Json(json!({
        "synced": report.synced,
        "downgraded": report.downgraded,
    })))
}

/// GET /system/status
async fn system_status(
    State(state): State<AppState>,
    Tenant(tenant_id): Tenant,
) -> Result<impl IntoResponse, ApiError> {
    let issues = tenant_status(&state.store, &tenant_id).await?;
    Ok(Json(json!({"issues": issues})))
}
