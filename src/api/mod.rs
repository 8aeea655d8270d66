//! HTTP surface — REST endpoints, webhook receivers, and auth.

pub mod auth;
pub mod routes;
pub mod status;

pub use routes::{AppState, build_router};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{DatabaseError, DispatchError, SyncError};

/// API-level error, mapped onto HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"error": self.to_string()}),
            ),

            ApiError::Dispatch(DispatchError::InvalidRequest(_))
            | ApiError::Dispatch(DispatchError::UnsupportedChannel(_)) => (
                StatusCode::BAD_REQUEST,
                json!({"error": self.to_string()}),
            ),
            ApiError::Dispatch(DispatchError::Persistence(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": self.to_string()}),
            ),

            // A tenant that never configured WhatsApp sent a bad request,
            // not a server fault.
            ApiError::Sync(SyncError::ConfigurationMissing { .. })
            | ApiError::Sync(SyncError::CredentialMissing { .. })
            | ApiError::Sync(SyncError::RoutingIdMissing { .. }) => (
                StatusCode::BAD_REQUEST,
                json!({"error": self.to_string()}),
            ),
            ApiError::Sync(SyncError::Provider { .. }) => (
                StatusCode::BAD_GATEWAY,
                json!({"error": self.to_string()}),
            ),
            // Partial progress is reported so a caller can decide whether
            // to retry the whole run.
            ApiError::Sync(SyncError::Persistence {
                synced, downgraded, ..
            }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": self.to_string(),
                    "partial": true,
                    "synced": synced,
                    "downgraded": downgraded,
                }),
            ),

            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": self.to_string()}),
            ),
        };
        (status, Json(body)).into_response()
    }
}
