//! Bearer-token tenant authentication.
//!
//! Tokens live in `tenant_configs` under the `api_token` service; the token
//! value is the row's `api_key`. Resolving a token yields the tenant id every
//! authenticated handler is scoped to.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::api::ApiError;
use crate::api::routes::AppState;

/// The authenticated tenant, extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct Tenant(pub String);

impl FromRequestParts<AppState> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        match state.store.find_tenant_by_api_token(token).await {
            Ok(Some(tenant_id)) => Ok(Tenant(tenant_id)),
            Ok(None) => {
                debug!("Bearer token matched no tenant");
                Err(ApiError::Unauthorized)
            }
            Err(e) => Err(ApiError::Database(e)),
        }
    }
}
