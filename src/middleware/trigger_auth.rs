use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};

use crate::auth::token_matches;
use crate::error::ApiError;
use crate::models::AppState;

/// Proof that the caller presented the configured trigger token.
/// Passes every request when no token hash is configured.
#[derive(Debug, Clone)]
pub struct TriggerAuth;

impl FromRequestParts<AppState> for TriggerAuth {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let Some(expected) = state.trigger_token_hash.as_deref() else {
                return Ok(TriggerAuth);
            };

            // Extract Authorization: Bearer <token>
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::invalid_token())?;

            if !token_matches(authz.token(), expected) {
                tracing::warn!("rejected trigger request with invalid token");
                return Err(ApiError::invalid_token());
            }

            Ok(TriggerAuth)
        }
    }
}
