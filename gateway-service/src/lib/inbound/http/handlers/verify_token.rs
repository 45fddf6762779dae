use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// Introspect a service bearer token.
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ApiSuccess<VerifyTokenResponseData>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state.authenticator.verify_token(token).map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        VerifyTokenResponseData {
            valid: true,
            service: claims.service_name,
            client_id: claims.sub,
            expires_at: claims.exp,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyTokenResponseData {
    pub valid: bool,
    pub service: String,
    pub client_id: String,
    pub expires_at: i64,
}
