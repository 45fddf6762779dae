use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// OAuth2 client-credentials flow for the downstream tenant services.
pub async fn issue_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Result<ApiSuccess<TokenResponseData>, ApiError> {
    let issued = state
        .authenticator
        .issue_token(&body.client_id, &body.client_secret)
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        TokenResponseData {
            access_token: issued.access_token,
            token_type: "bearer".to_string(),
            expires_in: issued.expires_in,
            service_name: issued.service_name,
        },
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponseData {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub service_name: String,
}
