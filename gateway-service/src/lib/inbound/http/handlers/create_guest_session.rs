use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// Create a new guest chat session.
pub async fn create_guest_session(
    State(state): State<AppState>,
) -> Result<ApiSuccess<GuestSessionResponseData>, ApiError> {
    let session = state.sessions.create_session().await.map_err(ApiError::from)?;

    let expires_in = (session.expires_at - Utc::now()).num_seconds().max(0);

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        GuestSessionResponseData {
            session_token: session.session_id,
            expires_in,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestSessionResponseData {
    pub session_token: String,
    pub expires_in: i64,
}
