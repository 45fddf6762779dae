use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::otp::ports::OtpServicePort;
use crate::inbound::http::router::AppState;

/// Whether a session has a verified contact method.
pub async fn otp_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<ApiSuccess<OtpStatusResponseData>, ApiError> {
    let verified = state
        .otp
        .verified_contact(&session_id)
        .await
        .map_err(ApiError::from)?;

    let data = match verified {
        Some(contact) => OtpStatusResponseData {
            authenticated: true,
            session_id,
            identifier: Some(contact.identifier),
            channel: Some(contact.channel.as_str().to_string()),
            verified_at: Some(contact.verified_at),
            message: None,
        },
        None => OtpStatusResponseData {
            authenticated: false,
            session_id,
            identifier: None,
            channel: None,
            verified_at: None,
            message: Some("Session not authenticated via OTP".to_string()),
        },
    };

    Ok(ApiSuccess::new(StatusCode::OK, data))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpStatusResponseData {
    pub authenticated: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
