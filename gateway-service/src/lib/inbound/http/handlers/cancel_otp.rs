use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::otp::ports::OtpServicePort;
use crate::inbound::http::router::AppState;

/// Cancel a pending OTP before it expires.
pub async fn cancel_otp(
    State(state): State<AppState>,
    Path(otp_id): Path<String>,
    Query(query): Query<CancelOtpQuery>,
) -> Result<ApiSuccess<CancelOtpResponseData>, ApiError> {
    let cancelled = state
        .otp
        .cancel(&otp_id, &query.session_id)
        .await
        .map_err(ApiError::from)?;

    if !cancelled {
        return Err(ApiError::NotFound("OTP not found".to_string()));
    }

    Ok(ApiSuccess::new(
        StatusCode::OK,
        CancelOtpResponseData {
            success: true,
            message: "OTP cancelled successfully".to_string(),
            otp_id,
        },
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOtpQuery {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelOtpResponseData {
    pub success: bool,
    pub message: String,
    pub otp_id: String,
}
