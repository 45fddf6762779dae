use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::otp::models::OtpRejection;
use crate::domain::otp::models::OtpVerifyOutcome;
use crate::domain::otp::ports::OtpServicePort;
use crate::inbound::http::router::AppState;

/// Verify an OTP code against its stored hash (standalone API).
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpVerifyBody>,
) -> Result<ApiSuccess<OtpVerifyResponseData>, ApiError> {
    let outcome = state
        .otp
        .verify_code(&body.otp_id, &body.session_id, &body.otp_code)
        .await
        .map_err(ApiError::from)?;

    match outcome {
        OtpVerifyOutcome::Verified { .. } => Ok(ApiSuccess::new(
            StatusCode::OK,
            OtpVerifyResponseData {
                success: true,
                verified: true,
                message: "OTP verified successfully".to_string(),
                attempts_remaining: None,
                next_step: Some("authenticated".to_string()),
            },
        )),
        OtpVerifyOutcome::Rejected {
            reason: OtpRejection::NoActiveCode,
            ..
        } => Err(ApiError::BadRequest("Invalid or expired OTP".to_string())),
        OtpVerifyOutcome::Rejected {
            reason: OtpRejection::SessionMismatch,
            ..
        } => Err(ApiError::BadRequest("Session mismatch".to_string())),
        OtpVerifyOutcome::Rejected {
            reason,
            attempts_remaining,
        } => Ok(ApiSuccess::new(
            StatusCode::OK,
            OtpVerifyResponseData {
                success: false,
                verified: false,
                message: rejection_message(reason, attempts_remaining),
                attempts_remaining: Some(attempts_remaining),
                next_step: None,
            },
        )),
    }
}

fn rejection_message(reason: OtpRejection, attempts_remaining: i32) -> String {
    match reason {
        OtpRejection::Expired => "OTP has expired. Please request a new one.".to_string(),
        OtpRejection::InvalidFormat => "OTP must be 6 digits.".to_string(),
        OtpRejection::AttemptsExhausted => {
            "Maximum verification attempts exceeded. Please request a new OTP.".to_string()
        }
        OtpRejection::Mismatch => {
            format!("Invalid OTP. {attempts_remaining} attempts remaining.")
        }
        // Handled above; kept for exhaustiveness
        OtpRejection::NoActiveCode | OtpRejection::SessionMismatch => {
            "Invalid or expired OTP".to_string()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpVerifyBody {
    pub otp_code: String,
    pub otp_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpVerifyResponseData {
    pub success: bool,
    pub verified: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
}
