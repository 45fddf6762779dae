use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::otp::models::ContactMethod;
use crate::domain::otp::models::OtpChannel;
use crate::domain::otp::models::OtpRequestOutcome;
use crate::domain::otp::ports::OtpServicePort;
use crate::inbound::http::router::AppState;

/// Generate and send an OTP via email or SMS (standalone API).
pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpRequestBody>,
) -> Result<ApiSuccess<OtpRequestResponseData>, ApiError> {
    let contact = ContactMethod::parse(&body.identifier)
        .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    if contact.channel() != body.channel {
        return Err(ApiError::UnprocessableEntity(format!(
            "Identifier does not match channel '{}'",
            body.channel.as_str()
        )));
    }

    let outcome = state
        .otp
        .request_code(
            &body.session_id,
            &contact,
            state.otp_config.standalone_max_attempts,
        )
        .await
        .map_err(ApiError::from)?;

    match outcome {
        OtpRequestOutcome::Sent {
            otp_id,
            channel,
            expires_in_minutes,
            requests_remaining,
        } => Ok(ApiSuccess::new(
            StatusCode::OK,
            OtpRequestResponseData {
                success: true,
                message: format!("OTP sent successfully via {channel}"),
                otp_id: Some(otp_id),
                channel: channel.as_str().to_string(),
                expires_in_minutes: Some(expires_in_minutes),
                rate_limit_info: Some(RateLimitInfo {
                    requests_remaining,
                    window_minutes: state.otp_config.rate_limit_window_minutes,
                }),
            },
        )),
        OtpRequestOutcome::RateLimited {
            retry_after_seconds,
        } => {
            let wait_minutes = retry_after_seconds / 60 + 1;
            Err(ApiError::TooManyRequests {
                message: format!(
                    "Too many OTP requests. Please try again in {wait_minutes} minutes."
                ),
                wait_minutes,
            })
        }
        // The code exists and can be resent; hand the id back with the error.
        OtpRequestOutcome::DeliveryFailed { otp_id } => Ok(ApiSuccess::new(
            StatusCode::BAD_GATEWAY,
            OtpRequestResponseData {
                success: false,
                message: format!("Failed to send OTP via {}", body.channel.as_str()),
                otp_id: Some(otp_id),
                channel: body.channel.as_str().to_string(),
                expires_in_minutes: None,
                rate_limit_info: None,
            },
        )),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpRequestBody {
    pub identifier: String,
    pub channel: OtpChannel,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpRequestResponseData {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_id: Option<String>,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_info: Option<RateLimitInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub requests_remaining: u32,
    pub window_minutes: i64,
}
