use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::otp::models::ContactMethod;
use crate::domain::otp::models::OtpChannel;
use crate::domain::otp::ports::OtpServicePort;
use crate::domain::rate_limit::ports::RateLimiterPort;
use crate::inbound::http::router::AppState;

/// Current OTP quota for an identifier, without consuming a request.
pub async fn rate_limit_status(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<RateLimitQuery>,
) -> Result<ApiSuccess<RateLimitStatusResponseData>, ApiError> {
    let contact = ContactMethod::parse(&identifier)
        .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    if contact.channel() != query.channel {
        return Err(ApiError::BadRequest(
            "Channel must match the identifier type".to_string(),
        ));
    }

    let status = state
        .rate_limiter
        .status(contact.as_str(), contact.kind())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Rate limit status lookup failed");
            ApiError::InternalServerError("Internal server error".to_string())
        })?;

    // Statistics are best-effort decoration; a failure must not take the
    // endpoint down.
    let stats = state.otp.stats(&contact).await.unwrap_or_default();

    Ok(ApiSuccess::new(
        StatusCode::OK,
        RateLimitStatusResponseData {
            identifier: status.identifier,
            channel: query.channel.as_str().to_string(),
            allowed: !status.is_blocked,
            current_count: status.current_count,
            max_requests: status.max_requests,
            requests_remaining: status.remaining,
            reset_in_seconds: status.reset_in_seconds,
            window_minutes: state.otp_config.rate_limit_window_minutes,
            requests_last_24h: stats.total_requests,
            verified_last_24h: stats.verified_count,
        },
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitQuery {
    pub channel: OtpChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatusResponseData {
    pub identifier: String,
    pub channel: String,
    pub allowed: bool,
    pub current_count: u32,
    pub max_requests: u32,
    pub requests_remaining: u32,
    pub reset_in_seconds: i64,
    pub window_minutes: i64,
    pub requests_last_24h: i64,
    pub verified_last_24h: i64,
}
