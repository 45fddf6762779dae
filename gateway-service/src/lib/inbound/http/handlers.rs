use auth::JwtError;
use auth::ServiceAuthError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::otp::errors::OtpError;
use crate::domain::session::errors::SessionError;
use crate::domain::wizard::errors::WizardError;

pub mod cancel_otp;
pub mod create_guest_session;
pub mod guest_chat;
pub mod issue_token;
pub mod otp_status;
pub mod rate_limit_status;
pub mod request_otp;
pub mod tenants;
pub mod verify_otp;
pub mod verify_token;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    TooManyRequests { message: String, wait_minutes: i64 },
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::TooManyRequests {
            message,
            wait_minutes,
        } = self
        {
            let status = StatusCode::TOO_MANY_REQUESTS;
            let body = ApiResponseBody::new(
                status,
                RateLimitedData {
                    message,
                    wait_minutes,
                    reason: "rate_limit_exceeded".to_string(),
                },
            );
            return (status, Json(body)).into_response();
        }

        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::TooManyRequests { .. } => unreachable!(),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::InvalidSession => ApiError::Unauthorized(
                "Invalid or expired session token. Please create a new session.".to_string(),
            ),
            other => {
                tracing::error!(error = %other, "Wizard internal error");
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::InvalidContact(e) => ApiError::UnprocessableEntity(e.to_string()),
            OtpError::DatabaseError(e) => {
                tracing::error!(error = %e, "OTP storage error");
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) | SessionError::Expired(id) => {
                ApiError::NotFound(format!("Session not found: {id}"))
            }
            other => {
                tracing::error!(error = %other, "Session storage error");
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

impl From<ServiceAuthError> for ApiError {
    fn from(err: ServiceAuthError) -> Self {
        match err {
            ServiceAuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid client credentials".to_string())
            }
            ServiceAuthError::Jwt(JwtError::TokenExpired) => {
                ApiError::Unauthorized("Token has expired".to_string())
            }
            ServiceAuthError::Jwt(_) => {
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitedData {
    pub message: String,
    pub wait_minutes: i64,
    pub reason: String,
}
