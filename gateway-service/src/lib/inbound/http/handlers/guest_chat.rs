use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::wizard::models::ReplyDetail;
use crate::domain::wizard::models::WizardReply;
use crate::inbound::http::router::AppState;

/// Guest chat entry point: routes the message through the auth step
/// orchestrator and flattens the typed outcome for the chatbot UI.
pub async fn guest_chat(
    State(state): State<AppState>,
    Json(body): Json<GuestChatRequest>,
) -> Result<ApiSuccess<ChatResponseData>, ApiError> {
    let reply = state
        .wizard
        .handle_message(&body.session_token, &body.user_query)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        ChatResponseData::from_reply(reply, body.session_token),
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuestChatRequest {
    pub user_query: String,
    pub session_token: String,
}

/// Flat chat response: `output` is ready for a chat bubble, the optional
/// fields carry the machine-readable outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponseData {
    pub success: bool,
    pub intent: String,
    pub output: String,
    pub session_token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_resent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_invalid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limited: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restarted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ChatResponseData {
    fn base(intent: impl Into<String>, output: String, session_token: String) -> Self {
        Self {
            success: true,
            intent: intent.into(),
            output,
            session_token,
            validation_error: None,
            requires_auth: None,
            original_intent: None,
            otp_resent: None,
            otp_invalid: None,
            options: None,
            rate_limited: None,
            retry_after: None,
            authenticated: None,
            user_id: None,
            user_created: None,
            restarted: None,
            booking_id: None,
            appointment_type: None,
            ticket_id: None,
            ticket_type: None,
            priority: None,
            error_code: None,
        }
    }

    fn from_reply(reply: WizardReply, session_token: String) -> Self {
        let WizardReply {
            output,
            state,
            detail,
        } = reply;

        match detail {
            ReplyDetail::General { intent } => {
                Self::base(intent.as_str(), output, session_token)
            }
            ReplyDetail::InfoAnswer => Self::base("rag_response", output, session_token),
            ReplyDetail::AuthStarted { original_intent } => Self {
                requires_auth: Some(true),
                original_intent: Some(original_intent.as_str().to_string()),
                ..Self::base("awaiting_auth", output, session_token)
            },
            ReplyDetail::ValidationError => Self {
                validation_error: Some(true),
                ..Self::base(state.as_str(), output, session_token)
            },
            ReplyDetail::StepAdvanced => Self::base(state.as_str(), output, session_token),
            ReplyDetail::OtpSent { resent, .. } => Self {
                otp_resent: resent.then_some(true),
                ..Self::base(state.as_str(), output, session_token)
            },
            ReplyDetail::RateLimited {
                retry_after_seconds,
            } => Self {
                success: false,
                rate_limited: Some(true),
                retry_after: Some(retry_after_seconds),
                ..Self::base(state.as_str(), output, session_token)
            },
            ReplyDetail::DeliveryFailed => Self {
                success: false,
                error_code: Some("otp_delivery_failed".to_string()),
                ..Self::base(state.as_str(), output, session_token)
            },
            ReplyDetail::OtpRetired => Self {
                otp_invalid: Some(true),
                options: Some(vec!["new_otp".to_string(), "restart".to_string()]),
                ..Self::base(state.as_str(), output, session_token)
            },
            ReplyDetail::Authenticated {
                user_id,
                user_created,
                resumed_intent: _,
            } => Self {
                authenticated: Some(true),
                user_id: Some(user_id.to_string()),
                user_created: Some(user_created),
                ..Self::base(state.as_str(), output, session_token)
            },
            ReplyDetail::AccountCreationFailed => Self {
                success: false,
                error_code: Some("user_creation_failed".to_string()),
                ..Self::base("auth_error", output, session_token)
            },
            ReplyDetail::Paused { .. } => Self::base(state.as_str(), output, session_token),
            ReplyDetail::Resumed => Self::base(state.as_str(), output, session_token),
            ReplyDetail::Restarted => Self {
                restarted: Some(true),
                ..Self::base(state.as_str(), output, session_token)
            },
            ReplyDetail::AppointmentBooked {
                booking_id,
                appointment_type,
            } => Self {
                authenticated: Some(true),
                booking_id: Some(booking_id),
                appointment_type: Some(appointment_type),
                ..Self::base("booking", output, session_token)
            },
            ReplyDetail::TicketCreated {
                ticket_id,
                ticket_type,
                priority,
            } => Self {
                authenticated: Some(true),
                ticket_id: Some(ticket_id),
                ticket_type: Some(ticket_type),
                priority: Some(priority.as_str().to_string()),
                ..Self::base("ticket", output, session_token)
            },
        }
    }
}
