use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;

use crate::domain::otp::models::OtpChannel;
use crate::domain::session::models::SessionStatus;
use crate::domain::user::models::UserId;

/// What the guest is trying to do, per intent classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Book an appointment; requires identity
    Appointment,
    /// Open a support ticket; requires identity
    Ticket,
    /// Informational question answerable without identity
    Info,
    /// Anything else
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Appointment => "appointment",
            Intent::Ticket => "ticket",
            Intent::Info => "info",
            Intent::General => "general",
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Intent::Appointment | Intent::Ticket)
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appointment" => Ok(Intent::Appointment),
            "ticket" => Ok(Intent::Ticket),
            "info" => Ok(Intent::Info),
            "general" => Ok(Intent::General),
            other => Err(format!("unknown intent: {other}")),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-session scratch record for the auth wizard.
///
/// Collected progressively: names at step 1, DOB and contact at step 2, the
/// user link at OTP verification. Deleted on success or restart. While
/// `user_id` is None the guest is not an account holder: creation is
/// deferred until their contact method is verified.
#[derive(Debug, Clone, Default)]
pub struct AuthTempRecord {
    pub session_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub preferred_otp_channel: Option<OtpChannel>,
    pub user_id: Option<UserId>,
    pub original_intent: Option<Intent>,
    pub original_query: Option<String>,
    /// Step the wizard was on when paused for an unrelated question
    pub auth_paused_state: Option<SessionStatus>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthTempRecord {
    pub fn has_names(&self) -> bool {
        self.first_name.is_some() && self.last_name.is_some()
    }

    /// Preferred contact for resend flows: phone first (healthcare policy),
    /// then email.
    pub fn contact(&self) -> Option<&str> {
        self.phone.as_deref().or(self.email.as_deref())
    }
}

/// First and last name parsed from free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub first_name: String,
    pub last_name: String,
}

/// DOB plus contact details parsed from free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDobContact {
    pub dob: NaiveDate,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Urgency bucket for support tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketPriority {
    High,
    Medium,
    Low,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::High => "high",
            TicketPriority::Medium => "medium",
            TicketPriority::Low => "low",
        }
    }
}

/// One orchestrator turn: the chat-bubble text, the state the session is in
/// afterwards, and a machine-readable outcome for the chatbot UI.
#[derive(Debug, Clone)]
pub struct WizardReply {
    pub output: String,
    pub state: SessionStatus,
    pub detail: ReplyDetail,
}

impl WizardReply {
    pub fn new(output: impl Into<String>, state: SessionStatus, detail: ReplyDetail) -> Self {
        Self {
            output: output.into(),
            state,
            detail,
        }
    }
}

/// Machine-readable outcome of an orchestrator turn. Every error branch is
/// a variant so the HTTP layer handles them exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyDetail {
    /// Plain answer outside the wizard
    General { intent: Intent },
    /// Canned informational answer
    InfoAnswer,
    /// Wizard entered: identity required for the stashed intent
    AuthStarted { original_intent: Intent },
    /// Input could not be parsed; state unchanged
    ValidationError,
    /// Input accepted, wizard moved to the next step
    StepAdvanced,
    /// A fresh code was generated and dispatched
    OtpSent { resent: bool, new_user: bool },
    /// Rate limiter refused a new code; state unchanged
    RateLimited { retry_after_seconds: i64 },
    /// Code generated but not delivered; state unchanged
    DeliveryFailed,
    /// Wrong or dead code: retired for security, resend/restart offered
    OtpRetired,
    /// Wizard finished; session is authenticated
    Authenticated {
        user_id: UserId,
        user_created: bool,
        resumed_intent: Option<Intent>,
    },
    /// OTP verified but the deferred account could not be created
    AccountCreationFailed,
    /// Wizard parked while an unrelated question was answered
    Paused { resume_state: SessionStatus },
    /// Wizard resumed from the paused step
    Resumed,
    /// Wizard wiped back to step 1
    Restarted,
    /// Appointment recorded for an authenticated guest
    AppointmentBooked {
        booking_id: String,
        appointment_type: String,
    },
    /// Support ticket recorded for an authenticated guest
    TicketCreated {
        ticket_id: String,
        ticket_type: String,
        priority: TicketPriority,
    },
}
