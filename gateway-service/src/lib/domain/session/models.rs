use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;

use crate::domain::session::errors::SessionStatusError;
use crate::domain::user::models::UserId;

/// Guest session aggregate.
///
/// A session is a database row, not an in-memory object: any gateway
/// instance can pick up the next message in a conversation. Expiry is data:
/// a session is expired the moment a reader notices `expires_at` has passed.
#[derive(Debug, Clone)]
pub struct GuestSession {
    pub session_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl GuestSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Conversation state a guest session occupies.
///
/// The auth wizard walks `AwaitingAuthDetails` → `AwaitingDobEmail` →
/// `AwaitingOtp` → `Authenticated`; `AuthPaused` parks the wizard while an
/// unrelated question is answered, and the booking/ticket states carry a
/// resumed task after authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    AwaitingAuthDetails,
    AwaitingDobEmail,
    AwaitingOtp,
    AuthPaused,
    Authenticated,
    BookingAppointment,
    CreatingTicket,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::AwaitingAuthDetails => "awaiting_auth_details",
            SessionStatus::AwaitingDobEmail => "awaiting_dob_email",
            SessionStatus::AwaitingOtp => "awaiting_otp",
            SessionStatus::AuthPaused => "auth_paused",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::BookingAppointment => "booking_appointment",
            SessionStatus::CreatingTicket => "creating_ticket",
            SessionStatus::Expired => "expired",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = SessionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "awaiting_auth_details" => Ok(SessionStatus::AwaitingAuthDetails),
            "awaiting_dob_email" => Ok(SessionStatus::AwaitingDobEmail),
            "awaiting_otp" => Ok(SessionStatus::AwaitingOtp),
            "auth_paused" => Ok(SessionStatus::AuthPaused),
            "authenticated" => Ok(SessionStatus::Authenticated),
            "booking_appointment" => Ok(SessionStatus::BookingAppointment),
            "creating_ticket" => Ok(SessionStatus::CreatingTicket),
            "expired" => Ok(SessionStatus::Expired),
            other => Err(SessionStatusError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link between a guest session and the verified user behind it.
#[derive(Debug, Clone)]
pub struct AuthenticatedLink {
    pub session_id: String,
    pub user_id: UserId,
    pub authenticated_at: DateTime<Utc>,
}

/// One exchange recorded into the chat history.
///
/// Sensitive steps store redacted placeholders instead of the raw user
/// input, so names, birth dates, and codes never land in the history table.
#[derive(Debug, Clone)]
pub struct ChatRecord {
    pub session_id: String,
    pub user_query: String,
    pub bot_response: String,
    pub session_state: SessionStatus,
    pub intent: String,
    pub is_sensitive: bool,
}

impl ChatRecord {
    pub fn new(
        session_id: impl Into<String>,
        user_query: impl Into<String>,
        bot_response: impl Into<String>,
        session_state: SessionStatus,
        intent: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_query: user_query.into(),
            bot_response: bot_response.into(),
            session_state,
            intent: intent.into(),
            is_sensitive: false,
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.is_sensitive = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_round_trip() {
        for status in [
            SessionStatus::Active,
            SessionStatus::AwaitingAuthDetails,
            SessionStatus::AwaitingDobEmail,
            SessionStatus::AwaitingOtp,
            SessionStatus::AuthPaused,
            SessionStatus::Authenticated,
            SessionStatus::BookingAppointment,
            SessionStatus::CreatingTicket,
            SessionStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_unknown() {
        assert!("bogus".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = GuestSession {
            session_id: "guest_abc".into(),
            status: SessionStatus::Active,
            created_at: now,
            expires_at: now + Duration::minutes(60),
            last_activity: now,
        };

        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::minutes(61)));
    }
}
