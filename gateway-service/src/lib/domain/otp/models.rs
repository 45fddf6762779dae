use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::otp::errors::ContactMethodError;
use crate::domain::rate_limit::models::IdentifierKind;

/// Channel a passcode is delivered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Email,
    Sms,
}

impl OtpChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Email => "email",
            OtpChannel::Sms => "sms",
        }
    }
}

impl FromStr for OtpChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(OtpChannel::Email),
            "sms" => Ok(OtpChannel::Sms),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

impl fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized contact identifier: a lowercased email address or an
/// E.164-style phone number.
///
/// Normalization happens once at the boundary so the same contact always
/// maps to the same rate-limit and OTP rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactMethod {
    Email(String),
    Phone(String),
}

impl ContactMethod {
    /// Parse and normalize a raw identifier.
    ///
    /// Anything containing `@` is treated as an email and validated
    /// RFC 5322-style; everything else is treated as a phone number, has
    /// formatting characters stripped, and gets a `+1` country code when
    /// none was given.
    ///
    /// # Errors
    /// * `InvalidEmail` - Not a parseable email address
    /// * `InvalidPhone` - Too few or too many digits
    pub fn parse(raw: &str) -> Result<Self, ContactMethodError> {
        let trimmed = raw.trim();

        if trimmed.contains('@') {
            email_address::EmailAddress::from_str(trimmed)
                .map(|_| ContactMethod::Email(trimmed.to_lowercase()))
                .map_err(|e| ContactMethodError::InvalidEmail(e.to_string()))
        } else {
            let digits: String = trimmed
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect();
            let normalized = if digits.starts_with('+') {
                digits
            } else {
                // Assume US number if no country code
                format!("+1{digits}")
            };

            let digit_count = normalized.chars().filter(|c| c.is_ascii_digit()).count();
            if (10..=15).contains(&digit_count) {
                Ok(ContactMethod::Phone(normalized))
            } else {
                Err(ContactMethodError::InvalidPhone(trimmed.to_string()))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContactMethod::Email(s) | ContactMethod::Phone(s) => s,
        }
    }

    pub fn channel(&self) -> OtpChannel {
        match self {
            ContactMethod::Email(_) => OtpChannel::Email,
            ContactMethod::Phone(_) => OtpChannel::Sms,
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        match self {
            ContactMethod::Email(_) => IdentifierKind::Email,
            ContactMethod::Phone(_) => IdentifierKind::Phone,
        }
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an OTP request row.
///
/// `Pending` is the only live state; all others are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpStatus {
    Pending,
    Verified,
    Expired,
    Cancelled,
    Blocked,
}

impl OtpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpStatus::Pending => "pending",
            OtpStatus::Verified => "verified",
            OtpStatus::Expired => "expired",
            OtpStatus::Cancelled => "cancelled",
            OtpStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for OtpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OtpStatus::Pending),
            "verified" => Ok(OtpStatus::Verified),
            "expired" => Ok(OtpStatus::Expired),
            "cancelled" => Ok(OtpStatus::Cancelled),
            "blocked" => Ok(OtpStatus::Blocked),
            other => Err(format!("unknown otp status: {other}")),
        }
    }
}

/// One stored OTP request. Only the salted hash is persisted; the plaintext
/// code lives exactly as long as delivery takes.
#[derive(Debug, Clone)]
pub struct OtpRequest {
    pub otp_id: String,
    pub session_id: String,
    pub identifier: String,
    pub channel: OtpChannel,
    pub otp_hash: String,
    pub salt: String,
    pub expires_at: DateTime<Utc>,
    pub attempts_left: i32,
    pub status: OtpStatus,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl OtpRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Outcome of requesting a new code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpRequestOutcome {
    Sent {
        otp_id: String,
        channel: OtpChannel,
        expires_in_minutes: i64,
        requests_remaining: u32,
    },
    RateLimited {
        retry_after_seconds: i64,
    },
    /// The code was generated and stored but could not be delivered; the
    /// caller keeps the id so a resend can retire it.
    DeliveryFailed {
        otp_id: String,
    },
}

/// Outcome of a verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpVerifyOutcome {
    Verified {
        otp_id: String,
        identifier: String,
        channel: OtpChannel,
    },
    Rejected {
        reason: OtpRejection,
        attempts_remaining: i32,
    },
}

/// Why a verification attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    /// No pending code exists (never issued, already consumed, or retired)
    NoActiveCode,
    /// The code's expiry has passed
    Expired,
    /// Submission is not a 6-digit code; does not consume an attempt
    InvalidFormat,
    /// Hash mismatch
    Mismatch,
    /// All attempts used up
    AttemptsExhausted,
    /// The otp_id belongs to a different session
    SessionMismatch,
}

/// Contact method a session proved control of.
#[derive(Debug, Clone)]
pub struct VerifiedContact {
    pub identifier: String,
    pub channel: OtpChannel,
    pub verified_at: DateTime<Utc>,
}

/// 24-hour counters for one identifier, shown on the status endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtpStats {
    pub total_requests: i64,
    pub verified_count: i64,
    pub expired_count: i64,
    pub pending_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_lowercases() {
        let contact = ContactMethod::parse(" Jane.Doe@Example.COM ").unwrap();
        assert_eq!(contact, ContactMethod::Email("jane.doe@example.com".into()));
        assert_eq!(contact.channel(), OtpChannel::Email);
    }

    #[test]
    fn test_parse_email_invalid() {
        assert!(matches!(
            ContactMethod::parse("not-an-email@"),
            Err(ContactMethodError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_parse_phone_normalizes_to_plus_form() {
        let contact = ContactMethod::parse("(555) 111-2222").unwrap();
        assert_eq!(contact, ContactMethod::Phone("+15551112222".into()));
        assert_eq!(contact.channel(), OtpChannel::Sms);
    }

    #[test]
    fn test_parse_phone_keeps_country_code() {
        let contact = ContactMethod::parse("+44 20 7946 0958").unwrap();
        assert_eq!(contact, ContactMethod::Phone("+442079460958".into()));
    }

    #[test]
    fn test_parse_phone_rejects_short_numbers() {
        assert!(matches!(
            ContactMethod::parse("12345"),
            Err(ContactMethodError::InvalidPhone(_))
        ));
    }

    #[test]
    fn test_otp_status_round_trip() {
        for status in [
            OtpStatus::Pending,
            OtpStatus::Verified,
            OtpStatus::Expired,
            OtpStatus::Cancelled,
            OtpStatus::Blocked,
        ] {
            assert_eq!(status.as_str().parse::<OtpStatus>().unwrap(), status);
        }
    }
}
