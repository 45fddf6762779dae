//! Free-text parsing for the auth wizard: names, DOB + contact details,
//! control keywords, and task-type extraction for resumed flows.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::domain::wizard::models::ParsedDobContact;
use crate::domain::wizard::models::ParsedName;
use crate::domain::wizard::models::TicketPriority;

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{4})").unwrap())
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap())
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // (123) 456-7890, 123-456-7890, 123.456.7890, 1234567890
    RE.get_or_init(|| Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap())
}

/// Parse "John Smith" into first and last name. Multi-word last names keep
/// their remaining tokens ("Mary Ann Smith" → Mary / Ann Smith).
pub fn parse_name(input: &str) -> Option<ParsedName> {
    let words: Vec<&str> = input.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }

    // Names never carry digits; reject "jane 03/12/1985" style input.
    if words.iter().any(|w| w.chars().any(|c| c.is_ascii_digit())) {
        return None;
    }

    Some(ParsedName {
        first_name: capitalize(words[0]),
        last_name: capitalize(&words[1..].join(" ")),
    })
}

/// Parse a date of birth plus contact details from one message, e.g.
/// "03/12/1985 (555) 111-2222" or "01/15/1990 john@email.com".
///
/// Returns None unless a valid date and at least one contact method are
/// present.
pub fn parse_dob_contact(input: &str) -> Option<ParsedDobContact> {
    let captures = date_re().captures(input)?;
    let month: u32 = captures[1].parse().ok()?;
    let day: u32 = captures[2].parse().ok()?;
    let year: i32 = captures[3].parse().ok()?;
    let dob = NaiveDate::from_ymd_opt(year, month, day)?;

    let email = email_re().find(input).map(|m| m.as_str().to_string());
    let phone = phone_re().find(input).map(|m| {
        m.as_str()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect::<String>()
    });

    if email.is_none() && phone.is_none() {
        return None;
    }

    Some(ParsedDobContact { dob, email, phone })
}

pub fn is_restart_keyword(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "restart" | "start over" | "begin again"
    )
}

pub fn is_resend_keyword(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "new otp" | "resend" | "resend otp" | "new code" | "resend code"
    )
}

pub fn is_continue_keyword(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "continue" | "resume" | "go on"
    )
}

/// Heuristic for "the guest asked an unrelated question mid-wizard":
/// question-like phrasing rather than the data we prompted for.
pub fn looks_like_question(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.ends_with('?') {
        return true;
    }

    let first_word = trimmed
        .split_whitespace()
        .next()
        .map(|w| w.to_lowercase())
        .unwrap_or_default();
    matches!(
        first_word.as_str(),
        "what" | "when" | "where" | "who" | "why" | "how" | "can" | "do" | "does" | "is" | "are"
    )
}

pub fn extract_ticket_type(query: &str) -> &'static str {
    let query = query.to_lowercase();

    let ticket_types: [(&str, &[&str]); 4] = [
        ("prescription_refill", &["prescription", "refill", "medication"]),
        ("billing", &["billing", "bill", "payment", "insurance"]),
        ("lab_results", &["result", "lab", "test"]),
        ("referral", &["referral", "specialist"]),
    ];

    for (ticket_type, keywords) in ticket_types {
        if keywords.iter().any(|word| query.contains(word)) {
            return ticket_type;
        }
    }

    "general_support"
}

pub fn extract_appointment_type(query: &str) -> &'static str {
    let query = query.to_lowercase();

    let appointment_types: [(&str, &[&str]); 5] = [
        ("cardiology", &["cardio", "heart", "chest pain"]),
        ("dental", &["dental", "tooth", "teeth"]),
        ("ophthalmology", &["eye", "vision", "glasses"]),
        ("dermatology", &["skin", "rash", "dermat"]),
        ("general_checkup", &["check", "physical", "routine"]),
    ];

    for (appointment_type, keywords) in appointment_types {
        if keywords.iter().any(|word| query.contains(word)) {
            return appointment_type;
        }
    }

    "general"
}

pub fn ticket_priority(query: &str) -> TicketPriority {
    let query = query.to_lowercase();

    if ["urgent", "emergency", "pain", "bleeding"]
        .iter()
        .any(|word| query.contains(word))
    {
        TicketPriority::High
    } else if ["soon", "important", "medication"]
        .iter()
        .any(|word| query.contains(word))
    {
        TicketPriority::Medium
    } else {
        TicketPriority::Low
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_two_words() {
        let parsed = parse_name("John Smith").unwrap();
        assert_eq!(parsed.first_name, "John");
        assert_eq!(parsed.last_name, "Smith");
    }

    #[test]
    fn test_parse_name_capitalizes() {
        let parsed = parse_name("jane doe").unwrap();
        assert_eq!(parsed.first_name, "Jane");
        assert_eq!(parsed.last_name, "Doe");
    }

    #[test]
    fn test_parse_name_multi_word_last_name() {
        let parsed = parse_name("mary ann smith").unwrap();
        assert_eq!(parsed.first_name, "Mary");
        assert_eq!(parsed.last_name, "Ann smith");
    }

    #[test]
    fn test_parse_name_single_token_fails() {
        assert!(parse_name("John").is_none());
        assert!(parse_name("   ").is_none());
    }

    #[test]
    fn test_parse_name_rejects_digits() {
        assert!(parse_name("jane 03/12/1985").is_none());
    }

    #[test]
    fn test_parse_dob_phone() {
        let parsed = parse_dob_contact("03/12/1985 (555) 111-2222").unwrap();
        assert_eq!(parsed.dob, NaiveDate::from_ymd_opt(1985, 3, 12).unwrap());
        assert_eq!(parsed.phone.as_deref(), Some("5551112222"));
        assert!(parsed.email.is_none());
    }

    #[test]
    fn test_parse_dob_email() {
        let parsed = parse_dob_contact("01/15/1990 john@email.com").unwrap();
        assert_eq!(parsed.dob, NaiveDate::from_ymd_opt(1990, 1, 15).unwrap());
        assert_eq!(parsed.email.as_deref(), Some("john@email.com"));
        assert!(parsed.phone.is_none());
    }

    #[test]
    fn test_parse_dob_dashed_date() {
        let parsed = parse_dob_contact("01-15-1990 555-123-4567").unwrap();
        assert_eq!(parsed.dob, NaiveDate::from_ymd_opt(1990, 1, 15).unwrap());
        assert_eq!(parsed.phone.as_deref(), Some("5551234567"));
    }

    #[test]
    fn test_parse_dob_requires_contact() {
        assert!(parse_dob_contact("01/15/1990").is_none());
    }

    #[test]
    fn test_parse_dob_rejects_invalid_date() {
        assert!(parse_dob_contact("13/45/1990 555-123-4567").is_none());
    }

    #[test]
    fn test_keywords() {
        assert!(is_restart_keyword(" Restart "));
        assert!(is_restart_keyword("start over"));
        assert!(!is_restart_keyword("restart please"));

        assert!(is_resend_keyword("new otp"));
        assert!(is_resend_keyword("RESEND CODE"));
        assert!(!is_resend_keyword("123456"));

        assert!(is_continue_keyword("continue"));
        assert!(!is_continue_keyword("continually"));
    }

    #[test]
    fn test_looks_like_question() {
        assert!(looks_like_question("What are your hours?"));
        assert!(looks_like_question("do you take my insurance"));
        assert!(!looks_like_question("John Smith"));
        assert!(!looks_like_question("03/12/1985 (555) 111-2222"));
    }

    #[test]
    fn test_extract_ticket_type() {
        assert_eq!(extract_ticket_type("I need a prescription refill"), "prescription_refill");
        assert_eq!(extract_ticket_type("question about my bill"), "billing");
        assert_eq!(extract_ticket_type("something else entirely"), "general_support");
    }

    #[test]
    fn test_extract_appointment_type() {
        assert_eq!(extract_appointment_type("my heart hurts"), "cardiology");
        assert_eq!(extract_appointment_type("routine physical"), "general_checkup");
        assert_eq!(extract_appointment_type("see a doctor"), "general");
    }

    #[test]
    fn test_ticket_priority() {
        assert_eq!(ticket_priority("urgent bleeding"), TicketPriority::High);
        assert_eq!(ticket_priority("need medication soon"), TicketPriority::Medium);
        assert_eq!(ticket_priority("general question"), TicketPriority::Low);
    }
}
