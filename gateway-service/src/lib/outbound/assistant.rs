use async_trait::async_trait;

use crate::domain::wizard::models::Intent;
use crate::domain::wizard::ports::ChatAssistant;

/// Keyword-based stand-in for the AI chatbot collaborator: intent
/// classification by keyword lists and canned answers for the common
/// front-desk questions.
pub struct KeywordAssistant;

impl KeywordAssistant {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KeywordAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatAssistant for KeywordAssistant {
    async fn classify(&self, query: &str) -> Intent {
        let query = query.to_lowercase();

        if ["appointment", "book", "schedule", "visit"]
            .iter()
            .any(|word| query.contains(word))
        {
            Intent::Appointment
        } else if ["ticket", "issue", "problem", "refill", "prescription"]
            .iter()
            .any(|word| query.contains(word))
        {
            Intent::Ticket
        } else if ["hours", "location", "address", "services", "doctors", "insurance"]
            .iter()
            .any(|word| query.contains(word))
        {
            Intent::Info
        } else {
            Intent::General
        }
    }

    async fn answer_info(&self, query: &str) -> String {
        let query = query.to_lowercase();

        if ["hours", "time", "open", "close"]
            .iter()
            .any(|word| query.contains(word))
        {
            "Our office hours are Monday through Friday, 8:00 AM to 6:00 PM. We're closed on \
             weekends and holidays."
                .to_string()
        } else if ["location", "address", "where"]
            .iter()
            .any(|word| query.contains(word))
        {
            "We're located at 123 Healthcare Drive, Medical City, State 12345. We have \
             convenient parking available."
                .to_string()
        } else if ["insurance", "cost", "price", "payment"]
            .iter()
            .any(|word| query.contains(word))
        {
            "We accept most major insurance plans. For specific coverage questions, please \
             contact our billing department."
                .to_string()
        } else if ["emergency", "urgent"].iter().any(|word| query.contains(word)) {
            "For medical emergencies, please call 911 immediately. For urgent care needs, \
             visit our urgent care center."
                .to_string()
        } else {
            "I'm here to help with your healthcare needs! I can provide information about \
             our services, hours, and location, and help you schedule appointments once \
             you're verified."
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_classify_intents() {
        let assistant = KeywordAssistant::new();

        assert_eq!(assistant.classify("book me a visit").await, Intent::Appointment);
        assert_eq!(
            assistant.classify("I have a billing issue").await,
            Intent::Ticket
        );
        assert_eq!(assistant.classify("what are your hours").await, Intent::Info);
        assert_eq!(assistant.classify("hello there").await, Intent::General);
    }

    #[tokio::test]
    async fn test_answers_match_topics() {
        let assistant = KeywordAssistant::new();

        assert!(assistant
            .answer_info("when do you open")
            .await
            .contains("office hours"));
        assert!(assistant
            .answer_info("where are you located")
            .await
            .contains("Healthcare Drive"));
    }
}
