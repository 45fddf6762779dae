use async_trait::async_trait;

use crate::domain::otp::errors::DeliveryError;
use crate::domain::otp::models::ContactMethod;
use crate::domain::otp::ports::OtpDelivery;

/// Development delivery adapter: logs the dispatch instead of calling a
/// provider. Real SMTP/SMS integration implements [`OtpDelivery`] in its
/// place; everything upstream is provider-agnostic.
pub struct LogOtpDelivery;

impl LogOtpDelivery {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogOtpDelivery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpDelivery for LogOtpDelivery {
    async fn send_code(
        &self,
        contact: &ContactMethod,
        code: &str,
        session_id: &str,
    ) -> Result<(), DeliveryError> {
        tracing::info!(
            channel = %contact.channel(),
            identifier = contact.as_str(),
            session_id,
            "Dispatching verification code"
        );
        // The plaintext code is debug-only output for local development.
        tracing::debug!(code, "Verification code (development only)");

        Ok(())
    }
}
