pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

// Re-export commonly used types
pub use domain::otp::service::OtpService;
pub use domain::rate_limit::service::RateLimiter;
pub use domain::session::service::SessionService;
pub use domain::wizard::service::WizardService;
