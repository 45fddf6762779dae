pub mod otp;
pub mod rate_limit;
pub mod session;
pub mod user;
pub mod wizard;
