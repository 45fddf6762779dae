//! Authentication primitives for the gateway
//!
//! Provides the reusable authentication infrastructure shared by the gateway
//! service:
//! - Service client credentials (OAuth2 client-credentials style)
//! - JWT service-token generation and validation
//! - One-time-passcode generation, hashing, and verification
//!
//! The gateway defines its own ports around these building blocks and injects
//! them explicitly; nothing in this crate touches storage or the network.
//!
//! # Examples
//!
//! ## Service tokens
//! ```
//! use auth::{CredentialStore, ServiceAuthenticator, ServiceCredential};
//!
//! let store = CredentialStore::new(vec![ServiceCredential {
//!     client_id: "ecare_client".into(),
//!     client_secret: "ecare_secret".into(),
//!     service_name: "ecare".into(),
//! }]);
//! let authenticator =
//!     ServiceAuthenticator::new(store, b"secret_key_at_least_32_bytes_long!", 24);
//!
//! let issued = authenticator.issue_token("ecare_client", "ecare_secret").unwrap();
//! let claims = authenticator.verify_token(&issued.access_token).unwrap();
//! assert_eq!(claims.service_name, "ecare");
//! ```
//!
//! ## One-time passcodes
//! ```
//! use auth::OtpEngine;
//!
//! let engine = OtpEngine::new();
//! let generated = engine.generate();
//! assert!(engine.verify(&generated.code, &generated.hash, &generated.salt).unwrap());
//! ```

pub mod authenticator;
pub mod credentials;
pub mod jwt;
pub mod otp;

// Re-export commonly used items
pub use authenticator::IssuedToken;
pub use authenticator::ServiceAuthError;
pub use authenticator::ServiceAuthenticator;
pub use credentials::CredentialStore;
pub use credentials::ServiceCredential;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::ServiceClaims;
pub use otp::GeneratedCode;
pub use otp::OtpCodeError;
pub use otp::OtpEngine;
