use crate::credentials::CredentialStore;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::ServiceClaims;

/// Service-to-service authentication: validates client credentials and
/// mints/verifies the short-lived bearer tokens that carry
/// `(client_id, service_name)`.
///
/// Stateless beyond the static credential store; tokens are never persisted.
pub struct ServiceAuthenticator {
    credentials: CredentialStore,
    jwt_handler: JwtHandler,
    token_ttl_hours: i64,
}

/// Result of successful client authentication.
pub struct IssuedToken {
    /// Signed JWT bearer token
    pub access_token: String,
    /// Tenant the token acts as
    pub service_name: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

/// Service authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceAuthError {
    #[error("Invalid client credentials")]
    InvalidCredentials,

    #[error("Token error: {0}")]
    Jwt(#[from] JwtError),
}

impl ServiceAuthenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `credentials` - Static per-tenant client credentials
    /// * `jwt_secret` - Secret key for token signing
    /// * `token_ttl_hours` - Lifetime of issued tokens
    pub fn new(credentials: CredentialStore, jwt_secret: &[u8], token_ttl_hours: i64) -> Self {
        Self {
            credentials,
            jwt_handler: JwtHandler::new(jwt_secret),
            token_ttl_hours,
        }
    }

    /// Verify client credentials and issue a bearer token for the tenant.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown client id or wrong secret
    /// * `Jwt` - Token signing failed
    pub fn issue_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<IssuedToken, ServiceAuthError> {
        let credential = self
            .credentials
            .authenticate(client_id, client_secret)
            .ok_or(ServiceAuthError::InvalidCredentials)?;

        let claims = ServiceClaims::for_service(
            &credential.client_id,
            &credential.service_name,
            self.token_ttl_hours,
        );
        let access_token = self.jwt_handler.encode(&claims)?;

        Ok(IssuedToken {
            access_token,
            service_name: credential.service_name.clone(),
            expires_in: claims.lifetime_seconds(),
        })
    }

    /// Validate a bearer token and return its claims.
    ///
    /// # Errors
    /// * `Jwt(TokenExpired)` - Token expiry has passed
    /// * `Jwt(InvalidToken)` - Tampered, malformed, or wrongly signed token
    pub fn verify_token(&self, token: &str) -> Result<ServiceClaims, ServiceAuthError> {
        Ok(self.jwt_handler.decode(token)?)
    }
}
