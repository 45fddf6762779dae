use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Claims carried by a service bearer token.
///
/// `sub` holds the client id of the downstream tenant service; `service_name`
/// names the tenant the token may act as. Tokens are bearer-only and never
/// persisted, so expiry is the only revocation mechanism.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceClaims {
    /// Subject: the client id the token was issued to
    pub sub: String,

    /// Tenant service the client is allowed to act as
    pub service_name: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl ServiceClaims {
    /// Create claims for a tenant service with automatic expiration.
    pub fn for_service(
        client_id: impl Into<String>,
        service_name: impl Into<String>,
        expiration_hours: i64,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + Duration::hours(expiration_hours);

        Self {
            sub: client_id.into(),
            service_name: service_name.into(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Seconds until the token expires, measured from issuance.
    pub fn lifetime_seconds(&self) -> i64 {
        self.exp - self.iat
    }

    /// Check if the token is expired at the given timestamp.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_service() {
        let claims = ServiceClaims::for_service("ecare_client", "ecare", 24);

        assert_eq!(claims.sub, "ecare_client");
        assert_eq!(claims.service_name, "ecare");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_lifetime_seconds() {
        let claims = ServiceClaims::for_service("c", "s", 1);
        assert_eq!(claims.lifetime_seconds(), 3600);
    }

    #[test]
    fn test_is_expired() {
        let mut claims = ServiceClaims::for_service("c", "s", 1);
        claims.exp = 1000;

        assert!(!claims.is_expired(999));
        assert!(!claims.is_expired(1000)); // exactly at expiration
        assert!(claims.is_expired(1001));
    }
}
