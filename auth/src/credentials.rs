use std::collections::HashMap;

use crate::otp::engine::constant_time_eq;

/// Credentials for one downstream tenant service.
///
/// Loaded from configuration at startup and immutable for the process
/// lifetime.
#[derive(Debug, Clone)]
pub struct ServiceCredential {
    pub client_id: String,
    pub client_secret: String,
    pub service_name: String,
}

/// Static client-credential store for the tenant services.
pub struct CredentialStore {
    credentials: HashMap<String, ServiceCredential>,
}

impl CredentialStore {
    pub fn new(credentials: impl IntoIterator<Item = ServiceCredential>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|c| (c.client_id.clone(), c))
                .collect(),
        }
    }

    /// Authenticate a client by id and secret.
    ///
    /// The secret comparison is constant-time; unknown client ids and wrong
    /// secrets are indistinguishable to the caller.
    pub fn authenticate(&self, client_id: &str, client_secret: &str) -> Option<&ServiceCredential> {
        let credential = self.credentials.get(client_id)?;

        if constant_time_eq(&credential.client_secret, client_secret) {
            Some(credential)
        } else {
            None
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(vec![
            ServiceCredential {
                client_id: "ecare_client".into(),
                client_secret: "ecare_secret".into(),
                service_name: "ecare".into(),
            },
            ServiceCredential {
                client_id: "georgetown_client".into(),
                client_secret: "georgetown_secret".into(),
                service_name: "georgetown".into(),
            },
        ])
    }

    #[test]
    fn test_authenticate_success() {
        let store = store();
        let credential = store.authenticate("ecare_client", "ecare_secret").unwrap();
        assert_eq!(credential.service_name, "ecare");
    }

    #[test]
    fn test_authenticate_wrong_secret() {
        let store = store();
        assert!(store.authenticate("ecare_client", "georgetown_secret").is_none());
    }

    #[test]
    fn test_authenticate_unknown_client() {
        let store = store();
        assert!(store.authenticate("nobody", "ecare_secret").is_none());
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let store = store();
        assert!(store
            .authenticate("georgetown_client", "ecare_secret")
            .is_none());
    }
}
