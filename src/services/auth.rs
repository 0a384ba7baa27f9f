use crate::error::{AppError, Result};
use serde::Serialize;
use uuid::Uuid;

/// Identity established by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

/// External credential-verification collaborator.
///
/// The login handler only depends on this seam: production wires an
/// environment-backed verifier, tests substitute their own.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Result<Principal>;
}

/// Verifier backed by a single credential pair from configuration.
pub struct StaticCredentialVerifier {
    username: String,
    password: String,
}

impl StaticCredentialVerifier {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    /// Build from `COINWATCH_USERNAME` / `COINWATCH_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("COINWATCH_USERNAME")
            .map_err(|_| AppError::Config("COINWATCH_USERNAME is not set".to_string()))?;
        let password = std::env::var("COINWATCH_PASSWORD")
            .map_err(|_| AppError::Config("COINWATCH_PASSWORD is not set".to_string()))?;
        Ok(Self::new(username, password))
    }
}

impl CredentialVerifier for StaticCredentialVerifier {
    fn verify(&self, username: &str, password: &str) -> Result<Principal> {
        if username == self.username && password == self.password {
            Ok(Principal {
                username: username.to_string(),
            })
        } else {
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Verifier used when no credentials are configured: every login fails.
pub struct RejectAllVerifier;

impl CredentialVerifier for RejectAllVerifier {
    fn verify(&self, _username: &str, _password: &str) -> Result<Principal> {
        Err(AppError::InvalidCredentials)
    }
}

/// Opaque token pair issued on login.
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn issue_tokens(_principal: &Principal) -> AuthTokens {
    AuthTokens {
        access_token: Uuid::new_v4().to_string(),
        refresh_token: Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_credentials_yield_a_principal() {
        let verifier = StaticCredentialVerifier::new("alice".to_string(), "s3cret".to_string());
        let principal = verifier.verify("alice", "s3cret").unwrap();
        assert_eq!(principal.username, "alice");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let verifier = StaticCredentialVerifier::new("alice".to_string(), "s3cret".to_string());
        assert!(matches!(
            verifier.verify("alice", "wrong").unwrap_err(),
            AppError::InvalidCredentials
        ));
        assert!(matches!(
            verifier.verify("mallory", "s3cret").unwrap_err(),
            AppError::InvalidCredentials
        ));
    }

    #[test]
    fn issued_tokens_are_distinct() {
        let principal = Principal {
            username: "alice".to_string(),
        };
        let tokens = issue_tokens(&principal);
        assert_ne!(tokens.access_token, tokens.refresh_token);
    }
}
