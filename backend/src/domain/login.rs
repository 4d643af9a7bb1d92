//! Login and bearer-token authentication services.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::domain::ports::{LoginService, SessionAuthenticator};
use crate::domain::{
    CredentialManager, Error, LoginCredentials, SessionError, SessionIssuer, SessionToken,
    Username,
};

/// Message returned for every failed login.
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Verifies credentials against stored accounts and issues session tokens.
#[derive(Clone)]
pub struct AccountLoginService {
    credentials: CredentialManager,
    issuer: Arc<SessionIssuer>,
}

impl AccountLoginService {
    /// Combine an account store with a token issuer.
    pub fn new(credentials: CredentialManager, issuer: Arc<SessionIssuer>) -> Self {
        Self {
            credentials,
            issuer,
        }
    }
}

#[async_trait]
impl LoginService for AccountLoginService {
    async fn login(&self, credentials: &LoginCredentials) -> Result<SessionToken, Error> {
        let username = credentials.username();
        if !self
            .credentials
            .verify(username.as_ref(), credentials.password())
            .await
        {
            debug!(username = %username, "login refused");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        let token = self.issuer.issue(username).map_err(|err| {
            error!(error = %err, "session token signing failed");
            Error::internal("failed to issue session token")
        })?;
        info!(username = %username, expires_at = %token.expires_at(), "session issued");
        Ok(token)
    }
}

impl SessionAuthenticator for SessionIssuer {
    fn authenticate(&self, token: &str) -> Result<Username, Error> {
        Self::authenticate(self, token).map_err(|err: SessionError| {
            debug!(error = %err, "bearer token refused");
            Error::unauthorized(err.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::SigningSecret;
    use crate::outbound::memory::InMemoryDocumentStore;
    use crate::test_support::MutableClock;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    struct Harness {
        service: AccountLoginService,
        issuer: Arc<SessionIssuer>,
        clock: Arc<MutableClock>,
    }

    #[fixture]
    async fn harness() -> Harness {
        let clock = Arc::new(MutableClock::at("2026-10-18T09:30:00Z"));
        let secret = SigningSecret::new(b"login-service-secret".to_vec()).expect("secret");
        let issuer = Arc::new(SessionIssuer::new(&secret, clock.clone()));
        let credentials = CredentialManager::new(Arc::new(InMemoryDocumentStore::new()));
        credentials.register("bob", "pw").await.expect("signup");
        Harness {
            service: AccountLoginService::new(credentials, issuer.clone()),
            issuer,
            clock,
        }
    }

    fn creds(username: &str, password: &str) -> LoginCredentials {
        LoginCredentials::try_from_parts(username, password).expect("credentials")
    }

    #[rstest]
    #[tokio::test]
    async fn token_lifecycle(#[future] harness: Harness) {
        let harness = harness.await;
        let token = harness
            .service
            .login(&creds("bob", "pw"))
            .await
            .expect("login");
        let authenticator: &dyn SessionAuthenticator = harness.issuer.as_ref();
        assert_eq!(
            authenticator.authenticate(token.as_str()).expect("fresh").as_ref(),
            "bob"
        );

        harness.clock.set(token.issued_at() + Duration::hours(25));
        let err = authenticator
            .authenticate(token.as_str())
            .expect_err("expired");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), "session expired");
    }

    #[rstest]
    #[case("bob", "wrong")]
    #[case("nobody", "pw")]
    #[tokio::test]
    async fn failures_are_indistinguishable(
        #[future] harness: Harness,
        #[case] username: &str,
        #[case] password: &str,
    ) {
        let harness = harness.await;
        let err = harness
            .service
            .login(&creds(username, password))
            .await
            .expect_err("refused");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), INVALID_CREDENTIALS);
    }
}
