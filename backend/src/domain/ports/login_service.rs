//! Driving ports for login and token authentication.
//!
//! In hexagonal terms these are *driving* ports: inbound adapters call them to
//! exchange credentials for a session token, or a token for a username,
//! without knowing the backing infrastructure. HTTP handler tests substitute
//! doubles instead of wiring a store.

use async_trait::async_trait;

use crate::domain::{Error, LoginCredentials, SessionToken, Username};

/// Exchange verified credentials for a session token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Verify `credentials` and mint a token.
    ///
    /// Every verification failure yields the same `unauthorized` error, so a
    /// caller cannot tell an unknown username from a wrong password.
    async fn login(&self, credentials: &LoginCredentials) -> Result<SessionToken, Error>;
}

/// Resolve a presented bearer token to the user it was issued to.
#[cfg_attr(test, mockall::automock)]
pub trait SessionAuthenticator: Send + Sync {
    /// Return the token subject, or an `unauthorized` error.
    fn authenticate(&self, token: &str) -> Result<Username, Error>;
}
