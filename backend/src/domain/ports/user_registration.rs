//! Driving port for account creation.

use async_trait::async_trait;

use crate::domain::{Error, Username};

/// Create accounts from raw signup input.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRegistration: Send + Sync {
    /// Register `username` with `password`, returning the normalised username.
    ///
    /// Blank input maps to `invalid_request`, a taken username to `conflict`.
    async fn register(&self, username: &str, password: &str) -> Result<Username, Error>;
}
