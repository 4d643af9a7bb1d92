//! User data model.
//!
//! A user is identified by its username, which doubles as the document key in
//! the `users` collection. Passwords are kept exactly as supplied.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

/// Validation errors returned by [`Username::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Username was empty once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
}

/// Unique user handle.
///
/// ## Invariants
/// - Surrounding whitespace is removed; the remainder is non-empty.
///
/// # Examples
/// ```
/// use around::domain::Username;
///
/// let name = Username::new("  dave ").expect("valid username");
/// assert_eq!(name.as_ref(), "dave");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "dave")]
pub struct Username(String);

impl Username {
    /// Validate and construct a username.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Registered account.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    username: Username,
    password: Zeroizing<String>,
}

impl User {
    /// Build a user from a validated username and the password as given.
    pub fn new(username: Username, password: impl Into<String>) -> Self {
        Self {
            username,
            password: Zeroizing::new(password.into()),
        }
    }

    /// Username (and store key) of the account.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Stored password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Whether `candidate` matches the stored password exactly.
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password.as_str() == candidate
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn blank_usernames_are_rejected(#[case] raw: &str) {
        assert_eq!(
            Username::new(raw).expect_err("blank"),
            UserValidationError::EmptyUsername
        );
    }

    #[test]
    fn username_deserialisation_trims() {
        let name: Username = serde_json::from_str(r#"" alice ""#).expect("valid");
        assert_eq!(name.as_ref(), "alice");
    }

    #[test]
    fn debug_output_redacts_password() {
        let user = User::new(Username::new("alice").expect("valid"), "hunter2");
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(user.password_matches("hunter2"));
        assert!(!user.password_matches("hunter2 "));
    }
}
