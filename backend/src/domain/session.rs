//! Stateless session tokens.
//!
//! A [`SessionIssuer`] turns a verified username into an HS256-signed token
//! valid for [`SESSION_TTL_HOURS`] and later authenticates presented tokens.
//! Nothing is persisted: a token is valid while its signature checks out
//! against the process secret and the injected clock is before its expiry.
//! Rotating the secret invalidates every outstanding token.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::Username;

/// Lifetime of every issued token.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Length of the secret fingerprint in bytes before hex encoding.
const FINGERPRINT_BYTES: usize = 8;

/// Signing secret shared by issuance and verification.
///
/// Constructed once at startup and injected; never global.
#[derive(Clone)]
pub struct SigningSecret(Zeroizing<Vec<u8>>);

/// Raised when a secret is constructed from no key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("signing secret must not be empty")]
pub struct EmptySigningSecret;

impl SigningSecret {
    /// Wrap raw key material.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, EmptySigningSecret> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.is_empty() {
            return Err(EmptySigningSecret);
        }
        Ok(Self(bytes))
    }

    /// Truncated SHA-256 fingerprint for logs; reveals nothing usable about
    /// the key.
    ///
    /// # Examples
    /// ```
    /// use around::domain::SigningSecret;
    ///
    /// let secret = SigningSecret::new(vec![b'k'; 64]).unwrap();
    /// let fp = secret.fingerprint();
    /// assert_eq!(fp.len(), 16);
    /// assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    /// ```
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_slice());
        hex::encode(digest.get(..FINGERPRINT_BYTES).unwrap_or_default())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningSecret")
            .field(&self.fingerprint())
            .finish()
    }
}

/// Reasons a presented token is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Signature, structure, or claims did not verify.
    #[error("invalid session token")]
    InvalidToken,
    /// Signature verified but the expiry instant has passed.
    #[error("session expired")]
    Expired,
}

/// Raised when a token cannot be signed.
#[derive(Debug, thiserror::Error)]
#[error("failed to sign session token: {0}")]
pub struct SessionIssueError(#[from] jsonwebtoken::errors::Error);

/// A freshly minted session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    token: String,
    subject: Username,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Encoded, signed token string.
    pub fn as_str(&self) -> &str {
        self.token.as_str()
    }

    /// User the token was issued to.
    pub fn subject(&self) -> &Username {
        &self.subject
    }

    /// Issue instant (second precision).
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// First instant at which the token is no longer accepted.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and authenticates session tokens.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use around::domain::{SessionIssuer, SigningSecret, Username};
/// use mockable::DefaultClock;
///
/// let secret = SigningSecret::new(vec![7_u8; 64]).unwrap();
/// let issuer = SessionIssuer::new(&secret, Arc::new(DefaultClock));
/// let bob = Username::new("bob").unwrap();
/// let token = issuer.issue(&bob).unwrap();
/// assert_eq!(issuer.authenticate(token.as_str()), Ok(bob));
/// ```
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl SessionIssuer {
    /// Build an issuer bound to `secret`, reading time from `clock`.
    pub fn new(secret: &SigningSecret, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock after the signature.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        }
    }

    /// Mint a token for `username`, expiring [`SESSION_TTL_HOURS`] from now.
    ///
    /// Callers must only invoke this after the credentials were verified.
    pub fn issue(&self, username: &Username) -> Result<SessionToken, SessionIssueError> {
        let now = self.clock.utc();
        let issued_at = Utc
            .timestamp_opt(now.timestamp(), 0)
            .single()
            .unwrap_or(now);
        let expires_at = issued_at + Duration::hours(SESSION_TTL_HOURS);
        let claims = SessionClaims {
            sub: username.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(SessionToken {
            token,
            subject: username.clone(),
            issued_at,
            expires_at,
        })
    }

    /// Verify `token` and return the embedded subject.
    ///
    /// The signature is checked first (HMAC comparison is constant time);
    /// only a correctly signed token can report [`SessionError::Expired`].
    pub fn authenticate(&self, token: &str) -> Result<Username, SessionError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| SessionError::InvalidToken)?;
        let claims = data.claims;
        if self.clock.utc().timestamp() >= claims.exp {
            return Err(SessionError::Expired);
        }
        Username::new(claims.sub).map_err(|_| SessionError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::test_support::MutableClock;
    use rstest::{fixture, rstest};

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        Arc::new(MutableClock::at("2026-10-18T12:00:00Z"))
    }

    fn issuer_with(secret: &[u8], clock: Arc<MutableClock>) -> SessionIssuer {
        SessionIssuer::new(&SigningSecret::new(secret).expect("secret"), clock)
    }

    fn bob() -> Username {
        Username::new("bob").expect("username")
    }

    #[rstest]
    fn issued_token_authenticates_immediately(clock: Arc<MutableClock>) {
        let issuer = issuer_with(b"process-secret", clock);
        let token = issuer.issue(&bob()).expect("issue");
        assert_eq!(issuer.authenticate(token.as_str()), Ok(bob()));
        assert_eq!(token.subject(), &bob());
        assert_eq!(
            token.expires_at() - token.issued_at(),
            Duration::hours(SESSION_TTL_HOURS)
        );
    }

    #[rstest]
    fn token_is_refused_from_the_expiry_instant(clock: Arc<MutableClock>) {
        let issuer = issuer_with(b"process-secret", clock.clone());
        let token = issuer.issue(&bob()).expect("issue");

        clock.set(token.expires_at() - Duration::seconds(1));
        assert_eq!(issuer.authenticate(token.as_str()), Ok(bob()));

        clock.set(token.expires_at());
        assert_eq!(
            issuer.authenticate(token.as_str()),
            Err(SessionError::Expired)
        );
    }

    #[rstest]
    fn tampered_signature_is_invalid(clock: Arc<MutableClock>) {
        let issuer = issuer_with(b"process-secret", clock);
        let token = issuer.issue(&bob()).expect("issue");
        let (head, signature) = token.as_str().rsplit_once('.').expect("three segments");
        let flipped = if signature.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{head}.{flipped}{}", signature.get(1..).unwrap_or_default());
        assert_eq!(
            issuer.authenticate(&tampered),
            Err(SessionError::InvalidToken)
        );
    }

    #[rstest]
    fn expired_token_signed_with_other_secret_is_invalid_not_expired(clock: Arc<MutableClock>) {
        let other = issuer_with(b"rotated-away", clock.clone());
        let token = other.issue(&bob()).expect("issue");
        clock.set(token.expires_at() + Duration::hours(1));

        let issuer = issuer_with(b"process-secret", clock);
        assert_eq!(
            issuer.authenticate(token.as_str()),
            Err(SessionError::InvalidToken)
        );
    }

    #[rstest]
    #[case("")]
    #[case("not-a-token")]
    #[case("a.b.c")]
    fn garbage_is_invalid(clock: Arc<MutableClock>, #[case] token: &str) {
        let issuer = issuer_with(b"process-secret", clock);
        assert_eq!(issuer.authenticate(token), Err(SessionError::InvalidToken));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(
            SigningSecret::new(Vec::new()).map(|_| ()),
            Err(EmptySigningSecret)
        );
    }

    #[test]
    fn fingerprint_is_deterministic_and_key_specific() {
        let a = SigningSecret::new(vec![b'a'; 64]).expect("secret");
        let b = SigningSecret::new(vec![b'b'; 64]).expect("secret");
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert!(!format!("{a:?}").contains("aaaa"));
    }
}
