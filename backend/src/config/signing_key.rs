//! Session signing key loading and validation.
//!
//! The key is read from the file named by `AROUND_SIGNING_KEY_FILE` (default
//! [`SIGNING_KEY_DEFAULT_PATH`]). When the file cannot be read, debug builds
//! and deployments that set `AROUND_ALLOW_EPHEMERAL_KEY` fall back to a
//! random per-process key; every token dies with the process in that case.

use std::path::PathBuf;

use mockable::Env;
use rand::RngCore;
use tracing::warn;
use zeroize::Zeroizing;

use crate::domain::{EmptySigningSecret, SigningSecret};

/// Key file consulted when no path is configured.
pub const SIGNING_KEY_DEFAULT_PATH: &str = "/var/run/secrets/around_signing_key";
/// Minimum key length accepted by release builds (HS256 wants 256 bits).
pub const SIGNING_KEY_MIN_LEN: usize = 32;
const EPHEMERAL_KEY_LEN: usize = 64;
const KEY_FILE_ENV: &str = "AROUND_SIGNING_KEY_FILE";
const ALLOW_EPHEMERAL_ENV: &str = "AROUND_ALLOW_EPHEMERAL_KEY";
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";

/// Build mode for signing key validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate missing keys and emit warnings.
    Debug,
    /// Release builds require a readable key of adequate length.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use around::config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// if cfg!(debug_assertions) {
    ///     assert_eq!(mode, BuildMode::Debug);
    /// } else {
    ///     assert_eq!(mode, BuildMode::Release);
    /// }
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Where the active signing key came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeySource {
    /// Read from the configured key file.
    File,
    /// Generated at startup; lost on restart.
    Ephemeral,
}

/// Signing secret plus its provenance.
#[derive(Debug)]
pub struct LoadedSigningKey {
    /// Key material.
    pub secret: SigningSecret,
    /// Whether the key came from disk.
    pub source: KeySource,
}

/// Errors raised while loading the signing key.
#[derive(thiserror::Error, Debug)]
pub enum SigningKeyError {
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Accepted forms.
        expected: &'static str,
    },
    /// Reading the key file failed and no fallback is allowed.
    #[error("failed to read signing key at {path}: {source}")]
    KeyRead {
        /// Key file path.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The key file is too short to sign with.
    #[error("signing key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        /// Key file path.
        path: PathBuf,
        /// Bytes found.
        length: usize,
        /// Bytes required.
        min_len: usize,
    },
    /// Generated key material was empty.
    #[error(transparent)]
    Secret(#[from] EmptySigningSecret),
}

/// Load the signing key according to environment and build mode.
///
/// # Examples
///
/// ```rust
/// use around::config::{BuildMode, KeySource, signing_key_from_env};
/// use mockable::MockEnv;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_path = std::env::temp_dir().join("around_signing_key_example");
/// std::fs::write(&key_path, vec![b'k'; 64])?;
///
/// let key_path = key_path.to_str().expect("valid path").to_string();
/// let mut env = MockEnv::new();
/// env.expect_string().returning(move |name| match name {
///     "AROUND_SIGNING_KEY_FILE" => Some(key_path.clone()),
///     _ => None,
/// });
///
/// let loaded = signing_key_from_env(&env, BuildMode::Release)?;
/// assert_eq!(loaded.source, KeySource::File);
/// # Ok(())
/// # }
/// ```
pub fn signing_key_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<LoadedSigningKey, SigningKeyError> {
    let allow_ephemeral = allow_ephemeral_from_env(env, mode)?;
    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| SIGNING_KEY_DEFAULT_PATH.to_owned()),
    );

    match std::fs::read(&path) {
        Ok(bytes) => {
            let bytes = Zeroizing::new(bytes);
            let length = bytes.len();
            let too_short = mode == BuildMode::Release && length < SIGNING_KEY_MIN_LEN;
            let secret = SigningSecret::new(bytes.as_slice()).ok().filter(|_| !too_short);
            secret
                .map(|secret| LoadedSigningKey {
                    secret,
                    source: KeySource::File,
                })
                .ok_or(SigningKeyError::KeyTooShort {
                    path,
                    length,
                    min_len: SIGNING_KEY_MIN_LEN,
                })
        }
        Err(error) if mode.is_debug() || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using ephemeral signing key; tokens will not survive a restart"
            );
            Ok(LoadedSigningKey {
                secret: ephemeral_secret()?,
                source: KeySource::Ephemeral,
            })
        }
        Err(error) => Err(SigningKeyError::KeyRead {
            path,
            source: error,
        }),
    }
}

fn ephemeral_secret() -> Result<SigningSecret, EmptySigningSecret> {
    let mut bytes = Zeroizing::new(vec![0_u8; EPHEMERAL_KEY_LEN]);
    rand::thread_rng().fill_bytes(bytes.as_mut_slice());
    SigningSecret::new(bytes.as_slice())
}

fn allow_ephemeral_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<bool, SigningKeyError> {
    let Some(value) = env.string(ALLOW_EPHEMERAL_ENV) else {
        return Ok(false);
    };
    match parse_bool(&value) {
        Some(flag) => Ok(flag),
        None if mode.is_debug() => {
            warn!(value = %value, "invalid {ALLOW_EPHEMERAL_ENV}; defaulting to disabled");
            Ok(false)
        }
        None => Err(SigningKeyError::InvalidEnv {
            name: ALLOW_EPHEMERAL_ENV,
            value,
            expected: BOOL_EXPECTED,
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for signing key loading.

    use super::*;
    use mockable::MockEnv;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn key_file(len: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&vec![b'k'; len]).expect("write key");
        file
    }

    fn mock_env(vars: HashMap<&'static str, String>) -> MockEnv {
        let mut env = MockEnv::new();
        env.expect_string()
            .times(0..)
            .returning(move |key| vars.get(key).cloned());
        env
    }

    fn with_key(file: &NamedTempFile) -> HashMap<&'static str, String> {
        HashMap::from([(
            KEY_FILE_ENV,
            file.path().to_string_lossy().into_owned(),
        )])
    }

    fn missing_key() -> HashMap<&'static str, String> {
        HashMap::from([(KEY_FILE_ENV, "/nonexistent/around/key".to_owned())])
    }

    #[rstest]
    #[case(BuildMode::Debug)]
    #[case(BuildMode::Release)]
    fn key_file_is_used_when_readable(#[case] mode: BuildMode) {
        let file = key_file(SIGNING_KEY_MIN_LEN);
        let loaded = signing_key_from_env(&mock_env(with_key(&file)), mode).expect("key");
        assert_eq!(loaded.source, KeySource::File);
        assert_eq!(
            loaded.secret.fingerprint(),
            SigningSecret::new(vec![b'k'; SIGNING_KEY_MIN_LEN])
                .expect("secret")
                .fingerprint()
        );
    }

    #[rstest]
    fn release_rejects_short_keys() {
        let file = key_file(SIGNING_KEY_MIN_LEN - 1);
        let err = signing_key_from_env(&mock_env(with_key(&file)), BuildMode::Release)
            .expect_err("short key");
        assert!(matches!(
            err,
            SigningKeyError::KeyTooShort { length, .. } if length == SIGNING_KEY_MIN_LEN - 1
        ));
    }

    #[rstest]
    fn debug_accepts_short_keys_but_not_empty_ones() {
        let short = key_file(4);
        let loaded =
            signing_key_from_env(&mock_env(with_key(&short)), BuildMode::Debug).expect("short");
        assert_eq!(loaded.source, KeySource::File);

        let empty = key_file(0);
        let err = signing_key_from_env(&mock_env(with_key(&empty)), BuildMode::Debug)
            .expect_err("empty key");
        assert!(matches!(err, SigningKeyError::KeyTooShort { length: 0, .. }));
    }

    #[rstest]
    fn release_without_key_file_fails() {
        let err = signing_key_from_env(&mock_env(missing_key()), BuildMode::Release)
            .expect_err("missing key");
        assert!(matches!(err, SigningKeyError::KeyRead { .. }));
    }

    #[rstest]
    fn debug_without_key_file_is_ephemeral() {
        let first = signing_key_from_env(&mock_env(missing_key()), BuildMode::Debug)
            .expect("ephemeral");
        let second = signing_key_from_env(&mock_env(missing_key()), BuildMode::Debug)
            .expect("ephemeral");
        assert_eq!(first.source, KeySource::Ephemeral);
        assert_ne!(first.secret.fingerprint(), second.secret.fingerprint());
    }

    #[rstest]
    #[case("1")]
    #[case("true")]
    #[case("YES")]
    fn release_can_opt_into_ephemeral_keys(#[case] flag: &str) {
        let mut vars = missing_key();
        vars.insert(ALLOW_EPHEMERAL_ENV, flag.to_owned());
        let loaded = signing_key_from_env(&mock_env(vars), BuildMode::Release).expect("opt in");
        assert_eq!(loaded.source, KeySource::Ephemeral);
    }

    #[rstest]
    fn release_rejects_malformed_ephemeral_flag() {
        let mut vars = missing_key();
        vars.insert(ALLOW_EPHEMERAL_ENV, "maybe".to_owned());
        let err = signing_key_from_env(&mock_env(vars), BuildMode::Release)
            .expect_err("bad flag");
        assert!(matches!(
            err,
            SigningKeyError::InvalidEnv {
                name: ALLOW_EPHEMERAL_ENV,
                ..
            }
        ));
    }
}
