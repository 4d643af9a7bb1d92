//! Startup configuration: service settings and the session signing key.

mod settings;
mod signing_key;

pub use settings::{AroundSettings, SettingsError, StoreBackend};
pub use signing_key::{
    BuildMode, KeySource, LoadedSigningKey, SIGNING_KEY_DEFAULT_PATH, SIGNING_KEY_MIN_LEN,
    SigningKeyError, signing_key_from_env,
};
