//! Service settings loaded via OrthoConfig.
//!
//! Every field may come from the command line, an `AROUND_*` environment
//! variable, or a configuration file. Every field carries a default, so the
//! service starts with no configuration at all.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";
const DEFAULT_INDEX_NAME: &str = "around";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SEARCH_PAGE_SIZE: usize = 100;
const DEFAULT_STORE_BACKEND: &str = "elasticsearch";
/// Elasticsearch's default `index.max_result_window`.
const MAX_SEARCH_PAGE_SIZE: usize = 10_000;

/// Raised when a configured value cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {field}='{value}'; expected {expected}")]
pub struct SettingsError {
    field: &'static str,
    value: String,
    expected: &'static str,
}

impl SettingsError {
    fn new(field: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        Self {
            field,
            value: value.into(),
            expected,
        }
    }

    /// Name of the offending setting.
    pub fn field(&self) -> &'static str {
        self.field
    }
}

/// Which document store adapter backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Remote Elasticsearch cluster.
    #[default]
    Elasticsearch,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = SettingsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "elasticsearch" | "es" => Ok(Self::Elasticsearch),
            "memory" | "in-memory" => Ok(Self::Memory),
            _ => Err(SettingsError::new(
                "store_backend",
                raw,
                "elasticsearch|memory",
            )),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Elasticsearch => "elasticsearch",
            Self::Memory => "memory",
        })
    }
}

/// Runtime settings for the Around service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AROUND")]
pub struct AroundSettings {
    /// Socket address the HTTP server binds to.
    #[ortho_config(default = String::from(DEFAULT_BIND_ADDR))]
    pub bind_addr: String,
    /// Base URL of the Elasticsearch cluster.
    #[ortho_config(default = String::from(DEFAULT_ELASTICSEARCH_URL))]
    pub elasticsearch_url: String,
    /// Index holding every collection.
    #[ortho_config(default = String::from(DEFAULT_INDEX_NAME))]
    pub index_name: String,
    /// Deadline applied to each document store operation, in milliseconds.
    #[ortho_config(default = DEFAULT_STORE_TIMEOUT_MS)]
    pub store_timeout_ms: u64,
    /// Number of hits fetched per search request while draining a query.
    #[ortho_config(default = DEFAULT_SEARCH_PAGE_SIZE)]
    pub search_page_size: usize,
    /// `elasticsearch` or `memory`.
    #[ortho_config(default = String::from(DEFAULT_STORE_BACKEND))]
    pub store_backend: String,
}

impl Default for AroundSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            elasticsearch_url: DEFAULT_ELASTICSEARCH_URL.to_owned(),
            index_name: DEFAULT_INDEX_NAME.to_owned(),
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
            store_backend: DEFAULT_STORE_BACKEND.to_owned(),
        }
    }
}

impl AroundSettings {
    /// Parsed bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .parse()
            .map_err(|_| SettingsError::new("bind_addr", &self.bind_addr, "host:port"))
    }

    /// Elasticsearch base URL; only `http` and `https` are accepted.
    pub fn elasticsearch_url(&self) -> Result<Url, SettingsError> {
        let raw = self.elasticsearch_url.as_str();
        let invalid = || SettingsError::new("elasticsearch_url", raw, "an http(s) URL");
        let url = Url::parse(raw).map_err(|_| invalid())?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(invalid()),
        }
    }

    /// Index name, checked against Elasticsearch's naming rules.
    pub fn index_name(&self) -> Result<&str, SettingsError> {
        let name = self.index_name.as_str();
        let valid = !name.is_empty()
            && !name.starts_with(['-', '_', '+'])
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-_.".contains(c));
        if valid {
            Ok(name)
        } else {
            Err(SettingsError::new(
                "index_name",
                name,
                "a lowercase Elasticsearch index name",
            ))
        }
    }

    /// Per-operation store deadline; never shorter than one millisecond.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms.max(1))
    }

    /// Search page size clamped to `1..=10000`.
    pub fn search_page_size(&self) -> usize {
        self.search_page_size.clamp(1, MAX_SEARCH_PAGE_SIZE)
    }

    /// Selected store backend.
    pub fn store_backend(&self) -> Result<StoreBackend, SettingsError> {
        self.store_backend.parse()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 6] = [
        "AROUND_BIND_ADDR",
        "AROUND_ELASTICSEARCH_URL",
        "AROUND_INDEX_NAME",
        "AROUND_STORE_TIMEOUT_MS",
        "AROUND_SEARCH_PAGE_SIZE",
        "AROUND_STORE_BACKEND",
    ];

    fn load_from_empty_args() -> AroundSettings {
        AroundSettings::load_from_iter([OsString::from("around")]).expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default bind"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(
            settings.elasticsearch_url().expect("default url").as_str(),
            "http://localhost:9200/"
        );
        assert_eq!(settings.index_name().expect("default index"), "around");
        assert_eq!(settings.store_timeout(), Duration::from_secs(5));
        assert_eq!(settings.search_page_size(), 100);
        assert_eq!(
            settings.store_backend().expect("default backend"),
            StoreBackend::Elasticsearch
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("AROUND_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            (
                "AROUND_ELASTICSEARCH_URL",
                Some("https://search.internal:9243".to_owned()),
            ),
            ("AROUND_INDEX_NAME", Some("around-test".to_owned())),
            ("AROUND_STORE_TIMEOUT_MS", Some("250".to_owned())),
            ("AROUND_SEARCH_PAGE_SIZE", Some("20".to_owned())),
            ("AROUND_STORE_BACKEND", Some("memory".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("bind"),
            "127.0.0.1:9000".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(
            settings.elasticsearch_url().expect("url").host_str(),
            Some("search.internal")
        );
        assert_eq!(settings.index_name().expect("index"), "around-test");
        assert_eq!(settings.store_timeout(), Duration::from_millis(250));
        assert_eq!(settings.search_page_size(), 20);
        assert_eq!(
            settings.store_backend().expect("backend"),
            StoreBackend::Memory
        );
    }

    #[rstest]
    fn loads_from_an_empty_environment() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = AroundSettings::load_from_iter([OsString::from("around")])
            .expect("settings should load without any configuration");
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(settings.store_backend, DEFAULT_STORE_BACKEND);
        assert_eq!(settings.store_timeout_ms, DEFAULT_STORE_TIMEOUT_MS);
        assert_eq!(settings.search_page_size, DEFAULT_SEARCH_PAGE_SIZE);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(50_000, 10_000)]
    #[case(100, 100)]
    fn page_size_is_clamped(#[case] configured: usize, #[case] expected: usize) {
        let settings = AroundSettings {
            search_page_size: configured,
            ..AroundSettings::default()
        };
        assert_eq!(settings.search_page_size(), expected);
    }

    #[rstest]
    #[case("Around")]
    #[case("")]
    #[case("_hidden")]
    #[case("with space")]
    fn invalid_index_names_are_rejected(#[case] name: &str) {
        let settings = AroundSettings {
            index_name: name.to_owned(),
            ..AroundSettings::default()
        };
        assert_eq!(
            settings.index_name().map_err(|err| err.field()),
            Err("index_name")
        );
    }

    #[rstest]
    #[case("postgres")]
    #[case("")]
    fn unknown_backends_are_rejected(#[case] raw: &str) {
        let settings = AroundSettings {
            store_backend: raw.to_owned(),
            ..AroundSettings::default()
        };
        assert!(settings.store_backend().is_err());
    }

    #[rstest]
    #[case("ftp://search:21")]
    #[case("not a url")]
    fn non_http_store_urls_are_rejected(#[case] raw: &str) {
        let settings = AroundSettings {
            elasticsearch_url: raw.to_owned(),
            ..AroundSettings::default()
        };
        assert!(settings.elasticsearch_url().is_err());
    }
}
