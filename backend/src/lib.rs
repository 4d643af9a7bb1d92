//! Around: geotagged short messages with proximity search.
//!
//! The crate follows a hexagonal layout. [`domain`] holds the credential
//! manager, the session issuer and the geo content store, all written
//! against the [`domain::ports::DocumentStore`] port. [`outbound`] provides
//! the Elasticsearch and in-memory stores, [`inbound::http`] the REST
//! surface, and [`config`] the settings and signing key loaders.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(test)]
mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use inbound::http::health::HealthState;
