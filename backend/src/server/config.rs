//! HTTP server configuration object.

use std::net::SocketAddr;
use std::sync::Arc;

use around::domain::SessionIssuer;
use around::domain::ports::DocumentStore;

/// Everything the server needs to build per-worker application state.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) issuer: Arc<SessionIssuer>,
}

impl ServerConfig {
    /// Bundle the listener address with the shared store and token issuer.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        store: Arc<dyn DocumentStore>,
        issuer: Arc<SessionIssuer>,
    ) -> Self {
        Self {
            bind_addr,
            store,
            issuer,
        }
    }
}
