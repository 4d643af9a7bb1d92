//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    DocumentStore, LoginService, PostCommand, PostQuery, SessionAuthenticator, UserRegistration,
};
use crate::domain::{AccountLoginService, CredentialManager, GeoContentStore, SessionIssuer};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Account creation.
    pub registration: Arc<dyn UserRegistration>,
    /// Credential exchange.
    pub login: Arc<dyn LoginService>,
    /// Bearer token verification.
    pub sessions: Arc<dyn SessionAuthenticator>,
    /// Post publishing.
    pub posts: Arc<dyn PostCommand>,
    /// Proximity search.
    pub search: Arc<dyn PostQuery>,
}

impl HttpState {
    /// Wire the domain services over one document store and token issuer.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use around::domain::{SessionIssuer, SigningSecret};
    /// use around::inbound::http::state::HttpState;
    /// use around::outbound::memory::InMemoryDocumentStore;
    /// use mockable::DefaultClock;
    ///
    /// let secret = SigningSecret::new(vec![1_u8; 32]).unwrap();
    /// let issuer = Arc::new(SessionIssuer::new(&secret, Arc::new(DefaultClock)));
    /// let state = HttpState::from_services(Arc::new(InMemoryDocumentStore::new()), issuer);
    /// # let _ = state;
    /// ```
    pub fn from_services(store: Arc<dyn DocumentStore>, issuer: Arc<SessionIssuer>) -> Self {
        let credentials = CredentialManager::new(store.clone());
        let content = Arc::new(GeoContentStore::new(store));
        Self {
            registration: Arc::new(credentials.clone()),
            login: Arc::new(AccountLoginService::new(credentials, issuer.clone())),
            sessions: issuer,
            posts: content.clone(),
            search: content,
        }
    }
}
