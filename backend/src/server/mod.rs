//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;

#[cfg(debug_assertions)]
use around::ApiDoc;
use around::domain::ports::{DocumentStore, DocumentStoreError};
use around::domain::{CredentialManager, GeoContentStore};
use around::inbound::http::health::{HealthState, live, ready};
use around::inbound::http::state::HttpState;
use around::inbound::http::{configure, cors};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

/// Declare the `users` and `posts` collections.
///
/// # Errors
/// Propagates the first store failure.
pub async fn declare_collections(
    store: Arc<dyn DocumentStore>,
) -> Result<(), DocumentStoreError> {
    CredentialManager::new(store.clone()).ensure_schema().await?;
    GeoContentStore::new(store).ensure_schema().await?;
    info!("document collections declared");
    Ok(())
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .service(ready)
        .service(live)
        .configure(configure);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server over the configured store and issuer.
///
/// Readiness flips once the listener is bound, so callers declare the
/// collections first.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        bind_addr,
        store,
        issuer,
    } = config;
    let http_state = web::Data::new(HttpState::from_services(store, issuer));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone()).wrap(cors())
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "listening");
    health_state.mark_ready();
    Ok(server)
}
