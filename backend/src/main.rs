//! Service entry-point: loads settings and the signing key, declares the
//! document collections, then serves the REST API.

mod server;

use std::sync::Arc;

use actix_web::web;
use mockable::{DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use around::config::{AroundSettings, BuildMode, StoreBackend, signing_key_from_env};
use around::domain::SessionIssuer;
use around::domain::ports::DocumentStore;
use around::inbound::http::health::HealthState;
use around::outbound::deadline::DeadlineDocumentStore;
use around::outbound::elasticsearch::ElasticsearchDocumentStore;
use around::outbound::memory::InMemoryDocumentStore;

use server::{ServerConfig, create_server, declare_collections};

fn build_store(settings: &AroundSettings) -> std::io::Result<Arc<dyn DocumentStore>> {
    let backend = settings.store_backend().map_err(std::io::Error::other)?;
    let inner: Arc<dyn DocumentStore> = match backend {
        StoreBackend::Memory => {
            warn!("using in-memory document store; data is lost on restart");
            Arc::new(InMemoryDocumentStore::new())
        }
        StoreBackend::Elasticsearch => {
            let url = settings.elasticsearch_url().map_err(std::io::Error::other)?;
            let index = settings.index_name().map_err(std::io::Error::other)?;
            info!(%url, index, "using elasticsearch document store");
            Arc::new(
                ElasticsearchDocumentStore::new(
                    url,
                    index,
                    settings.store_timeout(),
                    settings.search_page_size(),
                )
                .map_err(std::io::Error::other)?,
            )
        }
    };
    Ok(Arc::new(DeadlineDocumentStore::new(
        inner,
        settings.store_timeout(),
    )))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AroundSettings::load_from_iter(std::env::args_os())
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;

    let key = signing_key_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;
    info!(
        fingerprint = %key.secret.fingerprint(),
        source = ?key.source,
        "signing key loaded"
    );
    let issuer = Arc::new(SessionIssuer::new(&key.secret, Arc::new(DefaultClock)));

    let store = build_store(&settings)?;
    declare_collections(store.clone())
        .await
        .map_err(std::io::Error::other)?;

    let health_state = web::Data::new(HealthState::with_store(store.clone()));
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(bind_addr, store, issuer),
    )?;
    let result = server.await;
    health_state.mark_unhealthy();
    result
}
