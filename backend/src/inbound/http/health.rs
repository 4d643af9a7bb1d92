//! Liveness and readiness probes.
//!
//! Readiness requires both collections to be declared and the document store
//! to answer a ping. The store is asked on every readiness probe, so an
//! outage after startup takes the instance out of rotation until the store
//! recovers. Liveness only drops once shutdown begins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::domain::ports::DocumentStore;

/// Outcome reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Collections declared and the store answers.
    Ready,
    /// Collections not yet declared or the listener not yet bound.
    Starting,
    /// The document store did not answer the readiness ping.
    StoreUnavailable,
    /// Process is serving.
    Alive,
    /// Shutdown has begun.
    ShuttingDown,
}

impl ProbeStatus {
    fn is_healthy(self) -> bool {
        matches!(self, Self::Ready | Self::Alive)
    }
}

/// Body of every probe response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProbeReport {
    /// Probe outcome.
    pub status: ProbeStatus,
}

/// Startup and shutdown flags plus the store the readiness probe pings.
pub struct HealthState {
    started: AtomicBool,
    live: AtomicBool,
    store: Option<Arc<dyn DocumentStore>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            started: AtomicBool::new(false),
            live: AtomicBool::new(true),
            store: None,
        }
    }
}

impl HealthState {
    /// Starting and live, with no store to ping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting and live; readiness also requires `store` to answer.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Record that the collections are declared and the listener is bound.
    pub fn mark_ready(&self) {
        self.started.store(true, Ordering::Release);
    }

    /// Fail liveness probes so orchestrators stop routing during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Startup flag alone, without asking the store.
    pub fn is_ready(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Liveness flag.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Current readiness, pinging the store once startup has finished.
    pub async fn readiness(&self) -> ProbeStatus {
        if !self.is_ready() {
            return ProbeStatus::Starting;
        }
        let Some(store) = &self.store else {
            return ProbeStatus::Ready;
        };
        match store.ping().await {
            Ok(()) => ProbeStatus::Ready,
            Err(error) => {
                warn!(error = %error, "readiness ping to the document store failed");
                ProbeStatus::StoreUnavailable
            }
        }
    }

    /// Current liveness.
    pub fn liveness(&self) -> ProbeStatus {
        if self.is_alive() {
            ProbeStatus::Alive
        } else {
            ProbeStatus::ShuttingDown
        }
    }
}

fn report(status: ProbeStatus) -> HttpResponse {
    let mut response = if status.is_healthy() {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(ProbeReport { status })
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Collections declared and store reachable", body = ProbeReport),
        (status = 503, description = "Starting, or the store is unreachable", body = ProbeReport)
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    report(state.readiness().await)
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Process is alive", body = ProbeReport),
        (status = 503, description = "Shutting down", body = ProbeReport)
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    report(state.liveness())
}
