// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! HTTP service over the waveform index and event files.

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::Semaphore;
use wavescope_api::{ROUTE_ALL_JSON, ROUTE_HEALTH, ROUTE_JSON, ROUTE_META, ROUTE_PNG};
use wavescope_core::WaveformConfig;
use wavescope_query::IndexPool;
use wavescope_store::EventSource;

pub mod aggregate;
mod config;
mod http;
mod middleware;
pub mod render;

pub use config::ServerConfig;

pub const CRATE_NAME: &str = "wavescope-server";

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<WaveformConfig>,
    pub server: Arc<ServerConfig>,
    pub pool: Arc<IndexPool>,
    pub source: Arc<dyn EventSource>,
    pub heavy_workers: Arc<Semaphore>,
    pub request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(
        cfg: WaveformConfig,
        server: ServerConfig,
        pool: IndexPool,
        source: Arc<dyn EventSource>,
    ) -> Self {
        let heavy_workers = Arc::new(Semaphore::new(server.heavy_workers.max(1)));
        Self {
            cfg: Arc::new(cfg),
            server: Arc::new(server),
            pool: Arc::new(pool),
            source,
            heavy_workers,
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(ROUTE_PNG, get(http::handlers::waveforms_png_handler))
        .route(ROUTE_JSON, get(http::handlers::waveforms_json_handler))
        .route(ROUTE_ALL_JSON, get(http::handlers::waveforms_all_json_handler))
        .route(ROUTE_META, get(http::handlers::waveforms_meta_handler))
        .route(ROUTE_HEALTH, get(http::handlers::healthz_handler))
        .layer(from_fn(middleware::no_store::no_store_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .with_state(state)
}
