//! Web server adapter.
//!
//! JSON HTTP API over the shared [`Simulator`]. Successful responses are
//! `{"success": true, "message": ..., <fields>}`, failures are
//! `{"success": false, "error": ...}`. The simulator sits behind one mutex, so
//! market advances and ledger load-mutate-save cycles never interleave.

mod error;
mod handlers;

pub use error::{ApiError, status_from_error};
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::domain::simulator::Simulator;

pub struct AppState {
    pub simulator: Mutex<Simulator>,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(simulator: Simulator) -> Self {
        let static_dir = simulator.settings().static_dir.clone();
        Self {
            simulator: Mutex::new(simulator),
            static_dir,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Simulator>, ApiError> {
        self.simulator
            .lock()
            .map_err(|_| ApiError::internal("simulator state is unavailable"))
    }
}

pub fn build_router(state: AppState) -> Router {
    let static_service = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/prices", get(handlers::prices))
        .route("/api/next", post(handlers::next))
        .route("/api/addstock", post(handlers::add_stock))
        .route("/api/buy", post(handlers::buy))
        .route("/api/sell", post(handlers::sell))
        .route("/api/portfolio", get(handlers::portfolio))
        .route("/api/history", get(handlers::history))
        .route("/api/stats", get(handlers::stats))
        .route("/api/price_history/{symbol}", get(handlers::price_history))
        .route("/api/reset", post(handlers::reset))
        .nest_service("/static", static_service)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "web server listening");
    axum::serve(listener, build_router(state)).await
}
