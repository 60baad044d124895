//! Web dashboard adapter.
//!
//! Axum server with an HTMX tab frontend: market data, the live forecast
//! and the lag/rolling-correlation analysis. Every request recomputes from
//! the cached tables; there is no background state.

mod chart_svg;
mod error;
mod handlers;
mod templates;

pub use error::WebError;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::ports::config_port::ConfigPort;

pub struct AppState {
    pub config: Arc<dyn ConfigPort + Send + Sync>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/market", get(handlers::market_tab))
        .route("/forecast", get(handlers::forecast_tab))
        .route("/analysis", get(handlers::analysis_tab))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
}

fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("HX-Request").is_some()
}
