//! Redeem server library.
//!
//! This library exposes the server components for use in integration tests.

pub mod routes;
pub mod state;

pub use state::{AppState, ServerConfig, TlsPaths};

// Re-export redeem_core for convenience
pub use redeem_core;

use axum::{Router, routing::post};
use redeem_core::crypto::MAX_WEBHOOK_SIZE;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Builds the application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(routes::webhook::handle_webhook))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_WEBHOOK_SIZE)),
        )
        .with_state(state)
}

// Test utilities are available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
