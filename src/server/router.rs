use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use tower::ServiceBuilder;

use super::completion::completion_router;
use crate::progress::ProgressEngine;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub engine: Arc<ProgressEngine>,
}

impl AppState {
    /// Builds the state with the engine wired to the same store.
    pub fn new<S: Store + 'static>(store: Arc<S>) -> Self {
        let engine = Arc::new(ProgressEngine::from_store(store.clone()));
        Self { store, engine }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", completion_router())
        .layer(ServiceBuilder::new().layer(middleware::from_fn(log_request)))
        .with_state(state)
}
