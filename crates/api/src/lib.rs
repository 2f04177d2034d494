//! HTTP API server with observability for the shop backend.
//!
//! Provides REST endpoints for users, the product catalog, carts, and
//! orders, with the checkout workflow behind the cart purchase endpoint.
//! Structured logging (tracing) and Prometheus metrics throughout.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use checkout::{CheckoutOrchestrator, OrderFactory, SnapshotBuilder, StockLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub orchestrator: CheckoutOrchestrator<S, S, S>,
    pub factory: OrderFactory<S, S>,
    pub snapshots: SnapshotBuilder<S, S>,
}

/// Creates the default application state over one backing store.
pub fn create_default_state<S: Store>(store: S) -> Arc<AppState<S>> {
    let orchestrator = CheckoutOrchestrator::new(store.clone(), store.clone(), store.clone());
    let factory = OrderFactory::new(store.clone(), StockLedger::new(store.clone()));
    let snapshots = SnapshotBuilder::new(store.clone(), store.clone());
    Arc::new(AppState {
        store,
        orchestrator,
        factory,
        snapshots,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users", get(routes::users::list::<S>))
        .route("/users", post(routes::users::create::<S>))
        .route("/users/{id}", get(routes::users::get::<S>))
        .route("/users/{id}", put(routes::users::update::<S>))
        .route("/users/{id}", delete(routes::users::remove::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}", put(routes::products::update::<S>))
        .route("/products/{id}", delete(routes::products::remove::<S>))
        .route("/carts", get(routes::carts::list::<S>))
        .route("/carts/purchase", post(routes::carts::purchase::<S>))
        .route("/carts/user/{user_id}", get(routes::carts::for_user::<S>))
        .route("/carts/{cart_id}", get(routes::carts::get::<S>))
        .route(
            "/carts/{cart_id}/{product_id}",
            post(routes::carts::add_item::<S>),
        )
        .route(
            "/carts/{cart_id}/{product_id}",
            delete(routes::carts::remove_item::<S>),
        )
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/user/{user_id}", get(routes::orders::for_user::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/total", get(routes::orders::total::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
