//! Axum server setup and routing.

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use qbench_sched::ResourceKind;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api;
use crate::state::AppState;

/// Create the Axum router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(api::health::health))
        .route("/validate", post(api::validate::validate))
        // Encodings
        .route(
            "/encoding",
            get(api::encoding::list_encodings).post(api::encoding::create_encoding),
        )
        .route(
            "/encoding/{id}",
            get(api::encoding::get_encoding)
                .put(api::encoding::update_encoding)
                .delete(api::encoding::delete_encoding),
        )
        // Ansatz and dataset catalog
        .merge(catalog_routes(ResourceKind::Ansatz))
        .merge(catalog_routes(ResourceKind::Dataset))
        .route("/resources", post(api::resource::fetch_resources))
        // Benchmark runs
        .route("/run", get(api::run::list_runs).post(api::run::start_run))
        .route(
            "/run/{id}",
            get(api::run::get_run)
                .put(api::run::update_run)
                .delete(api::run::delete_run),
        )
        // Results
        .route("/result", get(api::result::list_results))
        .route(
            "/result/{run_id}",
            get(api::result::get_result)
                .put(api::result::update_result)
                .delete(api::result::delete_result),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// CRUD routes for one catalog kind, mounted at `/{kind}`.
fn catalog_routes(kind: ResourceKind) -> Router<Arc<AppState>> {
    let base = format!("/{}", kind.name());
    Router::new()
        .route(
            &base,
            get(api::catalog::list_entries).post(api::catalog::create_entry),
        )
        .route(
            &format!("{base}/{{id}}"),
            get(api::catalog::get_entry)
                .put(api::catalog::update_entry)
                .delete(api::catalog::delete_entry),
        )
        .layer(Extension(kind))
}
