use axum::Router;
use axum::routing::get;

use super::AppState;

pub(crate) mod app_error;
pub(crate) mod handlers;
pub(crate) mod middleware;
pub(crate) mod openapi;
pub(crate) mod routes;

pub(crate) fn routes(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health::health))
        .route("/healthz/db", get(handlers::health::database_health))
        .merge(routes::router(state.clone()))
        .with_state(state)
}
