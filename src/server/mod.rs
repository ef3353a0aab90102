//! [src/server/mod.rs]
//! APARATO: MATRIZ DE ENRUTAMIENTO HTTP
//! RESPONSABILIDAD: Compone el Router axum sobre el estado de sesion compartido.

mod handlers;

use crate::session::AppState;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the loopback query-service router: `/`, `/data`,
/// `/read`, `/search`, `/download`, `/load`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/", get(handlers::index))
        .route("/data", get(handlers::data))
        .route("/read", get(handlers::read))
        .route("/search", get(handlers::search))
        .route("/download", get(handlers::download))
        .route("/load", post(handlers::load))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
