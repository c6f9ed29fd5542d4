// Library exports for Postwall
// This allows integration tests and external code to use Postwall modules

pub mod accounts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod mailer;
pub mod posts;
pub mod routes;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Credentialed CORS for the browser client. An unparsable origin allows
/// no cross-origin callers.
pub fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .client_uri
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.services.config.server);

    Router::new()
        .merge(routes::graphql::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
