use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;

use crate::auth::{resolve_caller, RequestSession};
use crate::state::AppState;

/// GraphQL endpoint handler
async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<async_graphql::Request>,
) -> Response {
    // A rejected bearer token fails the request before any resolver runs
    let session = match resolve_caller(&state.services, &headers).await {
        Ok(Some(user)) => RequestSession::signed_in(user),
        Ok(None) => RequestSession::anonymous(),
        Err(e) => return e.into_response(),
    };

    let response = state.graphql_schema.execute(req.data(session)).await;

    let mut http = Json(&response).into_response();
    for (name, value) in response.http_headers.iter() {
        http.headers_mut().append(name, value.clone());
    }
    http
}

/// GraphQL Playground UI (development tool)
async fn graphql_playground() -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new("/api")))
}

/// GraphQL router
pub fn router() -> Router<AppState> {
    Router::new().route("/api", get(graphql_playground).post(graphql_handler))
}
