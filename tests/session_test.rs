mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use common::TestApp;

struct ApiResponse {
    status: StatusCode,
    cookies: Vec<String>,
    body: serde_json::Value,
}

async fn post_api(app: &TestApp, query: &str, headers: &[(header::HeaderName, String)]) -> ApiResponse {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api")
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        request = request.header(name, value);
    }
    let request = request
        .body(Body::from(serde_json::json!({ "query": query }).to_string()))
        .unwrap();

    let response = postwall::app(app.state.clone())
        .oneshot(request)
        .await
        .unwrap();

    let status = response.status();
    let cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    ApiResponse {
        status,
        cookies,
        body: serde_json::from_slice(&bytes).unwrap(),
    }
}

/// Sign up over HTTP and return the session token from the cookie.
async fn sign_up_token(app: &TestApp, username: &str, email: &str) -> String {
    let response = post_api(
        app,
        &format!(
            r#"mutation {{ signUp(username: "{}", email: "{}", password: "pass1234") {{ id }} }}"#,
            username, email
        ),
        &[],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let cookie = &response.cookies[0];
    cookie
        .trim_start_matches("jwt=")
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn sign_up_over_http_sets_cookie() {
    let app = TestApp::new();
    let token = sign_up_token(&app, "alice", "alice@example.com").await;
    assert_eq!(token.split('.').count(), 3);
}

#[tokio::test]
async fn session_cookie_identifies_caller() {
    let app = TestApp::new();
    let token = sign_up_token(&app, "alice", "alice@example.com").await;

    let response = post_api(
        &app,
        "{ me { username email } }",
        &[(header::COOKIE, format!("jwt={}", token))],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["me"]["username"], "alice");
}

#[tokio::test]
async fn bearer_header_identifies_caller() {
    let app = TestApp::new();
    let token = sign_up_token(&app, "alice", "alice@example.com").await;

    let response = post_api(
        &app,
        "{ me { username } }",
        &[(header::AUTHORIZATION, format!("Bearer {}", token))],
    )
    .await;
    assert_eq!(response.body["data"]["me"]["username"], "alice");
}

#[tokio::test]
async fn bearer_header_wins_over_cookie() {
    let app = TestApp::new();
    let alice = sign_up_token(&app, "alice", "alice@example.com").await;
    let bob = sign_up_token(&app, "bob_1", "bob@example.com").await;

    let response = post_api(
        &app,
        "{ me { username } }",
        &[
            (header::COOKIE, format!("jwt={}", alice)),
            (header::AUTHORIZATION, format!("Bearer {}", bob)),
        ],
    )
    .await;
    assert_eq!(response.body["data"]["me"]["username"], "bob_1");
}

#[tokio::test]
async fn invalid_cookie_degrades_to_anonymous() {
    let app = TestApp::new();

    let response = post_api(
        &app,
        "{ postFeed { results } }",
        &[(header::COOKIE, "jwt=garbage.token.value".to_string())],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["postFeed"]["results"], 0);

    let response = post_api(
        &app,
        "{ me { id } }",
        &[(header::COOKIE, "jwt=garbage.token.value".to_string())],
    )
    .await;
    assert_eq!(
        response.body["errors"][0]["extensions"]["code"],
        "UNAUTHENTICATED"
    );
    assert_eq!(
        response.body["errors"][0]["message"],
        "You need to be signed in to access your profile."
    );
}

#[tokio::test]
async fn invalid_bearer_header_fails_the_request() {
    let app = TestApp::new();

    let response = post_api(
        &app,
        "{ postFeed { results } }",
        &[(header::AUTHORIZATION, "Bearer garbage.token.value".to_string())],
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body["data"].is_null());
    assert_eq!(
        response.body["errors"][0]["extensions"]["code"],
        "UNAUTHENTICATED"
    );
    assert_eq!(
        response.body["errors"][0]["message"],
        "Invalid or expired token. Please login again"
    );
}

#[tokio::test]
async fn invalid_bearer_header_is_not_rescued_by_valid_cookie() {
    let app = TestApp::new();
    let alice = sign_up_token(&app, "alice", "alice@example.com").await;

    let response = post_api(
        &app,
        "{ me { username } }",
        &[
            (header::COOKIE, format!("jwt={}", alice)),
            (header::AUTHORIZATION, "Bearer garbage.token.value".to_string()),
        ],
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body["data"].is_null());
    assert_eq!(
        response.body["errors"][0]["extensions"]["code"],
        "UNAUTHENTICATED"
    );
}

#[tokio::test]
async fn deleted_account_token_is_anonymous() {
    let app = TestApp::new();
    let token = sign_up_token(&app, "alice", "alice@example.com").await;
    let auth = [(header::AUTHORIZATION, format!("Bearer {}", token))];

    let deleted = post_api(&app, r#"mutation { deleteUser(password: "pass1234") }"#, &auth).await;
    assert!(deleted.body["errors"].is_null(), "{}", deleted.body);

    let response = post_api(&app, "{ me { id } }", &auth).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["errors"][0]["extensions"]["code"],
        "UNAUTHENTICATED"
    );
}

#[tokio::test]
async fn sign_out_over_http_clears_cookie() {
    let app = TestApp::new();
    let response = post_api(&app, "mutation { signOut }", &[]).await;

    assert_eq!(response.body["data"]["signOut"], true);
    assert_eq!(response.cookies.len(), 1);
    assert!(response.cookies[0].starts_with("jwt=;"));
}

#[tokio::test]
async fn playground_is_served() {
    let app = TestApp::new();
    let response = postwall::app(app.state.clone())
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("GraphQL Playground"));
}
