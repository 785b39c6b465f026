#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use naoty_api::auth::jwt::{generate_access_token, JwtConfig};
use naoty_api::auth::password::hash_password;
use naoty_api::config::ServerConfig;
use naoty_api::routes;
use naoty_api::state::AppState;
use naoty_core::roles::Role;
use naoty_core::types::DbId;
use naoty_core::workflow::WorkflowConfig;
use naoty_db::models::user::CreateUser;
use naoty_db::repositories::UserRepo;
use naoty_events::EventBus;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub const TEST_PASSWORD: &str = "mot-de-passe-de-test";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        workflow: WorkflowConfig::default(),
        dispatch_webhook_url: None,
        dispatch_poll_interval_secs: 30,
    }
}

/// Build the application router with the same middleware stack as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config(), Arc::new(EventBus::default()))
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(config),
        event_bus,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A seeded user and a valid access token for them.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: DbId,
    pub username: String,
    pub token: String,
}

/// Insert a user with [`TEST_PASSWORD`] holding `roles`.
pub async fn create_user(pool: &PgPool, username: &str, roles: &[Role]) -> TestUser {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            full_name: format!("{username} (test)"),
            email: format!("{username}@naoty.test"),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
        },
    )
    .await
    .unwrap();

    let mut names = Vec::with_capacity(roles.len());
    for role in roles {
        assert!(UserRepo::assign_role(pool, user.id, role.as_str()).await.unwrap());
        names.push(role.as_str().to_string());
    }

    let token = generate_access_token(user.id, &names, &test_config().jwt).unwrap();
    TestUser {
        id: user.id,
        username: user.username,
        token,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(request(Method::GET, uri, None, None)).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    app.oneshot(request(Method::GET, uri, Some(token), None))
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(request(Method::POST, uri, None, Some(body)))
        .await
        .unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    app.oneshot(request(Method::POST, uri, Some(token), Some(body)))
        .await
        .unwrap()
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    app.oneshot(request(Method::POST, uri, Some(token), None))
        .await
        .unwrap()
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    app.oneshot(request(Method::PUT, uri, Some(token), Some(body)))
        .await
        .unwrap()
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    app.oneshot(request(Method::DELETE, uri, Some(token), None))
        .await
        .unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status, then return the parsed body.
pub async fn expect_json(response: Response, status: StatusCode) -> serde_json::Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}
