#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use musicclub_api::auth::jwt::{generate_access_token, JwtConfig};
use musicclub_api::config::ServerConfig;
use musicclub_api::router::build_app_router;
use musicclub_api::state::AppState;
use musicclub_core::roles::ROLE_MEMBER;
use musicclub_core::song_roles::normalize_roles;
use musicclub_core::types::DbId;
use musicclub_db::models::song::{CreateSong, Song};
use musicclub_db::models::user::{CreateUser, User};
use musicclub_db::repositories::{RoleLedgerRepo, SongRepo, UserRepo};
use musicclub_notify::telegram::TelegramConfig;
use musicclub_notify::{Notifier, RecordingNotifier};
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        telegram: TelegramConfig {
            timeout: Duration::from_secs(2),
            ..TelegramConfig::default()
        },
        topic_backfill_interval_secs: 0,
    }
}

/// App state wired to a [`RecordingNotifier`] the test can inspect.
pub fn test_state(pool: PgPool) -> (AppState, Arc<RecordingNotifier>) {
    test_state_with(pool, Arc::new(RecordingNotifier::new()))
}

pub fn test_state_with(
    pool: PgPool,
    notifier: Arc<RecordingNotifier>,
) -> (AppState, Arc<RecordingNotifier>) {
    let dyn_notifier: Arc<dyn Notifier> = notifier.clone();
    (AppState::new(pool, test_config(), dyn_notifier), notifier)
}

/// Build the full application router, mirroring `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let (state, _) = test_state(pool);
    build_app_router(state, &test_config())
}

/// Router plus the state it shares, for tests that need to flush notifications.
pub fn build_test_app_with_state(pool: PgPool) -> (Router, AppState, Arc<RecordingNotifier>) {
    let (state, notifier) = test_state(pool);
    (build_app_router(state.clone(), &test_config()), state, notifier)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_user(pool: &PgPool, username: &str, tg_user_id: Option<i64>) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            display_name: username.to_string(),
            tg_user_id,
        },
    )
    .await
    .expect("user creation should succeed")
}

pub async fn create_song(
    pool: &PgPool,
    title: &str,
    artist: &str,
    roles: &[&str],
    created_by: Option<DbId>,
) -> Song {
    let song = SongRepo::create(
        pool,
        &CreateSong {
            title: title.to_string(),
            artist: artist.to_string(),
            link_url: "https://example.com/song".to_string(),
            created_by,
            ..Default::default()
        },
    )
    .await
    .expect("song creation should succeed");
    RoleLedgerRepo::replace_required_roles(pool, song.id, &normalize_roles(roles.iter().copied()))
        .await
        .expect("role setup should succeed");
    song
}

pub fn token_for(user_id: DbId, role: &str) -> String {
    let config = test_config();
    generate_access_token(user_id, role, &config.jwt).expect("token generation should succeed")
}

pub fn member_token(user_id: DbId) -> String {
    token_for(user_id, ROLE_MEMBER)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    json_request(app, "POST", uri, body, Some(token)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    json_request(app, "PUT", uri, body, Some(token)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, "POST", uri, body, None).await
}

async fn json_request(
    app: Router,
    method: &str,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
