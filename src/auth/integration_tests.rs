//! Integration tests for the session middleware, issuance and authorization.
//!
//! These tests drive a small axum router end to end with in-memory
//! collaborators, the way an embedding application wires the module.

#![cfg(test)]

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{FromRef, Path, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::testing::{StaticRuleEngine, StubIdentityStore};
use crate::auth::{
    AccessRuleEngine, AuthError, RequestContext, SessionState, StoreError, authorize_request,
    session_middleware,
};
use crate::record::Record;
use crate::types::CookieName;

const CLEARED: &str =
    "pb_auth=; Path=/; Secure; HttpOnly; Max-Age=-1; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Clone)]
struct AppState {
    session: SessionState,
    rules: Arc<dyn AccessRuleEngine>,
}

impl FromRef<AppState> for SessionState {
    fn from_ref(state: &AppState) -> Self {
        state.session.clone()
    }
}

async fn me(ctx: RequestContext) -> Json<Value> {
    Json(serde_json::json!({
        "id": ctx.auth().map(|r| r.id().to_string()),
    }))
}

async fn login(
    State(session): State<SessionState>,
    Json(body): Json<Value>,
) -> Result<Response, AuthError> {
    let id = body["id"].as_str().unwrap_or_default();
    let user = Record::new(id, "users");
    let cookie = session.issue_session(&user).await?;
    Ok((cookie, Json(serde_json::json!({ "id": id }))).into_response())
}

async fn logout(State(session): State<SessionState>) -> impl IntoResponse {
    (session.end_session(), StatusCode::NO_CONTENT)
}

async fn show_post(
    State(app): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Value>, AuthError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AuthError::RequestInfo(e.to_string()))?;
    let post = Record::new(id.as_str(), "posts");

    authorize_request(
        app.rules.as_ref(),
        &parts,
        &bytes,
        &post,
        Some("@request.auth.id != ''"),
    )
    .await?;

    Ok(Json(serde_json::json!({ "id": id })))
}

fn app(store: StubIdentityStore, rules: StaticRuleEngine) -> Router {
    let session = SessionState::new(Arc::new(store), CookieName::new("pb_auth"));
    let state = AppState {
        session: session.clone(),
        rules: Arc::new(rules),
    };

    Router::new()
        .route("/me", get(me))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/posts/{id}", get(show_post))
        .layer(axum::middleware::from_fn_with_state(
            session,
            session_middleware,
        ))
        .with_state(state)
}

fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request {
    let mut builder = axum::http::Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_request_without_cookie_is_anonymous() {
    let app = app(StubIdentityStore::new(), StaticRuleEngine::allowing());

    let response = app.oneshot(get_with_cookie("/me", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(json_body(response).await, serde_json::json!({ "id": null }));
}

#[tokio::test]
async fn test_invalid_cookie_continues_and_clears_once() {
    let store = StubIdentityStore::new()
        .failing_resolve(StoreError::InvalidToken("expired".to_string()));
    let app = app(store, StaticRuleEngine::allowing());

    let response = app
        .oneshot(get_with_cookie("/me", Some("pb_auth=stale-token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response), vec![CLEARED.to_string()]);
    assert_eq!(json_body(response).await, serde_json::json!({ "id": null }));
}

#[tokio::test]
async fn test_valid_cookie_attaches_identity() {
    let store = StubIdentityStore::new().with_token("tok123", Record::new("u_1", "users"));
    let app = app(store, StaticRuleEngine::allowing());

    let response = app
        .oneshot(get_with_cookie("/me", Some("theme=dark; pb_auth=tok123")))
        .await
        .unwrap();

    assert!(set_cookies(&response).is_empty());
    assert_eq!(json_body(response).await, serde_json::json!({ "id": "u_1" }));
}

#[tokio::test]
async fn test_login_sets_session_cookie_usable_on_next_request() {
    let app = app(StubIdentityStore::new(), StaticRuleEngine::allowing());

    let login = axum::http::Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"id":"u_7"}"#))
        .unwrap();
    let response = app.clone().oneshot(login).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    let line = &cookies[0];
    assert!(line.starts_with("pb_auth="));
    assert!(line.ends_with("; Path=/; Secure; HttpOnly"));
    assert!(!line.contains("Max-Age"));
    assert!(!line.contains("Expires"));

    let pair = line.split(';').next().unwrap().to_string();
    let response = app
        .oneshot(get_with_cookie("/me", Some(pair.as_str())))
        .await
        .unwrap();
    assert_eq!(json_body(response).await, serde_json::json!({ "id": "u_7" }));
}

#[tokio::test]
async fn test_login_with_stale_cookie_keeps_new_session() {
    let app = app(StubIdentityStore::new(), StaticRuleEngine::allowing());

    let login = axum::http::Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, "pb_auth=garbage")
        .body(Body::from(r#"{"id":"u_9"}"#))
        .unwrap();
    let response = app.clone().oneshot(login).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies[0], CLEARED);
    let last = cookies
        .iter()
        .rev()
        .find(|line| line.starts_with("pb_auth="))
        .unwrap();
    assert!(last.ends_with("; Path=/; Secure; HttpOnly"));
    assert!(!last.contains("Max-Age"));

    let pair = last.split(';').next().unwrap().to_string();
    assert_ne!(pair, "pb_auth=");
    let response = app
        .oneshot(get_with_cookie("/me", Some(pair.as_str())))
        .await
        .unwrap();
    assert!(set_cookies(&response).is_empty());
    assert_eq!(json_body(response).await, serde_json::json!({ "id": "u_9" }));
}

#[tokio::test]
async fn test_login_fails_when_token_cannot_be_minted() {
    let store =
        StubIdentityStore::new().failing_mint(StoreError::Backend("key rotation".to_string()));
    let app = app(store, StaticRuleEngine::allowing());

    let login = axum::http::Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"id":"u_7"}"#))
        .unwrap();
    let response = app.oneshot(login).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = app(StubIdentityStore::new(), StaticRuleEngine::allowing());

    let logout = axum::http::Request::builder()
        .method("POST")
        .uri("/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(logout).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(set_cookies(&response), vec![CLEARED.to_string()]);
}

#[tokio::test]
async fn test_denied_record_access_is_forbidden() {
    let rules = StaticRuleEngine::denying();
    let app = app(StubIdentityStore::new(), rules.clone());

    let response = app
        .oneshot(get_with_cookie("/posts/p1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "Forbidden" })
    );
    let call = rules.last_call().unwrap();
    assert_eq!(call.record, Record::new("p1", "posts"));
    assert!(call.auth.is_none());
}

#[tokio::test]
async fn test_allowed_record_access_sees_resolved_identity() {
    let user = Record::new("u_1", "users").with_field("role", "editor");
    let store = StubIdentityStore::new().with_token("tok123", user.clone());
    let rules = StaticRuleEngine::allowing();
    let app = app(store, rules.clone());

    let response = app
        .oneshot(get_with_cookie("/posts/p1", Some("pb_auth=tok123")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({ "id": "p1" }));
    let call = rules.last_call().unwrap();
    assert_eq!(call.auth, Some(user));
    assert_eq!(call.rule.as_deref(), Some("@request.auth.id != ''"));
}

#[tokio::test]
async fn test_rule_engine_failure_is_surfaced() {
    let rules = StaticRuleEngine::failing(StoreError::NotFound("posts/p404".to_string()));
    let app = app(StubIdentityStore::new(), rules);

    let response = app
        .oneshot(get_with_cookie("/posts/p404", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_identity() {
    let mut store = StubIdentityStore::new();
    for i in 0..16 {
        store = store.with_token(&format!("tok{}", i), Record::new(format!("u_{}", i), "users"));
    }
    let app = app(store, StaticRuleEngine::allowing());

    let mut handles = Vec::new();
    for i in 0..16 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let cookie = format!("pb_auth=tok{}", i);
            let response = app
                .oneshot(get_with_cookie("/me", Some(cookie.as_str())))
                .await
                .unwrap();
            (i, json_body(response).await)
        }));
    }

    for handle in handles {
        let (i, body) = handle.await.unwrap();
        assert_eq!(body, serde_json::json!({ "id": format!("u_{}", i) }));
    }
}
