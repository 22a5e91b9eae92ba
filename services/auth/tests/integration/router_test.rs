use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use sea_orm::DatabaseConnection;
use tower::ServiceExt;
use uuid::Uuid;

use keeper_auth::router::build_router;
use keeper_auth::state::AppState;
use keeper_auth::usecase::otp::ThreadRngCodes;

use crate::helpers::{PUBLIC_PEM, test_hasher, test_issuer};

// Routes exercised here never reach the database.
fn app() -> (axum::Router, AppState) {
    let state = AppState {
        db: DatabaseConnection::Disconnected,
        issuer: test_issuer(),
        hasher: test_hasher(),
        codes: Arc::new(ThreadRngCodes),
    };
    (build_router(state.clone()), state)
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn should_answer_healthz_with_request_id() {
    let (router, _) = app();
    let resp = router
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let id = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(id.parse::<Uuid>().is_ok());
}

#[tokio::test]
async fn should_serve_public_key() {
    let (router, _) = app();
    let resp = router
        .oneshot(Request::get("/auth/public-key").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), PUBLIC_PEM);
}

#[tokio::test]
async fn should_describe_valid_bearer_token() {
    let (router, state) = app();
    let user_id = Uuid::now_v7();
    let issued = state
        .issuer
        .issue(user_id, &BTreeSet::from(["USER".to_owned()]))
        .unwrap();

    let resp = router
        .oneshot(
            Request::get("/auth/token")
                .header(header::AUTHORIZATION, format!("Bearer {}", issued.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["user_id"], user_id.to_string());
    assert_eq!(json["roles"], serde_json::json!(["USER"]));
    assert_eq!(json["access_token_exp"], issued.expires_at);
}

#[tokio::test]
async fn should_reject_missing_bearer_token() {
    let (router, _) = app();
    let resp = router
        .oneshot(Request::get("/auth/token").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["kind"], "INVALID_TOKEN");
}

#[tokio::test]
async fn should_reject_refresh_without_cookie() {
    let (router, _) = app();
    let resp = router
        .oneshot(
            Request::patch("/auth/token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["kind"], "INVALID_REFRESH_TOKEN");
}

#[tokio::test]
async fn should_reject_malformed_registration() {
    let (router, _) = app();
    let resp = router
        .oneshot(
            Request::post("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"name":"Ana","email":"not-an-email","password":"pw12345678"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["kind"], "INVALID_INPUT");
}
