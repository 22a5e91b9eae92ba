use chrono::{Duration, Utc};
use futures::future::join_all;
use uuid::Uuid;

use keeper_auth::error::{AuthServiceError, RefreshFailure};
use keeper_auth::usecase::refresh::RefreshTokens;

use crate::helpers::MockRefreshTokenRepo;

fn store() -> RefreshTokens<MockRefreshTokenRepo> {
    RefreshTokens {
        repo: MockRefreshTokenRepo::new(),
    }
}

#[tokio::test]
async fn should_issue_token_valid_for_an_hour() {
    let tokens = store();
    let user_id = Uuid::now_v7();
    let before = Utc::now();

    let issued = tokens.issue_or_rotate(user_id).await.unwrap();

    assert_eq!(issued.user_id, user_id);
    assert!(issued.expires_at >= before + Duration::minutes(60));
    assert_eq!(tokens.validate(&issued.token).await.unwrap(), user_id);
}

#[tokio::test]
async fn should_invalidate_previous_value_on_rotation() {
    let tokens = store();
    let user_id = Uuid::now_v7();

    let first = tokens.issue_or_rotate(user_id).await.unwrap();
    let second = tokens.issue_or_rotate(user_id).await.unwrap();

    assert_ne!(first.token, second.token);
    let result = tokens.validate(&first.token).await;
    assert!(
        matches!(
            result,
            Err(AuthServiceError::InvalidRefreshToken(RefreshFailure::NotFound))
        ),
        "expected NotFound, got {result:?}"
    );
    assert_eq!(tokens.validate(&second.token).await.unwrap(), user_id);
}

#[tokio::test]
async fn should_keep_one_token_per_user_under_concurrent_rotation() {
    let tokens = store();
    let user_id = Uuid::now_v7();

    let results = join_all((0..16).map(|_| tokens.issue_or_rotate(user_id))).await;
    let issued: Vec<String> = results.into_iter().map(|r| r.unwrap().token).collect();

    let stored = tokens.repo.tokens.lock().unwrap().clone();
    assert_eq!(stored.len(), 1);
    let survivor = &stored[&user_id].token;
    assert!(issued.contains(survivor));
    let valid = join_all(issued.iter().map(|t| tokens.validate(t))).await;
    assert_eq!(valid.iter().filter(|r| r.is_ok()).count(), 1);
}

#[tokio::test]
async fn should_report_expired_token() {
    let tokens = store();
    let user_id = Uuid::now_v7();
    let issued = tokens.issue_or_rotate(user_id).await.unwrap();
    tokens
        .repo
        .tokens
        .lock()
        .unwrap()
        .get_mut(&user_id)
        .unwrap()
        .expires_at = Utc::now() - Duration::seconds(1);

    let result = tokens.validate(&issued.token).await;
    assert!(
        matches!(
            result,
            Err(AuthServiceError::InvalidRefreshToken(RefreshFailure::Expired))
        ),
        "expected Expired, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_rotate_on_validate() {
    let tokens = store();
    let user_id = Uuid::now_v7();
    let issued = tokens.issue_or_rotate(user_id).await.unwrap();

    tokens.validate(&issued.token).await.unwrap();
    tokens.validate(&issued.token).await.unwrap();

    let stored = tokens.repo.tokens.lock().unwrap()[&user_id].clone();
    assert_eq!(stored, issued);
}

#[tokio::test]
async fn should_revoke_then_report_not_found() {
    let tokens = store();
    let issued = tokens.issue_or_rotate(Uuid::now_v7()).await.unwrap();

    tokens.revoke(&issued.token).await.unwrap();

    let again = tokens.revoke(&issued.token).await;
    assert!(
        matches!(
            again,
            Err(AuthServiceError::InvalidRefreshToken(RefreshFailure::NotFound))
        ),
        "expected NotFound, got {again:?}"
    );
    assert!(tokens.repo.tokens.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_empty_token() {
    let result = store().validate("").await;
    assert!(
        matches!(
            result,
            Err(AuthServiceError::InvalidRefreshToken(RefreshFailure::NotFound))
        ),
        "expected NotFound, got {result:?}"
    );
}
