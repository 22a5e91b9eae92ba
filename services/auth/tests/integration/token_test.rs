use std::collections::BTreeSet;

use uuid::Uuid;

use keeper_auth::error::AuthServiceError;
use keeper_auth::usecase::token::JwtIssuer;
use keeper_auth_types::token::AccessTokenVerifier;

use crate::helpers::{ISSUER, OTHER_PRIVATE_PEM, PRIVATE_PEM, PUBLIC_PEM, test_issuer};

fn roles(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn should_issue_token_verifiable_with_public_key_alone() {
    let issuer = test_issuer();
    let user_id = Uuid::now_v7();

    let issued = issuer.issue(user_id, &roles(&["USER", "ADMIN"])).unwrap();

    let verifier = AccessTokenVerifier::from_rsa_pem(PUBLIC_PEM.as_bytes(), ISSUER).unwrap();
    let info = verifier.verify(&issued.token).unwrap();
    assert_eq!(info.user_id, user_id);
    assert_eq!(info.roles, roles(&["ADMIN", "USER"]));
    assert_eq!(info.access_token_exp, issued.expires_at);
}

#[tokio::test]
async fn should_embed_roles_and_expiry_claims() {
    let issuer = test_issuer();
    let issued = issuer.issue(Uuid::now_v7(), &roles(&["USER"])).unwrap();

    let claims = issuer.verifier().decode_claims(&issued.token).unwrap();
    assert_eq!(claims.roles, vec!["USER".to_owned()]);
    assert_eq!(claims.iss, ISSUER);
    assert_eq!(claims.exp - claims.iat, 15 * 60);
}

#[tokio::test]
async fn should_issue_distinct_tokens_in_same_second() {
    let issuer = test_issuer();
    let user_id = Uuid::now_v7();
    let a = issuer.issue(user_id, &roles(&["USER"])).unwrap();
    let b = issuer.issue(user_id, &roles(&["USER"])).unwrap();
    assert_ne!(a.token, b.token);
}

#[tokio::test]
async fn should_reject_mismatched_key_pair() {
    let result = JwtIssuer::from_rsa_pem(
        OTHER_PRIVATE_PEM.as_bytes(),
        PUBLIC_PEM.as_bytes(),
        ISSUER,
        15,
    );
    assert!(
        matches!(result, Err(AuthServiceError::Internal(_))),
        "expected Internal for mismatched keys"
    );
}

#[tokio::test]
async fn should_reject_garbage_private_key() {
    let result = JwtIssuer::from_rsa_pem(b"not a pem", PUBLIC_PEM.as_bytes(), ISSUER, 15);
    assert!(matches!(result, Err(AuthServiceError::Internal(_))));
}

#[tokio::test]
async fn should_expose_public_key_pem() {
    let issuer = test_issuer();
    assert_eq!(issuer.public_key_pem(), PUBLIC_PEM);
    assert!(PRIVATE_PEM.contains("PRIVATE KEY"));
}
