use std::sync::Arc;

use sea_orm::Database;
use tracing::info;

use keeper_auth::config::AuthConfig;
use keeper_auth::router::build_router;
use keeper_auth::state::AppState;
use keeper_auth::usecase::otp::ThreadRngCodes;
use keeper_auth::usecase::password::PasswordHasher;
use keeper_auth::usecase::token::JwtIssuer;
use keeper_core::config::Config;
use keeper_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AuthConfig::from_env();

    let private_pem =
        std::fs::read(&config.jwt_private_key_path).expect("failed to read JWT_PRIVATE_KEY_PATH");
    let public_pem =
        std::fs::read(&config.jwt_public_key_path).expect("failed to read JWT_PUBLIC_KEY_PATH");
    let issuer = JwtIssuer::from_rsa_pem(
        &private_pem,
        &public_pem,
        config.jwt_issuer.clone(),
        config.access_token_ttl_mins,
    )
    .expect("invalid JWT key pair");

    let hasher = PasswordHasher::new(config.hash_params()).expect("invalid argon2 parameters");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let state = AppState {
        db,
        issuer: Arc::new(issuer),
        hasher: Arc::new(hasher),
        codes: Arc::new(ThreadRngCodes),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("auth service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
