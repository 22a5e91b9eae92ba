use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use keeper_core::health::healthz;
use keeper_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    account::{forgot_password, register, resend_otp, reset_password, verify_otp},
    health::readyz,
    token::{check_token, create_token, public_key, refresh_token, revoke_token},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Registration
        .route("/auth/register", post(register))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/otp/resend", post(resend_otp))
        // Token
        .route(
            "/auth/token",
            get(check_token)
                .post(create_token)
                .patch(refresh_token)
                .delete(revoke_token),
        )
        .route("/auth/public-key", get(public_key))
        // Password recovery
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/reset", post(reset_password))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
