//! Authentication routes.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::auth::AuthOwner;
use crate::error::Result;
use crate::handlers::{handle_sign_in, handle_sign_out, handle_sign_up, AuthResponse, CredentialsRequest};
use crate::AppState;

/// Create auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up_handler))
        .route("/auth/signin", post(sign_in_handler))
        .route("/auth/signout", post(sign_out_handler))
}

/// POST /auth/signup - Register and open a session.
async fn sign_up_handler(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>> {
    let response = handle_sign_up(&state.pool, &state.sessions, request).await?;
    Ok(Json(response))
}

/// POST /auth/signin - Verify credentials and open a session.
async fn sign_in_handler(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>> {
    let response = handle_sign_in(&state.pool, &state.sessions, request).await?;
    Ok(Json(response))
}

/// Response for sign-out.
#[derive(Serialize)]
pub struct SignOutResponse {
    pub signed_out: bool,
}

/// POST /auth/signout - Close the current session.
async fn sign_out_handler(
    State(state): State<AppState>,
    auth: AuthOwner,
) -> Json<SignOutResponse> {
    let signed_out = handle_sign_out(&state.sessions, &auth.token);
    Json(SignOutResponse { signed_out })
}
