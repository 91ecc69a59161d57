//! Authentication extractor.
//!
//! Pulls the bearer token from the Authorization header and resolves it to
//! the owning remote identity via the session store.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::AppState;

/// Authenticated owner extracted from the request.
#[derive(Debug, Clone)]
pub struct AuthOwner {
    /// Remote identity id the bearer token belongs to.
    pub owner_id: String,
    /// The bearer token itself (needed by sign-out).
    pub token: String,
}

impl FromRequestParts<AppState> for AuthOwner {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                let token = header.trim_start_matches("Bearer ").to_string();
                if token.is_empty() {
                    return Err((StatusCode::UNAUTHORIZED, "Empty bearer token"));
                }

                match state.sessions.resolve(&token) {
                    Some(owner_id) => Ok(AuthOwner { owner_id, token }),
                    None => Err((StatusCode::UNAUTHORIZED, "Unknown or expired token")),
                }
            }
            Some(_) => Err((
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            )),
            None => Err((StatusCode::UNAUTHORIZED, "Missing authorization header")),
        }
    }
}
