//! Account handlers - sign-up, sign-in, sign-out.
//!
//! On success the client receives the remote identity id it binds to its
//! local identity, plus a bearer token for subsequent calls. Failures are
//! human-readable messages, not structured codes.

use crate::auth::SessionStore;
use crate::db;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

/// Request body for sign-up and sign-in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Response for successful sign-up/sign-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Remote identity id, bound client-side to the local identity.
    pub owner_id: String,
    /// Bearer token for subsequent requests.
    pub token: String,
}

const MIN_PASSWORD_LEN: usize = 8;

/// Register a new owner and open a session.
pub async fn handle_sign_up(
    pool: &PgPool,
    sessions: &SessionStore,
    request: CredentialsRequest,
) -> Result<AuthResponse> {
    let email = normalize_email(&request.email)?;
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if db::find_owner_by_email(pool, &email).await?.is_some() {
        return Err(AppError::BadRequest(
            "An account with this email already exists".to_string(),
        ));
    }

    let owner_id = Uuid::new_v4().to_string();
    let salt = Uuid::new_v4().simple().to_string();
    let digest = digest_password(&salt, &request.password);
    db::create_owner(pool, &owner_id, &email, &format!("{salt}${digest}")).await?;

    tracing::info!(owner_id = %owner_id, "new owner registered");

    let token = sessions.issue(&owner_id);
    Ok(AuthResponse { owner_id, token })
}

/// Verify credentials and open a session.
pub async fn handle_sign_in(
    pool: &PgPool,
    sessions: &SessionStore,
    request: CredentialsRequest,
) -> Result<AuthResponse> {
    let email = normalize_email(&request.email)?;

    let owner = db::find_owner_by_email(pool, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&owner.password_digest, &request.password) {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = sessions.issue(&owner.id);
    Ok(AuthResponse {
        owner_id: owner.id,
        token,
    })
}

/// Close the session behind a bearer token.
pub fn handle_sign_out(sessions: &SessionStore, token: &str) -> bool {
    sessions.revoke(token)
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest(
            "A valid email address is required".to_string(),
        ));
    }
    Ok(email)
}

fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex(&hasher.finalize())
}

fn verify_password(stored: &str, password: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => digest_password(salt, password) == digest,
        None => false,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, byte| {
            use std::fmt::Write;
            let _ = write!(out, "{byte:02x}");
            out
        },
    )
}
