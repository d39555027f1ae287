//! # Sessions and Credentials
//!
//! The one identity model in the system: credentials are stored as salted
//! SHA-256 hashes, and a successful login mints an opaque session token
//! kept server-side in the `sessions` table with an expiry. Every
//! authenticated request presents the token as `Authorization: Bearer
//! <token>` and is resolved back to a user with a single lookup.

use actix_web::HttpRequest;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Stored hash format: `<salt>$<hex sha256(salt:password)>`.
pub fn new_password_hash(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest_hex(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    digest_hex(salt, password) == expected
}

fn digest_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Mint an opaque session token (two v4 uuids, 64 hex chars).
pub fn new_session_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Resolve the request's bearer token to a user, or fail with 401.
pub async fn authenticate(req: &HttpRequest, state: &AppState) -> AppResult<db::User> {
    let token = bearer_token(req)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    db::find_user_by_session(&state.pool, token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid or expired session".to_string()))
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(str::trim)
}
