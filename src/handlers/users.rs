//! # Account and Session Handlers
//!
//! `POST /auth/register`, `POST /auth/login`, `POST /auth/logout`, and
//! `GET /users/me`. Registration and login both return a session token;
//! everything else expects it as a bearer header.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(AppError::Validation("first and last name are required".to_string()));
    }

    let email = req.email.trim().to_lowercase();
    if db::find_user_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Validation("email is already registered".to_string()));
    }

    let password_hash = auth::new_password_hash(&req.password);
    let user = db::create_user(
        &state.pool,
        &email,
        req.first_name.trim(),
        req.last_name.trim(),
        req.phone.as_deref(),
        &password_hash,
    )
    .await?;

    let token = issue_session(&state, &user.id).await?;
    info!(user_id = %user.id, "user registered");

    Ok(HttpResponse::Created().json(json!({ "user": user, "token": token })))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let email = req.email.trim().to_lowercase();

    let user = db::find_user_by_email(&state.pool, &email)
        .await?
        .filter(|u| auth::verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| AppError::Unauthorized("invalid email or password".to_string()))?;

    let token = issue_session(&state, &user.id).await?;
    info!(user_id = %user.id, "user logged in");

    Ok(HttpResponse::Ok().json(json!({ "user": user, "token": token })))
}

pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    // Resolving the user first means an invalid token still gets a 401
    let _user = auth::authenticate(&req, &state).await?;
    if let Some(token) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        db::delete_session(&state.pool, token.trim()).await?;
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "logged out" })))
}

pub async fn me(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let user = auth::authenticate(&req, &state).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

async fn issue_session(state: &AppState, user_id: &str) -> AppResult<String> {
    let ttl_hours = state.get_config().auth.session_ttl_hours;
    let token = auth::new_session_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);
    db::create_session(&state.pool, &token, user_id, expires_at).await?;
    Ok(token)
}
