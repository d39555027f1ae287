//! # Reward Handlers
//!
//! Catalog listing and redemption. Redemption is a single conditional
//! UPDATE against the balance, so two concurrent redeems can never spend
//! the same points twice.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::info;

use crate::auth;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub async fn list_rewards(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let rewards = db::list_active_rewards(&state.pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "rewards": rewards })))
}

pub async fn redeem(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user = auth::authenticate(&req, &state).await?;
    let reward_id = path.into_inner();

    let reward = db::get_reward(&state.pool, &reward_id)
        .await?
        .ok_or_else(|| AppError::NotFound("reward not found".to_string()))?;
    if !reward.is_active {
        return Err(AppError::Validation("reward is no longer available".to_string()));
    }

    if !db::try_deduct_points(&state.pool, &user.id, reward.points_required).await? {
        return Err(AppError::Validation(format!(
            "insufficient points: {} required",
            reward.points_required
        )));
    }

    let remaining = db::find_user_by_id(&state.pool, &user.id)
        .await?
        .map(|u| u.points)
        .unwrap_or(0);
    info!(user_id = %user.id, reward_id = %reward.id, "reward redeemed");

    Ok(HttpResponse::Ok().json(json!({
        "message": "reward redeemed",
        "reward": reward,
        "points_remaining": remaining
    })))
}
