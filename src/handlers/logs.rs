//! # Consumption Log Handlers
//!
//! CRUD over `consumption_logs` plus CSV export. Every accepted log awards
//! points: a base amount for the log itself and a bonus when it came from
//! an AI-assisted capture (audio/video) rather than manual entry.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth;
use crate::config::PointsConfig;
use crate::db::{self, NewLog};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub product: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub spend: Option<f64>,
    pub companions: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    /// "manual" (default), "audio", or "video"
    pub capture_method: Option<String>,
    pub ai_analysis: Option<serde_json::Value>,
}

/// Points earned by a log given how it was captured.
pub fn points_for_log(points: &PointsConfig, capture_method: &str) -> i64 {
    match capture_method {
        "audio" | "video" => points.log_base + points.capture_bonus,
        _ => points.log_base,
    }
}

pub async fn create_log(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateLogRequest>,
) -> AppResult<HttpResponse> {
    let user = auth::authenticate(&req, &state).await?;
    let input = body.into_inner();

    if input.product.trim().is_empty() {
        return Err(AppError::Validation("product is required".to_string()));
    }
    if let Some(spend) = input.spend {
        if !spend.is_finite() || spend < 0.0 {
            return Err(AppError::Validation("spend must be a non-negative number".to_string()));
        }
    }

    let capture_method = input.capture_method.unwrap_or_else(|| "manual".to_string());
    if !matches!(capture_method.as_str(), "manual" | "audio" | "video") {
        return Err(AppError::Validation(
            "capture_method must be one of: manual, audio, video".to_string(),
        ));
    }

    let config = state.get_config();
    let points = points_for_log(&config.points, &capture_method);

    let new = NewLog {
        user_id: user.id.clone(),
        product: input.product.trim().to_string(),
        brand: input.brand,
        category: input.category,
        spend: input.spend,
        companions: input.companions,
        location: input.location,
        notes: input.notes,
        media_url: input.media_url,
        media_type: input.media_type,
        capture_method,
        ai_analysis: input.ai_analysis.map(|v| v.to_string()),
        points,
    };

    let log = db::insert_log(&state.pool, &new).await?;
    db::add_user_points(&state.pool, &user.id, points).await?;
    info!(user_id = %user.id, log_id = %log.id, points = points, "consumption log created");

    Ok(HttpResponse::Created().json(json!({ "log": log, "points_awarded": points })))
}

pub async fn list_logs(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let user = auth::authenticate(&req, &state).await?;
    let logs = db::list_logs(&state.pool, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "logs": logs })))
}

pub async fn get_log(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user = auth::authenticate(&req, &state).await?;
    let id = path.into_inner();
    let log = db::get_log(&state.pool, &id, &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("consumption log not found".to_string()))?;
    Ok(HttpResponse::Ok().json(json!({ "log": log })))
}

pub async fn delete_log(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user = auth::authenticate(&req, &state).await?;
    let id = path.into_inner();
    if !db::delete_log(&state.pool, &id, &user.id).await? {
        return Err(AppError::NotFound("consumption log not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "deleted" })))
}

/// `GET /logs/export` — the caller's logs as a CSV attachment.
pub async fn export_csv(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let user = auth::authenticate(&req, &state).await?;
    let logs = db::list_logs(&state.pool, &user.id).await?;

    let mut out = String::from(
        "id,product,brand,category,spend,companions,location,notes,capture_method,created_at,points\n",
    );
    for log in &logs {
        let row = [
            log.id.clone(),
            log.product.clone(),
            log.brand.clone().unwrap_or_default(),
            log.category.clone().unwrap_or_default(),
            log.spend.map(|s| s.to_string()).unwrap_or_default(),
            log.companions.clone().unwrap_or_default(),
            log.location.clone().unwrap_or_default(),
            log.notes.clone().unwrap_or_default(),
            log.capture_method.clone(),
            log.created_at.to_rfc3339(),
            log.points.to_string(),
        ];
        let escaped: Vec<String> = row.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"consumption_logs.csv\"",
        ))
        .body(out))
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
