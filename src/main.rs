//! # SnackTrack Backend — Main Entry Point
//!
//! HTTP server for the SnackTrack consumption-logging app: account and
//! session management, consumption log CRUD with points, a reward catalog
//! with redemption, and AI-assisted audio capture built on the WAV
//! normalizer in `audio/`.
//!
//! ## Application layout:
//! - **config**: layered configuration (TOML file + environment)
//! - **state**: shared state (config, database pool, metrics)
//! - **db**: SQLite schema and parameterized queries
//! - **auth**: salted credential hashes and opaque session tokens
//! - **audio**: decode → resample → encode normalization pipeline
//! - **media**: local storage for normalized capture audio
//! - **services**: pass-through clients for speech and analysis APIs
//! - **handlers**: REST endpoints under `/api/v1`
//! - **middleware**: request logging and endpoint metrics
//! - **error**: `AppError` → HTTP status + JSON `{ "message": ... }`

mod audio;
mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod health;
mod media;
mod middleware;
mod services;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag set by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting snacktrack-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    let pool = db::connect(&config.database.url).await?;
    db::init_schema(&pool).await?;
    db::seed_rewards(&pool).await?;
    media::MediaStore::new(&config.media.dir).ensure_dir().await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let app_state = AppState::new(config.clone(), pool);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Telemetry)
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/auth/register", web::post().to(handlers::users::register))
                    .route("/auth/login", web::post().to(handlers::users::login))
                    .route("/auth/logout", web::post().to(handlers::users::logout))
                    .route("/users/me", web::get().to(handlers::users::me))
                    .route("/logs", web::post().to(handlers::logs::create_log))
                    .route("/logs", web::get().to(handlers::logs::list_logs))
                    // Must precede /logs/{id} so "export" is not an id
                    .route("/logs/export", web::get().to(handlers::logs::export_csv))
                    .route("/logs/{id}", web::get().to(handlers::logs::get_log))
                    .route("/logs/{id}", web::delete().to(handlers::logs::delete_log))
                    .route("/rewards", web::get().to(handlers::rewards::list_rewards))
                    .route(
                        "/rewards/{id}/redeem",
                        web::post().to(handlers::rewards::redeem),
                    )
                    .route(
                        "/capture/audio",
                        web::post().to(handlers::capture::capture_audio),
                    ),
            )
            // Health check at root level for load balancers
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snacktrack_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
