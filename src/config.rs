//! # Configuration Management
//!
//! Loads application configuration from layered sources, highest priority
//! last:
//!
//! 1. Built-in defaults (the `Default` impl below)
//! 2. `config.toml` in the working directory (optional)
//! 3. Environment variables with the `APP_` prefix
//!    (e.g. `APP_SERVER_PORT=3000`)
//! 4. Bare `HOST` / `PORT` variables used by deployment platforms

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub audio: AudioConfig,
    pub auth: AuthConfig,
    pub points: PointsConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:snacktrack.db`
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory where normalized capture audio is stored
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Canonical sample rate for normalized uploads (Hz)
    pub target_sample_rate: u32,
    /// Reject uploads larger than this many bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session token lifetime in hours
    pub session_ttl_hours: i64,
}

/// Points awarded for consumption logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    /// Base points for every accepted consumption log
    pub log_base: i64,
    /// Bonus when the log came from an AI-assisted audio/video capture
    pub capture_bonus: i64,
}

/// External AI services the backend passes captured data through to.
/// Empty endpoint means the service is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub speech_endpoint: String,
    pub speech_api_key: String,
    pub analysis_endpoint: String,
    pub analysis_api_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite:snacktrack.db".to_string(),
            },
            media: MediaConfig {
                dir: "media".to_string(),
            },
            audio: AudioConfig {
                target_sample_rate: crate::audio::TARGET_SAMPLE_RATE,
                max_upload_bytes: 25 * 1024 * 1024,
            },
            auth: AuthConfig {
                session_ttl_hours: 24 * 14,
            },
            points: PointsConfig {
                log_base: 10,
                capture_bonus: 5,
            },
            services: ServicesConfig {
                speech_endpoint: String::new(),
                speech_api_key: String::new(),
                analysis_endpoint: String::new(),
                analysis_api_key: String::new(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `config.toml`, and environment.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms set bare HOST/PORT
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }
        if self.database.url.is_empty() {
            return Err(anyhow::anyhow!("Database URL cannot be empty"));
        }
        if self.audio.target_sample_rate == 0 {
            return Err(anyhow::anyhow!("Target sample rate must be greater than 0"));
        }
        if self.audio.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }
        if self.auth.session_ttl_hours <= 0 {
            return Err(anyhow::anyhow!("Session TTL must be greater than 0"));
        }
        if self.points.log_base < 0 || self.points.capture_bonus < 0 {
            return Err(anyhow::anyhow!("Point awards cannot be negative"));
        }
        Ok(())
    }
}
