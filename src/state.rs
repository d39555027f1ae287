//! # Application State Management
//!
//! Shared state handed to every request handler: configuration, the
//! database pool, request metrics, and the server start time. All mutable
//! pieces sit behind `Arc<RwLock<_>>`; handlers clone snapshots out rather
//! than holding locks across awaits.

use crate::config::AppConfig;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<RwLock<AppConfig>>,
    pub metrics: Arc<RwLock<AppMetrics>>,
    pub pool: SqlitePool,
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    /// Audio capture conversions currently in flight
    pub active_captures: u32,
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, pool: SqlitePool) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            pool,
            start_time: Instant::now(),
        }
    }

    /// Clone out the current configuration so no lock is held afterwards.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    pub fn increment_active_captures(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_captures += 1;
    }

    pub fn decrement_active_captures(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_captures > 0 {
            metrics.active_captures -= 1;
        }
    }

    /// Consistent copy of the metrics for the /metrics endpoint.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_captures: metrics.active_captures,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_state() -> AppState {
        let pool = crate::db::connect("sqlite::memory:").await.unwrap();
        AppState::new(AppConfig::default(), pool)
    }

    #[tokio::test]
    async fn test_metrics_counters() {
        let state = test_state().await;
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();
        state.record_endpoint_request("GET /health", 12, false);
        state.record_endpoint_request("GET /health", 8, true);

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
        let endpoint = &snapshot.endpoint_metrics["GET /health"];
        assert_eq!(endpoint.request_count, 2);
        assert_eq!(endpoint.error_count, 1);
        assert!((endpoint.average_duration_ms() - 10.0).abs() < f64::EPSILON);
        assert!((endpoint.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_active_captures_never_underflow() {
        let state = test_state().await;
        state.decrement_active_captures();
        assert_eq!(state.get_metrics_snapshot().active_captures, 0);
        state.increment_active_captures();
        assert_eq!(state.get_metrics_snapshot().active_captures, 1);
    }
}
