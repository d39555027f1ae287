//! Transcript classification pass-through.
//!
//! Sends the transcript of a captured recording to the configured analysis
//! endpoint, which extracts structured consumption fields (product, brand,
//! category, sentiment). The response is stored verbatim in the
//! `ai_analysis` column and echoed to the client as a draft log.

use serde::{Deserialize, Serialize};

use crate::config::ServicesConfig;
use crate::error::{AppError, AppResult};

/// Structured fields the analysis service extracts from a transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub product: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub sentiment: Option<String>,
    pub confidence: Option<f64>,
}

pub struct AnalysisClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct AnalysisRequest<'a> {
    text: &'a str,
}

impl AnalysisClient {
    /// Build a client from config; `None` when no endpoint is configured.
    pub fn from_config(services: &ServicesConfig) -> Option<Self> {
        if services.analysis_endpoint.is_empty() {
            return None;
        }
        Some(Self {
            client: reqwest::Client::new(),
            endpoint: services.analysis_endpoint.clone(),
            api_key: services.analysis_api_key.clone(),
        })
    }

    pub async fn analyze(&self, transcript: &str) -> AppResult<AiAnalysis> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&AnalysisRequest { text: transcript });
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "analysis service returned {}",
                response.status()
            )));
        }

        Ok(response.json::<AiAnalysis>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_fields_deserialize_partially() {
        // The service may return any subset of fields
        let parsed: AiAnalysis =
            serde_json::from_str(r#"{"product": "cola", "confidence": 0.93}"#).unwrap();
        assert_eq!(parsed.product.as_deref(), Some("cola"));
        assert!(parsed.brand.is_none());
        assert_eq!(parsed.confidence, Some(0.93));
    }

    #[test]
    fn test_unconfigured_endpoint_yields_no_client() {
        let services = ServicesConfig {
            speech_endpoint: String::new(),
            speech_api_key: String::new(),
            analysis_endpoint: String::new(),
            analysis_api_key: String::new(),
        };
        assert!(AnalysisClient::from_config(&services).is_none());
    }
}
