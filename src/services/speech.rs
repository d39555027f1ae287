//! Speech-to-text pass-through.
//!
//! POSTs the canonical WAV produced by the normalizer to the configured
//! recognition endpoint and returns the transcript. Expected response body:
//! `{ "text": "..." }`.

use serde::Deserialize;

use crate::config::ServicesConfig;
use crate::error::{AppError, AppResult};

pub struct SpeechClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    text: String,
}

impl SpeechClient {
    /// Build a client from config; `None` when no endpoint is configured.
    pub fn from_config(services: &ServicesConfig) -> Option<Self> {
        if services.speech_endpoint.is_empty() {
            return None;
        }
        Some(Self {
            client: reqwest::Client::new(),
            endpoint: services.speech_endpoint.clone(),
            api_key: services.speech_api_key.clone(),
        })
    }

    /// Submit a canonical 16 kHz PCM WAV and return the transcript.
    pub async fn transcribe(&self, wav: Vec<u8>) -> AppResult<String> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "audio/wav")
            .body(wav);
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "speech service returned {}",
                response.status()
            )));
        }

        let body: TranscriptResponse = response.json().await?;
        Ok(body.text)
    }
}
