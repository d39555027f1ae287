//! # AI-Assisted Capture Handler
//!
//! `POST /capture/audio` — multipart upload of a recorded clip in whatever
//! format the client produced. The handler:
//!
//! 1. normalizes the clip to canonical 16 kHz PCM WAV (the one
//!    CPU-bound step, run on the blocking pool)
//! 2. stores the canonical WAV in the media store
//! 3. forwards it to the speech service and the transcript to the
//!    analysis service, when those are configured
//! 4. returns a draft consumption log for the client to confirm
//!
//! The conversion is all-or-nothing: an undecodable upload is a 400 and
//! nothing is stored.

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt as _;
use serde_json::json;
use tracing::{info, warn};

use crate::audio::convert_to_canonical_wav;
use crate::audio::wav::WavHeader;
use crate::auth;
use crate::error::{AppError, AppResult};
use crate::handlers::logs::points_for_log;
use crate::media::MediaStore;
use crate::services::{AnalysisClient, SpeechClient};
use crate::state::AppState;

pub async fn capture_audio(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let user = auth::authenticate(&req, &state).await?;

    state.increment_active_captures();
    let result = process_capture(&state, &user.id, payload).await;
    state.decrement_active_captures();
    result
}

async fn process_capture(
    state: &AppState,
    user_id: &str,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let config = state.get_config();
    let raw = read_audio_field(payload, config.audio.max_upload_bytes).await?;
    info!(user_id = %user_id, bytes = raw.len(), "capture upload received");

    // Decode + resample + encode is CPU-bound; keep it off the reactor.
    let target_rate = config.audio.target_sample_rate;
    let wav = web::block(move || convert_to_canonical_wav(&raw, target_rate))
        .await
        .map_err(|e| AppError::Internal(format!("conversion task failed: {e}")))?
        .map_err(AppError::from)?;

    let header = WavHeader::parse(&wav).map_err(|e| {
        AppError::Internal(format!("normalizer produced an unparseable WAV: {e}"))
    })?;

    let store = MediaStore::new(&config.media.dir);
    let media_url = store.store(&wav, "wav").await?;

    // Pass-throughs are best-effort: a down service degrades the draft,
    // it does not fail the upload.
    let transcript = match SpeechClient::from_config(&config.services) {
        Some(client) => match client.transcribe(wav).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "speech service call failed");
                None
            }
        },
        None => None,
    };

    let analysis = match (&transcript, AnalysisClient::from_config(&config.services)) {
        (Some(text), Some(client)) => match client.analyze(text).await {
            Ok(fields) => Some(fields),
            Err(e) => {
                warn!(error = %e, "analysis service call failed");
                None
            }
        },
        _ => None,
    };

    let suggested_points = points_for_log(&config.points, "audio");

    Ok(HttpResponse::Ok().json(json!({
        "media_url": media_url,
        "media_type": "audio/wav",
        "capture_method": "audio",
        "audio": {
            "sample_rate": header.sample_rate,
            "channels": header.channels,
            "duration_seconds": header.duration_seconds()
        },
        "transcript": transcript,
        "analysis": analysis,
        "suggested_points": suggested_points
    })))
}

/// Pull the `audio` file field out of the multipart body, enforcing the
/// configured size cap as chunks arrive.
async fn read_audio_field(mut payload: Multipart, max_bytes: usize) -> AppResult<Vec<u8>> {
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("invalid multipart payload: {e}")))?;
        if field.name() != Some("audio") {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::BadRequest(format!(
                    "audio upload exceeds {max_bytes} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(AppError::BadRequest("audio field is empty".to_string()));
        }
        return Ok(bytes);
    }

    Err(AppError::BadRequest(
        "multipart body must contain an 'audio' file field".to_string(),
    ))
}
