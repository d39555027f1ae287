//! Pass-through clients for the external AI services. Nothing here does
//! inference locally; both clients POST to configured HTTP endpoints and
//! return the service's answer as-is.

pub mod analysis;
pub mod speech;

pub use analysis::{AiAnalysis, AnalysisClient};
pub use speech::SpeechClient;
