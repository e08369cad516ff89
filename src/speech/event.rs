use anyhow::{bail, Result};
use serde::Deserialize;

/// Recognition result from the speech service.
///
/// The service tags results with `status`; older deployments send a bare
/// `{text}` which is treated as an interim result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Partial result, replaces the previous interim text wholesale
    Interim(String),
    /// Finalized segment, appended to the running transcript
    Final(String),
}

#[derive(Debug, Deserialize)]
struct RawSpeechMessage {
    status: Option<String>,
    text: Option<String>,
}

impl SpeechEvent {
    /// Parse one incoming recognition message.
    ///
    /// Errors here are per-message: the caller logs and keeps the
    /// connection alive.
    pub fn parse(payload: &str) -> Result<Self> {
        let raw: RawSpeechMessage = serde_json::from_str(payload)?;

        match raw.status.as_deref() {
            Some("INTERIM") => Ok(SpeechEvent::Interim(raw.text.unwrap_or_default())),
            Some("FINAL") => Ok(SpeechEvent::Final(raw.text.unwrap_or_default())),
            _ => match raw.text {
                // Legacy responses carry no status field
                Some(text) => Ok(SpeechEvent::Interim(text)),
                None => bail!("speech message has neither status nor text"),
            },
        }
    }
}

/// End-of-stream control frame sent before closing the recognition socket
pub fn end_command() -> String {
    "{\"command\":\"end\"}".to_string()
}
