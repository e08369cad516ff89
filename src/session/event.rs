// Wire messages exchanged with the interview service.

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Inbound event from the interview service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new interviewer question, with the score awarded for the previous
    /// answer and the sequence number of this exchange
    Question {
        question: String,
        score: i64,
        seq: i64,
        /// Synthesized speech for the question, when the service inlines it
        tts: Option<Vec<u8>>,
    },
    /// Standalone synthesized speech, sent as a raw binary frame
    Audio(Vec<u8>),
}

#[derive(Debug, Deserialize)]
struct RawSessionMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    question: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default = "default_seq")]
    seq: i64,
    tts: Option<String>,
}

fn default_seq() -> i64 {
    -1
}

impl SessionEvent {
    /// Parse one text message from the interview service.
    ///
    /// Returns None for messages that are well-formed JSON but not a
    /// question (unknown type, or a question with empty text); those are
    /// ignored without tearing the connection down.
    pub fn parse(payload: &str) -> Result<Option<Self>> {
        let raw: RawSessionMessage = serde_json::from_str(payload)?;

        if raw.kind.as_deref() != Some("QUESTION") {
            return Ok(None);
        }

        let question = match raw.question {
            Some(q) if !q.is_empty() => q,
            _ => return Ok(None),
        };

        let tts = raw.tts.and_then(|encoded| match BASE64.decode(&encoded) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                // The question itself is still usable without its audio
                warn!("Discarding undecodable inline speech payload: {}", e);
                None
            }
        });

        Ok(Some(SessionEvent::Question {
            question,
            score: raw.score,
            seq: raw.seq,
            tts,
        }))
    }
}

/// Outbound answer frame
#[derive(Debug, Clone, Serialize)]
pub struct AnswerFrame {
    pub seq: i64,
    pub answer: String,
}

impl AnswerFrame {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
