use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of an interview session, serializable for logging and for the
/// attempt summary shown after the interview ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Unique id for this interview attempt
    pub attempt_id: Uuid,

    /// Position the candidate is interviewing for
    pub position: String,

    /// Whether the interview connection is currently open
    pub connected: bool,

    /// When the session coordinator started
    pub started_at: DateTime<Utc>,

    /// Seconds since the interview connection opened
    pub duration_secs: f64,

    /// Number of questions received
    pub questions_received: usize,

    /// Number of answers sent
    pub answers_sent: usize,

    /// Accumulated score across answered questions
    pub score: i64,

    /// Whether a screen recording is in progress
    pub is_recording: bool,
}
