// Conversation and scoring state for one interview attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub content: String,
    /// True for interviewer messages, false for the candidate's answers
    pub is_ai: bool,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_ai: true,
            timestamp: Utc::now(),
        }
    }

    pub fn candidate(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_ai: false,
            timestamp: Utc::now(),
        }
    }
}

/// Messages sharing a minute are grouped under one timestamp label
#[derive(Debug, Clone)]
pub struct MessageGroup {
    pub label: String,
    pub messages: Vec<ConversationMessage>,
}

/// Interview progress: the transcript, the running score, and the sequence
/// number of the last question received.
///
/// Questions carry the server's sequence number; the answer to question N
/// is sent as N + 1. Before any question arrives `last_seq` is -1 and
/// answering is rejected.
#[derive(Debug, Clone)]
pub struct InterviewState {
    messages: Vec<ConversationMessage>,
    score: i64,
    last_seq: i64,
}

impl Default for InterviewState {
    fn default() -> Self {
        Self::new()
    }
}

impl InterviewState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            score: 0,
            last_seq: -1,
        }
    }

    /// Seed the transcript with the interviewer's greeting
    pub fn with_greeting(greeting: &[&str]) -> Self {
        let mut state = Self::new();
        for line in greeting {
            state.messages.push(ConversationMessage::ai(*line));
        }
        state
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn last_seq(&self) -> i64 {
        self.last_seq
    }

    pub fn question_received(&self) -> bool {
        self.last_seq >= 0
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Fold one question event into the state.
    ///
    /// The sequence number is updated first, then the score for the
    /// previous answer is added, then the question joins the transcript.
    /// A caller observing the transcript grow therefore always sees the
    /// matching seq and score already in place.
    pub fn apply_question(&mut self, question: &str, score: i64, seq: i64) {
        self.last_seq = seq;
        self.score += score;
        self.messages.push(ConversationMessage::ai(question));
    }

    /// Sequence number the next answer must carry
    pub fn next_seq(&self) -> i64 {
        self.last_seq + 1
    }

    /// Record the candidate's sent answer in the transcript
    pub fn record_answer(&mut self, answer: &str) {
        self.messages.push(ConversationMessage::candidate(answer));
    }

    /// Transcript grouped by minute, the way the conversation is displayed
    pub fn grouped_messages(&self) -> Vec<MessageGroup> {
        let mut groups: Vec<MessageGroup> = Vec::new();

        for message in &self.messages {
            let label = message.timestamp.format("%H:%M").to_string();
            match groups.last_mut() {
                Some(group) if group.label == label => group.messages.push(message.clone()),
                _ => groups.push(MessageGroup {
                    label,
                    messages: vec![message.clone()],
                }),
            }
        }

        groups
    }
}
