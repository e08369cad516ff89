use super::event::SpeechEvent;

/// Running transcript assembled from recognition events.
///
/// `final_text` is append-only; `interim_text` previews the segment still
/// being recognized and is cleared by the FINAL event that supersedes it.
/// The displayed text is always `final_text + interim_text`.
#[derive(Debug, Clone, Default)]
pub struct TranscriptState {
    final_text: String,
    interim_text: String,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one recognition event into the transcript
    pub fn apply(&mut self, event: &SpeechEvent) {
        match event {
            SpeechEvent::Interim(text) => {
                self.interim_text = text.clone();
            }
            SpeechEvent::Final(text) => {
                self.final_text.push_str(text);
                self.final_text.push(' ');
                self.interim_text.clear();
            }
        }
    }

    pub fn final_text(&self) -> &str {
        &self.final_text
    }

    pub fn interim_text(&self) -> &str {
        &self.interim_text
    }

    /// Text shown to the user at this instant
    pub fn display(&self) -> String {
        format!("{}{}", self.final_text, self.interim_text)
    }

    /// Reset both buffers, e.g. after the answer is sent
    pub fn clear(&mut self) {
        self.final_text.clear();
        self.interim_text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interim_replaced_then_finalized() {
        let mut transcript = TranscriptState::new();

        transcript.apply(&SpeechEvent::Interim("hel".to_string()));
        assert_eq!(transcript.display(), "hel");

        transcript.apply(&SpeechEvent::Interim("hello".to_string()));
        assert_eq!(transcript.display(), "hello");

        transcript.apply(&SpeechEvent::Final("hello world".to_string()));
        assert_eq!(transcript.display(), "hello world ");
        assert_eq!(transcript.interim_text(), "");
    }

    #[test]
    fn test_final_segments_accumulate() {
        let mut transcript = TranscriptState::new();

        transcript.apply(&SpeechEvent::Final("first".to_string()));
        transcript.apply(&SpeechEvent::Interim("sec".to_string()));
        assert_eq!(transcript.display(), "first sec");

        transcript.apply(&SpeechEvent::Final("second".to_string()));
        assert_eq!(transcript.display(), "first second ");
    }

    #[test]
    fn test_clear_resets_both_buffers() {
        let mut transcript = TranscriptState::new();
        transcript.apply(&SpeechEvent::Final("done".to_string()));
        transcript.apply(&SpeechEvent::Interim("more".to_string()));

        transcript.clear();
        assert_eq!(transcript.display(), "");
    }
}
