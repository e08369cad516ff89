// The session coordinator wires every component of a live interview
// together: device capture feeding the recognition socket, the interview
// socket driving the conversation state, synthesized speech playback, and
// the screen recorder.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::event::SessionEvent;
use super::state::InterviewState;
use super::stats::SessionStats;
use super::transport::{SessionSignal, SessionTransport};
use crate::audio::AudioFramer;
use crate::media::MediaDevices;
use crate::recording::ScreenRecorder;
use crate::speech::{SpeechPlayback, SpeechTransport, TranscriptState};

/// Opening lines seeded into the transcript before the first question
pub const GREETING: &[&str] = &[
    "Welcome to your mock interview.",
    "I'll ask a series of questions; answer by voice or text.",
];

pub struct SessionCoordinator {
    devices: Arc<MediaDevices>,
    speech: Arc<SpeechTransport>,
    session: Arc<SessionTransport>,
    recorder: Arc<ScreenRecorder>,
    playback: Arc<SpeechPlayback>,

    state: Arc<Mutex<InterviewState>>,
    transcript: Arc<Mutex<TranscriptState>>,

    attempt_id: Uuid,
    position: String,
    started_at: DateTime<Utc>,
    questions_received: Arc<AtomicUsize>,
    answers_sent: AtomicUsize,
    connection_lost: Arc<AtomicBool>,

    event_task: Mutex<Option<JoinHandle<()>>>,
    speech_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionCoordinator {
    pub fn new(
        devices: Arc<MediaDevices>,
        speech: Arc<SpeechTransport>,
        session: Arc<SessionTransport>,
        recorder: Arc<ScreenRecorder>,
        playback: Arc<SpeechPlayback>,
    ) -> Self {
        Self {
            devices,
            speech,
            session,
            recorder,
            playback,
            state: Arc::new(Mutex::new(InterviewState::with_greeting(GREETING))),
            transcript: Arc::new(Mutex::new(TranscriptState::new())),
            attempt_id: Uuid::new_v4(),
            position: "general".to_string(),
            started_at: Utc::now(),
            questions_received: Arc::new(AtomicUsize::new(0)),
            answers_sent: AtomicUsize::new(0),
            connection_lost: Arc::new(AtomicBool::new(false)),
            event_task: Mutex::new(None),
            speech_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Set the position this attempt interviews for
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn state(&self) -> Arc<Mutex<InterviewState>> {
        Arc::clone(&self.state)
    }

    pub fn transcript(&self) -> Arc<Mutex<TranscriptState>> {
        Arc::clone(&self.transcript)
    }

    pub fn connection_lost(&self) -> bool {
        self.connection_lost.load(Ordering::SeqCst)
    }

    /// Connect to the interview service and start pumping its events into
    /// the conversation state.
    pub async fn start(&self) -> Result<()> {
        let Some(mut signals) = self.session.start().await? else {
            return Ok(());
        };

        let state = Arc::clone(&self.state);
        let playback = Arc::clone(&self.playback);
        let questions = Arc::clone(&self.questions_received);
        let lost = Arc::clone(&self.connection_lost);

        let task = tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                match signal {
                    SessionSignal::Event(SessionEvent::Question {
                        question,
                        score,
                        seq,
                        tts,
                    }) => {
                        info!("Question {} received (score +{})", seq, score);
                        state.lock().await.apply_question(&question, score, seq);
                        questions.fetch_add(1, Ordering::SeqCst);

                        if let Some(payload) = tts {
                            playback.play_payload(payload).await;
                        }
                    }
                    SessionSignal::Event(SessionEvent::Audio(payload)) => {
                        playback.play_payload(payload).await;
                    }
                    SessionSignal::Closed { normal } => {
                        if !normal {
                            lost.store(true, Ordering::SeqCst);
                        }
                        break;
                    }
                }
            }
        });

        *self.event_task.lock().await = Some(task);
        Ok(())
    }

    /// Enable the microphone and start streaming speech recognition.
    ///
    /// Recognition failing to connect is a degraded mode, the interview
    /// continues with typed answers only.
    pub async fn start_speech(&self) -> Result<()> {
        self.devices
            .set_audio_enabled(true)
            .await
            .context("Microphone is required for voice answers")?;

        let (source_rate, samples) = self
            .devices
            .take_audio_samples()
            .await
            .ok_or_else(|| anyhow::anyhow!("Microphone sample feed unavailable"))?;

        let events = match self.speech.start().await {
            Ok(Some(events)) => events,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Speech recognition unavailable, falling back to typed answers: {}", e);
                return Ok(());
            }
        };

        let framer = AudioFramer::new(source_rate);
        let pump = framer.pump(samples, Arc::clone(&self.speech));

        let transcript = Arc::clone(&self.transcript);
        let mut events = events;
        let fold = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                transcript.lock().await.apply(&event);
            }
        });

        let mut tasks = self.speech_tasks.lock().await;
        tasks.push(pump);
        tasks.push(fold);
        Ok(())
    }

    /// Send the candidate's answer for the current question.
    ///
    /// Rejected before the first question arrives and when the connection
    /// is not open. The answer lands in the conversation transcript and the
    /// recognition transcript resets for the next question.
    pub async fn send_answer(&self, answer: &str) -> Result<()> {
        let seq = {
            let state = self.state.lock().await;
            if !state.question_received() {
                anyhow::bail!("No question to answer yet");
            }
            state.next_seq()
        };

        self.session.send_answer(seq, answer).await?;

        self.state.lock().await.record_answer(answer);
        self.transcript.lock().await.clear();
        self.answers_sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Start recording the screen, mixing the microphone when available
    pub async fn start_recording(&self) -> Result<()> {
        let mic = self.devices.audio_tracks().await;
        let mic = if mic.is_empty() { None } else { Some(mic) };
        self.recorder.start(mic).await
    }

    /// End the interview and release everything.
    ///
    /// While a recording is running the caller must pass `confirmed` to
    /// acknowledge it will be stopped and saved.
    pub async fn end(&self, confirmed: bool) -> Result<SessionStats> {
        if self.recorder.is_recording() && !confirmed {
            anyhow::bail!("A recording is in progress; confirm to stop and save it");
        }

        info!("Ending interview session");

        match self.recorder.stop().await {
            Ok(Some(path)) => info!("Interview recording saved to {}", path.display()),
            Ok(None) => {}
            Err(e) => error!("Failed to save interview recording: {}", e),
        }

        self.speech.stop().await;
        for task in self.speech_tasks.lock().await.drain(..) {
            task.abort();
        }

        self.session.close().await;
        if let Some(task) = self.event_task.lock().await.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("Session event task panicked: {}", e);
                }
            }
        }

        self.playback.teardown().await;
        self.devices.teardown().await;

        let stats = self.stats().await;
        info!(
            "Interview ended: {} questions, {} answers, score {}",
            stats.questions_received, stats.answers_sent, stats.score
        );
        Ok(stats)
    }

    pub async fn stats(&self) -> SessionStats {
        let duration_secs = self
            .session
            .elapsed()
            .await
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        SessionStats {
            attempt_id: self.attempt_id,
            position: self.position.clone(),
            connected: self.session.is_open(),
            started_at: self.started_at,
            duration_secs,
            questions_received: self.questions_received.load(Ordering::SeqCst),
            answers_sent: self.answers_sent.load(Ordering::SeqCst),
            score: self.state.lock().await.score(),
            is_recording: self.recorder.is_recording(),
        }
    }
}
