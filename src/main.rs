use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use interview_session::session::coordinator::SessionCoordinator;
use interview_session::speech::WavFileSink;
use interview_session::{
    Config, MediaDevices, NullBackend, NullCapture, ScreenRecorder, SessionTransport,
    SpeechPlayback, SpeechTransport,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "interview-session", about = "Mock interview session runner")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(short, long, default_value = "config/interview-session")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Interview Session v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Speech service: {}", cfg.speech.url);
    info!("Interview service: {}", cfg.session.url);
    info!("Recordings directory: {}", cfg.recording.output_dir);

    let devices = Arc::new(MediaDevices::new(Arc::new(NullBackend::new(48_000))));
    let speech = Arc::new(SpeechTransport::new(cfg.speech_settings()));
    let session = Arc::new(SessionTransport::new(cfg.session_settings()));
    let recorder = Arc::new(ScreenRecorder::new(
        Arc::new(NullCapture),
        cfg.capture_prefs(),
        cfg.recorder_settings(),
    ));
    let playback = Arc::new(SpeechPlayback::new(Arc::new(WavFileSink::new(
        &cfg.playback.output_dir,
    ))));

    let coordinator = SessionCoordinator::new(devices, speech, session, recorder, playback)
        .with_position(cfg.attempt.position.clone());

    coordinator.start().await?;
    if let Err(e) = coordinator.start_speech().await {
        warn!("Voice input unavailable: {}", e);
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    let stats = coordinator.end(true).await?;
    info!(
        "Session summary: {} questions, {} answers, score {}",
        stats.questions_received, stats.answers_sent, stats.score
    );

    Ok(())
}
