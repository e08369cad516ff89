use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::recording::{CapturePrefs, RecorderSettings};
use crate::session::SessionSettings;
use crate::speech::SpeechSettings;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub speech: SpeechConfig,
    pub session: SessionConfig,
    pub recording: RecordingConfig,
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub attempt: AttemptConfig,
}

#[derive(Debug, Deserialize)]
pub struct AttemptConfig {
    /// Position the candidate interviews for
    pub position: String,
}

impl Default for AttemptConfig {
    fn default() -> Self {
        Self {
            position: "general".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechConfig {
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_end_grace_ms")]
    pub end_grace_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    pub output_dir: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: u64,
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: u32,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    /// Where utterances land when no playback device is attached
    pub output_dir: String,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_end_grace_ms() -> u64 {
    300
}

fn default_file_prefix() -> String {
    "interview".to_string()
}

fn default_chunk_interval_ms() -> u64 {
    500
}

fn default_video_bitrate() -> u32 {
    2_500_000
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn speech_settings(&self) -> SpeechSettings {
        SpeechSettings {
            url: self.speech.url.clone(),
            connect_timeout: Duration::from_millis(self.speech.connect_timeout_ms),
            end_grace: Duration::from_millis(self.speech.end_grace_ms),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            url: self.session.url.clone(),
            token: self.session.token.clone(),
        }
    }

    pub fn recorder_settings(&self) -> RecorderSettings {
        RecorderSettings {
            output_dir: self.recording.output_dir.clone().into(),
            file_prefix: self.recording.file_prefix.clone(),
        }
    }

    pub fn capture_prefs(&self) -> CapturePrefs {
        CapturePrefs {
            chunk_interval: Duration::from_millis(self.recording.chunk_interval_ms),
            video_bitrate: self.recording.video_bitrate,
            ..CapturePrefs::default()
        }
    }
}
