// Camera/microphone acquisition and toggling.
//
// Turning a device off mutes its tracks instead of releasing the hardware
// stream, so turning it back on never re-prompts for permission. The stream
// is only requested from the backend the first time a capability is enabled.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use super::backend::{DeviceBackend, DeviceStream, MediaTrack};

pub struct MediaDevices {
    backend: Arc<dyn DeviceBackend>,
    video: Mutex<Option<DeviceStream>>,
    audio: Mutex<Option<DeviceStream>>,
    video_enabled: AtomicBool,
    audio_enabled: AtomicBool,
}

impl MediaDevices {
    pub fn new(backend: Arc<dyn DeviceBackend>) -> Self {
        Self {
            backend,
            video: Mutex::new(None),
            audio: Mutex::new(None),
            video_enabled: AtomicBool::new(false),
            audio_enabled: AtomicBool::new(false),
        }
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled.load(Ordering::SeqCst)
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled.load(Ordering::SeqCst)
    }

    /// Toggle the camera. Idempotent; a failed acquisition leaves the
    /// capability off and the rest of the session running.
    pub async fn set_video_enabled(&self, enabled: bool) -> Result<()> {
        let mut video = self.video.lock().await;

        if !enabled {
            if let Some(stream) = video.as_ref() {
                stream.set_tracks_enabled(false);
            }
            self.video_enabled.store(false, Ordering::SeqCst);
            return Ok(());
        }

        if let Some(stream) = video.as_ref() {
            stream.set_tracks_enabled(true);
            self.video_enabled.store(true, Ordering::SeqCst);
            return Ok(());
        }

        match self.backend.open_video().await {
            Ok(stream) => {
                info!("Camera stream acquired ({} backend)", self.backend.name());
                *video = Some(stream);
                self.video_enabled.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to acquire camera: {}", e);
                self.video_enabled.store(false, Ordering::SeqCst);
                Err(e).context("Failed to acquire camera stream")
            }
        }
    }

    /// Toggle the microphone, same contract as the camera toggle
    pub async fn set_audio_enabled(&self, enabled: bool) -> Result<()> {
        let mut audio = self.audio.lock().await;

        if !enabled {
            if let Some(stream) = audio.as_ref() {
                stream.set_tracks_enabled(false);
            }
            self.audio_enabled.store(false, Ordering::SeqCst);
            return Ok(());
        }

        if let Some(stream) = audio.as_ref() {
            stream.set_tracks_enabled(true);
            self.audio_enabled.store(true, Ordering::SeqCst);
            return Ok(());
        }

        match self.backend.open_audio().await {
            Ok(stream) => {
                info!(
                    "Microphone stream acquired ({}Hz, {} backend)",
                    stream.sample_rate,
                    self.backend.name()
                );
                *audio = Some(stream);
                self.audio_enabled.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to acquire microphone: {}", e);
                self.audio_enabled.store(false, Ordering::SeqCst);
                Err(e).context("Failed to acquire microphone stream")
            }
        }
    }

    /// Take the microphone's raw sample feed for the audio framer.
    ///
    /// Returns the source sample rate alongside the receiver. None if the
    /// microphone was never acquired or the feed was already taken.
    pub async fn take_audio_samples(&self) -> Option<(u32, mpsc::Receiver<Vec<f32>>)> {
        let mut audio = self.audio.lock().await;
        let stream = audio.as_mut()?;
        let rate = stream.sample_rate;
        stream.take_samples().map(|rx| (rate, rx))
    }

    /// Clone the microphone track handles, for mixing into a recording
    pub async fn audio_tracks(&self) -> Vec<Arc<MediaTrack>> {
        let audio = self.audio.lock().await;
        audio
            .as_ref()
            .map(|s| s.tracks().to_vec())
            .unwrap_or_default()
    }

    /// Stop every acquired track and release the streams.
    ///
    /// Runs on session end and component teardown; after this no device
    /// handle is held.
    pub async fn teardown(&self) {
        if let Some(stream) = self.video.lock().await.take() {
            stream.stop_tracks();
        }
        if let Some(stream) = self.audio.lock().await.take() {
            stream.stop_tracks();
        }
        self.video_enabled.store(false, Ordering::SeqCst);
        self.audio_enabled.store(false, Ordering::SeqCst);
        info!("Media devices released");
    }
}
