// Screen recording of the interview.
//
// Chunks from the capture backend accumulate in memory until the recording
// stops, then the buffer is written out as a single file. Stopping is
// idempotent, and a capture revoked at the source (screen share ended)
// converges on the same stopped state.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::capture::{CapturePrefs, DisplayCapture, RecordingChunk};
use crate::media::MediaTrack;

/// Recorder output settings
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    /// Directory recordings are saved into
    pub output_dir: PathBuf,
    /// Filename prefix, e.g. "interview"
    pub file_prefix: String,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            file_prefix: "interview".to_string(),
        }
    }
}

pub struct ScreenRecorder {
    backend: Arc<dyn DisplayCapture>,
    prefs: CapturePrefs,
    settings: RecorderSettings,
    is_recording: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    mime_type: Mutex<Option<String>>,
    buffer: Arc<Mutex<Vec<RecordingChunk>>>,
    stop_signal: Mutex<Option<oneshot::Sender<()>>>,
    collector: Mutex<Option<JoinHandle<()>>>,
}

impl ScreenRecorder {
    pub fn new(
        backend: Arc<dyn DisplayCapture>,
        prefs: CapturePrefs,
        settings: RecorderSettings,
    ) -> Self {
        Self {
            backend,
            prefs,
            settings,
            is_recording: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            mime_type: Mutex::new(None),
            buffer: Arc::new(Mutex::new(Vec::new())),
            stop_signal: Mutex::new(None),
            collector: Mutex::new(None),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    /// Pick the first preferred container/codec the backend supports
    fn negotiate_mime(&self) -> Result<String> {
        self.prefs
            .mime_candidates
            .iter()
            .find(|mime| self.backend.supports(mime))
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Capture backend '{}' supports none of the preferred formats",
                    self.backend.name()
                )
            })
    }

    /// Start recording the display, optionally mixing the microphone in.
    ///
    /// A microphone that fails to mix leaves the recording running
    /// video-only rather than failing the start.
    pub async fn start(&self, mic_tracks: Option<Vec<Arc<MediaTrack>>>) -> Result<()> {
        if self.is_recording.swap(true, Ordering::SeqCst) {
            warn!("Recording already in progress");
            return Ok(());
        }

        let mime = match self.negotiate_mime() {
            Ok(mime) => mime,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let mut handle = match self.backend.start(&mime, &self.prefs).await {
            Ok(handle) => handle,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(e).context("Failed to start display capture");
            }
        };

        info!(
            "Screen recording started: {} ({} backend)",
            handle.mime_type,
            self.backend.name()
        );

        if let Some(tracks) = mic_tracks {
            if !tracks.is_empty() {
                if let Err(e) = self.backend.mix_microphone(&tracks).await {
                    warn!("Microphone mix failed, recording video only: {}", e);
                }
            }
        }

        *self.mime_type.lock().await = Some(handle.mime_type.clone());
        *self.stop_signal.lock().await = handle.stop.take();
        self.stop_requested.store(false, Ordering::SeqCst);
        self.buffer.lock().await.clear();

        let buffer = Arc::clone(&self.buffer);
        let recording = Arc::clone(&self.is_recording);
        let requested = Arc::clone(&self.stop_requested);
        let settings = self.settings.clone();
        let mime = handle.mime_type.clone();
        let mut chunks = handle.chunks;
        let collector = tokio::spawn(async move {
            while let Some(chunk) = chunks.recv().await {
                buffer.lock().await.push(chunk);
            }

            // The stream ending without a stop request means the capture was
            // revoked at the source (the user ended the screen share). That
            // runs the same save routine an explicit stop runs, before the
            // recorder reports itself stopped.
            if !requested.load(Ordering::SeqCst) {
                warn!("Screen capture ended at the source, saving what was recorded");
                if let Err(e) = save_buffered(&buffer, &mime, &settings).await {
                    error!("Failed to save revoked recording: {}", e);
                }
            }
            recording.store(false, Ordering::SeqCst);
        });
        *self.collector.lock().await = Some(collector);

        Ok(())
    }

    /// Stop recording and save the buffered capture.
    ///
    /// Returns the saved file path, or None when nothing was captured.
    /// Calling stop on an already-stopped recorder is a silent no-op. A
    /// capture revoked at the source has already run the save routine, so a
    /// stop after revocation finds an empty buffer and saves nothing more.
    pub async fn stop(&self) -> Result<Option<PathBuf>> {
        let collector = self.collector.lock().await.take();
        let Some(collector) = collector else {
            return Ok(None);
        };

        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(stop) = self.stop_signal.lock().await.take() {
            let _ = stop.send(());
        }

        if let Err(e) = collector.await {
            error!("Chunk collector panicked: {}", e);
        }
        self.is_recording.store(false, Ordering::SeqCst);

        let mime = self.mime_type.lock().await.clone().unwrap_or_default();
        save_buffered(&self.buffer, &mime, &self.settings).await
    }
}

/// Write the buffered chunks out as one file and clear the buffer.
///
/// Shared by the explicit stop path and the revocation path in the
/// collector task, so both converge on identical save behavior.
async fn save_buffered(
    buffer: &Mutex<Vec<RecordingChunk>>,
    mime: &str,
    settings: &RecorderSettings,
) -> Result<Option<PathBuf>> {
    let chunks = {
        let mut buffer = buffer.lock().await;
        std::mem::take(&mut *buffer)
    };

    if chunks.is_empty() {
        info!("No recording data captured, nothing to save");
        return Ok(None);
    }

    let extension = extension_for_mime(mime);
    let timestamp = Utc::now().format("%Y-%m-%d-%H-%M-%S");
    let filename = format!("{}-{}.{}", settings.file_prefix, timestamp, extension);
    let path = settings.output_dir.join(filename);

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .context("Failed to create recording output directory")?;

    let total: usize = chunks.iter().map(|c| c.data.len()).sum();
    let mut data = Vec::with_capacity(total);
    for chunk in &chunks {
        data.extend_from_slice(&chunk.data);
    }

    tokio::fs::write(&path, &data)
        .await
        .with_context(|| format!("Failed to write recording: {}", path.display()))?;

    info!(
        "Recording saved: {} ({} bytes, {} chunks)",
        path.display(),
        total,
        chunks.len()
    );
    Ok(Some(path))
}

fn extension_for_mime(mime: &str) -> &'static str {
    let container = mime.split(';').next().unwrap_or(mime);
    match container {
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}
