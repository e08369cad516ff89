// Display capture backend abstraction.
//
// A capture backend produces an encoded video stream in timed chunks and
// can mix live microphone tracks into it. The recorder negotiates the
// container/codec by probing the backend's support list in preference
// order.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::media::MediaTrack;

/// One encoded chunk of the capture stream
#[derive(Debug, Clone)]
pub struct RecordingChunk {
    pub data: Vec<u8>,
    pub timestamp_ms: u64,
}

/// Capture preferences
#[derive(Debug, Clone)]
pub struct CapturePrefs {
    /// Container/codec candidates, most preferred first
    pub mime_candidates: Vec<String>,
    /// How often the backend flushes an encoded chunk
    pub chunk_interval: Duration,
    /// Target video bitrate in bits per second
    pub video_bitrate: u32,
}

impl Default for CapturePrefs {
    fn default() -> Self {
        Self {
            mime_candidates: vec![
                "video/webm;codecs=vp9".to_string(),
                "video/webm;codecs=vp8".to_string(),
                "video/webm".to_string(),
            ],
            chunk_interval: Duration::from_millis(500),
            video_bitrate: 2_500_000,
        }
    }
}

/// Live capture stream handed to the recorder.
///
/// The chunk channel closing without a stop signal means the capture was
/// revoked at the source (e.g. the user ended the screen share).
pub struct CaptureHandle {
    /// The negotiated container/codec actually in use
    pub mime_type: String,
    pub chunks: mpsc::Receiver<RecordingChunk>,
    /// Fired by the recorder to end the capture; the backend responds by
    /// flushing and closing the chunk channel
    pub stop: Option<oneshot::Sender<()>>,
}

#[async_trait]
pub trait DisplayCapture: Send + Sync {
    /// Whether this backend can encode the given container/codec
    fn supports(&self, mime_type: &str) -> bool;

    /// Begin capturing the display with the given negotiated mime type
    async fn start(&self, mime_type: &str, prefs: &CapturePrefs) -> Result<CaptureHandle>;

    /// Mix live microphone tracks into the capture stream.
    ///
    /// Failure here leaves the capture running video-only.
    async fn mix_microphone(&self, _tracks: &[Arc<MediaTrack>]) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Backend that captures nothing, for headless runs and tests. It accepts
/// every webm variant and emits no chunks until stopped.
pub struct NullCapture;

#[async_trait]
impl DisplayCapture for NullCapture {
    fn supports(&self, mime_type: &str) -> bool {
        mime_type.starts_with("video/webm")
    }

    async fn start(&self, mime_type: &str, _prefs: &CapturePrefs) -> Result<CaptureHandle> {
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel();

        tokio::spawn(async move {
            // Hold the sender open until the recorder stops us
            let _tx = tx;
            let _ = stop_rx.await;
        });

        Ok(CaptureHandle {
            mime_type: mime_type.to_string(),
            chunks: rx,
            stop: Some(stop_tx),
        })
    }

    fn name(&self) -> &str {
        "null"
    }
}
