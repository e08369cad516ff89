use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Kind of hardware track a device stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
}

/// One hardware track inside a device stream.
///
/// Disabling mutes the track without releasing the device; stopping releases
/// it for good.
#[derive(Debug)]
pub struct MediaTrack {
    pub id: Uuid,
    pub kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl MediaTrack {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// One acquired hardware media stream (camera or microphone)
pub struct DeviceStream {
    pub kind: TrackKind,
    pub sample_rate: u32,
    tracks: Vec<Arc<MediaTrack>>,
    /// Raw float sample buffers, audio streams only. Taken once by the
    /// audio framer.
    samples: Option<mpsc::Receiver<Vec<f32>>>,
    // Keeps a silent stream's channel open for the lifetime of the stream
    _sample_tx: Option<mpsc::Sender<Vec<f32>>>,
}

impl DeviceStream {
    pub fn video(tracks: Vec<Arc<MediaTrack>>) -> Self {
        Self {
            kind: TrackKind::Video,
            sample_rate: 0,
            tracks,
            samples: None,
            _sample_tx: None,
        }
    }

    pub fn audio(
        tracks: Vec<Arc<MediaTrack>>,
        sample_rate: u32,
        samples: mpsc::Receiver<Vec<f32>>,
        sample_tx: Option<mpsc::Sender<Vec<f32>>>,
    ) -> Self {
        Self {
            kind: TrackKind::Audio,
            sample_rate,
            tracks,
            samples: Some(samples),
            _sample_tx: sample_tx,
        }
    }

    pub fn tracks(&self) -> &[Arc<MediaTrack>] {
        &self.tracks
    }

    pub fn set_tracks_enabled(&self, enabled: bool) {
        for track in &self.tracks {
            track.set_enabled(enabled);
        }
    }

    pub fn stop_tracks(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Take the raw sample receiver (audio streams, once)
    pub fn take_samples(&mut self) -> Option<mpsc::Receiver<Vec<f32>>> {
        self.samples.take()
    }
}

/// Device acquisition backend.
///
/// Opening a stream corresponds to a user permission prompt; an error is a
/// denied permission or hardware failure and must stay recoverable.
#[async_trait::async_trait]
pub trait DeviceBackend: Send + Sync {
    async fn open_video(&self) -> Result<DeviceStream>;

    async fn open_audio(&self) -> Result<DeviceStream>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Backend that grants every request with silent streams.
///
/// Used for headless runs and tests; platform capture backends plug in
/// through the same trait.
pub struct NullBackend {
    sample_rate: u32,
}

impl NullBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

#[async_trait::async_trait]
impl DeviceBackend for NullBackend {
    async fn open_video(&self) -> Result<DeviceStream> {
        Ok(DeviceStream::video(vec![Arc::new(MediaTrack::new(
            TrackKind::Video,
        ))]))
    }

    async fn open_audio(&self) -> Result<DeviceStream> {
        let (tx, rx) = mpsc::channel(16);
        Ok(DeviceStream::audio(
            vec![Arc::new(MediaTrack::new(TrackKind::Audio))],
            self.sample_rate,
            rx,
            Some(tx),
        ))
    }

    fn name(&self) -> &str {
        "null"
    }
}
