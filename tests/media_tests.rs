// Integration tests for camera/microphone acquisition and toggling.
//
// Toggling a device off must mute it without releasing the stream, so the
// backend is only asked for a stream once per capability.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use interview_session::media::backend::{DeviceBackend, DeviceStream, MediaTrack, TrackKind};
use interview_session::MediaDevices;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Backend that counts stream acquisitions
#[derive(Default)]
struct CountingBackend {
    video_opens: AtomicUsize,
    audio_opens: AtomicUsize,
}

#[async_trait]
impl DeviceBackend for CountingBackend {
    async fn open_video(&self) -> Result<DeviceStream> {
        self.video_opens.fetch_add(1, Ordering::SeqCst);
        Ok(DeviceStream::video(vec![Arc::new(MediaTrack::new(
            TrackKind::Video,
        ))]))
    }

    async fn open_audio(&self) -> Result<DeviceStream> {
        self.audio_opens.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(4);
        Ok(DeviceStream::audio(
            vec![Arc::new(MediaTrack::new(TrackKind::Audio))],
            44_100,
            rx,
            Some(tx),
        ))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Backend that denies every request, like a user rejecting the permission
/// prompt
struct DenyingBackend;

#[async_trait]
impl DeviceBackend for DenyingBackend {
    async fn open_video(&self) -> Result<DeviceStream> {
        Err(anyhow!("permission denied"))
    }

    async fn open_audio(&self) -> Result<DeviceStream> {
        Err(anyhow!("permission denied"))
    }

    fn name(&self) -> &str {
        "denying"
    }
}

#[tokio::test]
async fn test_reenabling_video_does_not_reacquire() -> Result<()> {
    let backend = Arc::new(CountingBackend::default());
    let devices = MediaDevices::new(backend.clone());

    devices.set_video_enabled(true).await?;
    assert!(devices.video_enabled());
    assert_eq!(backend.video_opens.load(Ordering::SeqCst), 1);

    devices.set_video_enabled(false).await?;
    assert!(!devices.video_enabled());

    // Re-enabling reuses the held stream, no second acquisition
    devices.set_video_enabled(true).await?;
    assert!(devices.video_enabled());
    assert_eq!(backend.video_opens.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_disabling_mutes_tracks_without_stopping() -> Result<()> {
    let backend = Arc::new(CountingBackend::default());
    let devices = MediaDevices::new(backend);

    devices.set_audio_enabled(true).await?;
    let tracks = devices.audio_tracks().await;
    assert_eq!(tracks.len(), 1);
    assert!(tracks[0].is_enabled());

    devices.set_audio_enabled(false).await?;
    assert!(!tracks[0].is_enabled());
    assert!(!tracks[0].is_stopped(), "muting must not stop the track");

    devices.set_audio_enabled(true).await?;
    assert!(tracks[0].is_enabled());

    Ok(())
}

#[tokio::test]
async fn test_denied_permission_is_recoverable() {
    let devices = MediaDevices::new(Arc::new(DenyingBackend));

    let result = devices.set_audio_enabled(true).await;
    assert!(result.is_err());
    assert!(!devices.audio_enabled());

    // Disabling a capability that never came up still succeeds
    devices.set_audio_enabled(false).await.unwrap();
    devices.set_video_enabled(false).await.unwrap();
}

#[tokio::test]
async fn test_audio_samples_taken_once() -> Result<()> {
    let devices = MediaDevices::new(Arc::new(CountingBackend::default()));

    assert!(devices.take_audio_samples().await.is_none());

    devices.set_audio_enabled(true).await?;
    let (rate, _rx) = devices.take_audio_samples().await.expect("sample feed");
    assert_eq!(rate, 44_100);

    assert!(devices.take_audio_samples().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_teardown_stops_all_tracks() -> Result<()> {
    let devices = MediaDevices::new(Arc::new(CountingBackend::default()));

    devices.set_video_enabled(true).await?;
    devices.set_audio_enabled(true).await?;
    let audio_tracks = devices.audio_tracks().await;

    devices.teardown().await;

    assert!(!devices.video_enabled());
    assert!(!devices.audio_enabled());
    assert!(audio_tracks.iter().all(|t| t.is_stopped()));

    // Streams were released, nothing left to hand out
    assert!(devices.audio_tracks().await.is_empty());
    Ok(())
}
