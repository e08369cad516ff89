// Playback of synthesized interviewer speech.
//
// TTS payloads arrive as encoded audio (typically WAV or MP3). They are
// decoded to interleaved PCM16 and handed either to the avatar driver for
// lip-synced playback or to a plain audio sink when no avatar is loaded.
// A payload that fails to decode is logged and skipped; playback errors
// never propagate into the session.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Interleaved PCM16 audio ready for a sink or the avatar driver
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Decode an encoded audio payload (WAV, MP3, OGG, ...) to PCM16.
///
/// The container is probed from the byte stream itself; no extension hint
/// is available for network payloads.
pub fn decode_audio(bytes: Vec<u8>) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Failed to probe audio payload format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("Audio payload contains no decodable track"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("Audio payload is missing a sample rate"))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(e).context("Failed to read audio packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, *decoded.spec());
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            // Bad packets are skipped, the rest of the payload still plays
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e).context("Failed to decode audio packet"),
        }
    }

    if samples.is_empty() {
        anyhow::bail!("Audio payload decoded to zero samples");
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Output device for decoded speech
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, audio: &DecodedAudio) -> Result<()>;
    fn name(&self) -> &str;
}

/// Sink that writes each utterance to a WAV file. Used headless and in
/// tests, where no playback device exists.
pub struct WavFileSink {
    dir: PathBuf,
    counter: std::sync::atomic::AtomicU64,
}

impl WavFileSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            counter: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn next_path(&self) -> PathBuf {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.dir.join(format!("utterance-{:04}.wav", n))
    }
}

#[async_trait]
impl AudioSink for WavFileSink {
    async fn play(&self, audio: &DecodedAudio) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create utterance output directory")?;

        let path = self.next_path();
        let spec = hound::WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
        for &sample in &audio.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        debug!("Wrote utterance to {}", path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

/// Lip-synced avatar renderer.
///
/// The driver owns its render surface; this trait only carries the calls
/// the session makes into it.
#[async_trait]
pub trait AvatarDriver: Send + Sync {
    /// Load the avatar model, heavyweight and done once per session
    async fn load_model(&self) -> Result<()>;
    /// Load viseme sync data for the loaded model
    async fn load_sync_data(&self) -> Result<()>;
    /// Play one utterance with synchronized mouth movement
    async fn speak(&self, audio: &DecodedAudio) -> Result<()>;
    /// Release the model and render surface
    async fn destroy(&self) -> Result<()>;
}

/// Routes interviewer speech to the avatar when one is ready, otherwise to
/// the plain audio sink.
pub struct SpeechPlayback {
    sink: Arc<dyn AudioSink>,
    avatar: tokio::sync::Mutex<Option<Arc<dyn AvatarDriver>>>,
}

impl SpeechPlayback {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            avatar: tokio::sync::Mutex::new(None),
        }
    }

    /// Initialize and attach an avatar driver. An avatar that fails to load
    /// is discarded; speech falls back to the plain sink.
    pub async fn attach_avatar(&self, driver: Arc<dyn AvatarDriver>) {
        if let Err(e) = driver.load_model().await {
            warn!("Avatar model failed to load, using audio-only playback: {}", e);
            return;
        }
        if let Err(e) = driver.load_sync_data().await {
            warn!("Avatar sync data failed to load, using audio-only playback: {}", e);
            return;
        }

        info!("Avatar driver attached");
        *self.avatar.lock().await = Some(driver);
    }

    pub async fn has_avatar(&self) -> bool {
        self.avatar.lock().await.is_some()
    }

    /// Decode and play one TTS payload.
    ///
    /// Returns whether anything was played. Decode and playback failures
    /// are logged here and never bubble into the session loop.
    pub async fn play_payload(&self, payload: Vec<u8>) -> bool {
        let audio = match decode_audio(payload) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Skipping undecodable speech payload: {}", e);
                return false;
            }
        };

        debug!(
            "Playing utterance: {}ms, {}Hz, {} channel(s)",
            audio.duration_ms(),
            audio.sample_rate,
            audio.channels
        );

        let avatar = self.avatar.lock().await;
        let result = match avatar.as_ref() {
            Some(driver) => driver.speak(&audio).await,
            None => self.sink.play(&audio).await,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Speech playback failed: {}", e);
                false
            }
        }
    }

    /// Tear down the avatar driver if one is attached
    pub async fn teardown(&self) {
        if let Some(driver) = self.avatar.lock().await.take() {
            if let Err(e) = driver.destroy().await {
                warn!("Avatar teardown reported an error: {}", e);
            }
        }
    }
}
