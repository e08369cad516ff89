// Microphone tap: resamples raw float buffers to the recognizer's fixed
// format (16kHz mono PCM16) and forwards one frame per processing tick.
//
// The resampler is a deliberate low-cost linear interpolation, not a
// bandlimited resample. The downstream speech recognizer tolerates the
// minor artifacts this produces.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::frame::AudioFrame;
use crate::speech::SpeechTransport;

/// Sample rate the recognizer ingests
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
/// Mono
pub const TARGET_CHANNELS: u16 = 1;
/// Samples per audio-processing tick
pub const FRAME_SIZE: usize = 4096;

/// Resample mono float samples to `target_rate` by linear interpolation.
///
/// Output length is `round(n * target_rate / source_rate)`. Each output
/// sample blends the two nearest source samples by the fractional part of
/// its source index; the tail falls back to the last source sample.
pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let new_len = (input.len() as f64 * ratio).round() as usize;
    let mut result = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let index_original = i as f64 / ratio;
        let index1 = index_original.floor() as usize;
        let index2 = index_original.ceil() as usize;
        let fraction = (index_original - index1 as f64) as f32;

        if index2 < input.len() {
            result.push(input[index1] * (1.0 - fraction) + input[index2] * fraction);
        } else {
            result.push(input[index1.min(input.len() - 1)]);
        }
    }

    result
}

/// Quantize float samples to signed 16-bit PCM.
///
/// Samples are clamped to [-1, 1] first. Negative values scale by 32768 and
/// positive by 32767 to cover the full asymmetric PCM16 range.
pub fn quantize_pcm16(input: &[f32]) -> Vec<i16> {
    input
        .iter()
        .map(|&sample| {
            let s = sample.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 0x8000 as f32) as i16
            } else {
                (s * 0x7fff as f32) as i16
            }
        })
        .collect()
}

/// Converts raw microphone buffers into recognizer-ready PCM16 frames
pub struct AudioFramer {
    source_rate: u32,
    frames_emitted: u64,
    samples_emitted: u64,
}

impl AudioFramer {
    pub fn new(source_rate: u32) -> Self {
        Self {
            source_rate,
            frames_emitted: 0,
            samples_emitted: 0,
        }
    }

    /// Build one PCM16 frame from a raw float buffer
    pub fn frame(&mut self, input: &[f32]) -> AudioFrame {
        let resampled = resample_linear(input, self.source_rate, TARGET_SAMPLE_RATE);
        let samples = quantize_pcm16(&resampled);

        // Frame timestamps derive from the cumulative count of target-rate
        // samples emitted so far, not wall-clock time, so they stay correct
        // for any source rate.
        let timestamp_ms = self.samples_emitted * 1000 / TARGET_SAMPLE_RATE as u64;
        self.samples_emitted += samples.len() as u64;
        self.frames_emitted += 1;

        AudioFrame {
            samples,
            sample_rate: TARGET_SAMPLE_RATE,
            channels: TARGET_CHANNELS,
            timestamp_ms,
        }
    }

    /// Pump raw microphone buffers into the speech transport.
    ///
    /// Frames produced while the transport is not open are dropped, not
    /// queued: buffering stale audio would desynchronize transcripts, and
    /// the recognizer tolerates small gaps.
    pub fn pump(
        mut self,
        mut audio_rx: mpsc::Receiver<Vec<f32>>,
        transport: Arc<SpeechTransport>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Audio framer started ({}Hz -> {}Hz)", self.source_rate, TARGET_SAMPLE_RATE);

            let mut dropped: u64 = 0;
            while let Some(buffer) = audio_rx.recv().await {
                if !transport.is_open() {
                    dropped += 1;
                    debug!("Dropping audio frame, speech transport not open ({} dropped)", dropped);
                    continue;
                }

                let frame = self.frame(&buffer);
                transport.send_frame(frame.pcm_bytes()).await;
            }

            info!(
                "Audio framer stopped ({} frames emitted, {} dropped)",
                self.frames_emitted, dropped
            );
        })
    }
}
