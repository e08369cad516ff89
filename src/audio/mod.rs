pub mod frame;
pub mod framer;

pub use frame::AudioFrame;
pub use framer::{
    quantize_pcm16, resample_linear, AudioFramer, FRAME_SIZE, TARGET_CHANNELS, TARGET_SAMPLE_RATE,
};
