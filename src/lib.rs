pub mod audio;
pub mod config;
pub mod media;
pub mod recording;
pub mod session;
pub mod speech;
pub mod transport;

pub use audio::{AudioFrame, AudioFramer, FRAME_SIZE, TARGET_CHANNELS, TARGET_SAMPLE_RATE};
pub use config::Config;
pub use media::{DeviceBackend, MediaDevices, MediaTrack, NullBackend};
pub use recording::{CapturePrefs, DisplayCapture, NullCapture, RecorderSettings, ScreenRecorder};
pub use session::{
    InterviewState, SessionCoordinator, SessionSettings, SessionStats, SessionTransport,
};
pub use speech::{
    DecodedAudio, SpeechPlayback, SpeechSettings, SpeechTransport, TranscriptState, WavFileSink,
};
pub use transport::TransportState;
