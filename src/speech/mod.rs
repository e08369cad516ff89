pub mod event;
pub mod playback;
pub mod transcript;
pub mod transport;

pub use event::SpeechEvent;
pub use playback::{decode_audio, AudioSink, AvatarDriver, DecodedAudio, SpeechPlayback, WavFileSink};
pub use transcript::TranscriptState;
pub use transport::{SpeechSettings, SpeechTransport};
