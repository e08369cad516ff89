pub mod capture;
pub mod recorder;

pub use capture::{CaptureHandle, CapturePrefs, DisplayCapture, NullCapture, RecordingChunk};
pub use recorder::{RecorderSettings, ScreenRecorder};
