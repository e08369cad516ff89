pub mod backend;
pub mod devices;

pub use backend::{DeviceBackend, DeviceStream, MediaTrack, NullBackend, TrackKind};
pub use devices::MediaDevices;
