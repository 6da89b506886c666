//! Capture sources
//!
//! Device contract, stream merging and acquisition of the display and
//! microphone streams.

pub mod acquirer;
pub mod simulated;
pub mod stream;
pub mod traits;

pub use acquirer::{acquire, Acquisition, MicrophoneStatus};
pub use simulated::{SimulatedDevice, SimulatedDeviceConfig};
pub use stream::CombinedStream;
pub use traits::{
    AudioConstraints, CaptureDevice, CaptureError, CaptureRequest, CaptureResult, DeviceStream, DisplayConstraints,
    MediaTrack, SourceKind, TrackControl, TrackKind, TrackSource, TrackState, VideoConstraints,
};
