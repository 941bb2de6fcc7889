/// Capture-readiness calibration
///
/// Samples scene brightness from the live camera feed and unblocks the 3D
/// scan once lighting meets the minimum, or once the fallback timer allows
/// a degraded-light capture.
pub mod engine;
pub mod luminance;
pub mod state;

pub use engine::CalibrationEngine;
pub use luminance::{readiness_percent, sample, LuminanceReading, LUMA_WEIGHTS, MIN_LUMINANCE};
pub use state::{
    CalibrationMachine, CalibrationState, FallbackPolicy, ReadySource, Transition,
    PROGRESS_COMPLETE,
};
