//! Camera collaborator interfaces
//!
//! The host application owns the real video pipeline. The calibration engine
//! only needs to acquire a stream, pull frames from it and stop it again.

use crate::errors::ScanError;
use crate::types::LuminanceFrame;

/// Grants access to a live video source.
pub trait CameraSource: Send + Sync {
    /// Acquire the device exclusively.
    ///
    /// Permission or device failures must be reported as
    /// [`ScanError::DeviceUnavailable`]; the engine does not retry.
    fn acquire(&self) -> Result<Box<dyn CameraStream>, ScanError>;
}

/// An acquired, exclusively-owned video stream.
pub trait CameraStream: Send {
    /// Pull the most recent frame.
    fn next_frame(&mut self) -> Result<LuminanceFrame, ScanError>;

    /// Stop the stream and release the device handle.
    ///
    /// Called exactly once on every exit path; must not block on I/O.
    fn stop(&mut self);
}

/// Owns a stream and guarantees it is stopped when dropped.
pub(crate) struct StreamGuard {
    stream: Option<Box<dyn CameraStream>>,
}

impl StreamGuard {
    pub(crate) fn new(stream: Box<dyn CameraStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub(crate) fn next_frame(&mut self) -> Result<LuminanceFrame, ScanError> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_frame(),
            None => Err(ScanError::DeviceUnavailable(
                "camera stream already released".to_string(),
            )),
        }
    }

    pub(crate) fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::info!("Camera stream released");
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}
