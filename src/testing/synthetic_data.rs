//! Synthetic frames and a scriptable camera source
//!
//! `SyntheticCamera` serves solid gray frames whose brightness can be fixed,
//! scripted per frame or changed live, and can simulate permission denial or
//! a stream dying mid-session. Every clone shares the same [`CameraStats`].

use crate::camera::{CameraSource, CameraStream};
use crate::errors::ScanError;
use crate::types::LuminanceFrame;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

/// Counters shared between a synthetic camera and its streams
#[derive(Debug, Default)]
pub struct CameraStats {
    acquired: AtomicUsize,
    released: AtomicUsize,
    frames: AtomicUsize,
}

impl CameraStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    /// Acquired streams that have not been stopped
    pub fn active(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

#[derive(Debug)]
struct Script {
    queued: VecDeque<u8>,
    current: u8,
    deny_reason: Option<String>,
    fail_after: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    script: Arc<Mutex<Script>>,
    stats: Arc<CameraStats>,
}

impl SyntheticCamera {
    /// Every frame has the same brightness
    pub fn constant(brightness: u8) -> Self {
        Self::scripted(Vec::new(), brightness)
    }

    /// Frames follow `sequence`, then repeat `then` forever
    pub fn scripted(sequence: Vec<u8>, then: u8) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                queued: sequence.into(),
                current: then,
                deny_reason: None,
                fail_after: None,
            })),
            stats: Arc::new(CameraStats::default()),
        }
    }

    /// Acquisition always fails, as if permission was denied
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let camera = Self::constant(0);
        camera.lock().deny_reason = Some(reason.into());
        camera
    }

    /// Stream errors once `frames` frames have been served
    pub fn failing_after(brightness: u8, frames: usize) -> Self {
        let camera = Self::constant(brightness);
        camera.lock().fail_after = Some(frames);
        camera
    }

    /// Change the brightness of all following frames
    pub fn set_brightness(&self, brightness: u8) {
        let mut script = self.lock();
        script.queued.clear();
        script.current = brightness;
    }

    pub fn stats(&self) -> Arc<CameraStats> {
        self.stats.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CameraSource for SyntheticCamera {
    fn acquire(&self) -> Result<Box<dyn CameraStream>, ScanError> {
        if let Some(reason) = &self.lock().deny_reason {
            return Err(ScanError::DeviceUnavailable(reason.clone()));
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            camera: self.clone(),
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    camera: SyntheticCamera,
    stopped: bool,
}

impl CameraStream for SyntheticStream {
    fn next_frame(&mut self) -> Result<LuminanceFrame, ScanError> {
        if self.stopped {
            return Err(ScanError::DeviceUnavailable("stream stopped".to_string()));
        }

        let served = self.camera.stats.frames();
        let brightness = {
            let mut script = self.camera.lock();
            if script.fail_after.is_some_and(|limit| served >= limit) {
                return Err(ScanError::DeviceUnavailable(
                    "synthetic camera disconnected".to_string(),
                ));
            }
            script.queued.pop_front().unwrap_or(script.current)
        };

        self.camera.stats.frames.fetch_add(1, Ordering::SeqCst);
        Ok(LuminanceFrame::solid(
            FRAME_WIDTH,
            FRAME_HEIGHT,
            [brightness, brightness, brightness],
        ))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.camera.stats.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
