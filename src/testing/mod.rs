//! Testing utilities for ScanGuard
//!
//! Provides synthetic frames and a scriptable camera so calibration can be
//! exercised offline, without camera hardware or permissions.

pub mod synthetic_data;

pub use synthetic_data::{CameraStats, SyntheticCamera};
