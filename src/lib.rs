//! ScanGuard: capture-readiness calibration and procedure-safety validation
//!
//! This crate holds the two decision-making cores of a facial scan and
//! injection-simulation workflow. The host application supplies the camera,
//! the patient context and the UI; the core decides and publishes events.
//!
//! # Features
//! - Luminance calibration loop that unblocks a 3D scan once lighting is
//!   sufficient, with an explicit degraded-light fallback
//! - Exclusive, always-released camera ownership across every exit path
//! - Allergy contraindication checks for procedure selection
//! - Declarative anatomical danger zones gating injection points
//! - Typed event stream for the presentation layer
//!
//! # Usage
//! ```rust,ignore
//! use scanguard::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ScanGuardConfig::load_or_default();
//! let engine = CalibrationEngine::new(Arc::new(my_camera), config.calibration.clone());
//! engine.on_complete(|| println!("scan captured"));
//! engine.start()?;
//!
//! let (zones, procedures) = config.catalogs();
//! let context = SessionContext::new(MedicalHistory::with_allergies(["Lidocaine"]))?;
//! let mut session = SimulationSession::new(
//!     SafetyValidator::new(&zones, &procedures),
//!     &context,
//!     &config.simulation,
//!     engine.events().clone(),
//! )?;
//! session.select_procedure("botox-forehead")?;
//! session.place_point(NormalizedPoint::new(50.0, 15.0))?;
//! ```
pub mod calibration;
pub mod camera;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod invariants;
pub mod safety;
pub mod types;

// Testing utilities - synthetic camera for offline testing
pub mod testing;

pub use calibration::{CalibrationEngine, CalibrationState};
pub use camera::{CameraSource, CameraStream};
pub use config::ScanGuardConfig;
pub use context::{MedicalHistory, SessionContext};
pub use errors::{ReasonCode, ScanError};
pub use events::{EventBus, ScanEvent};
pub use safety::{SafetyValidator, SimulationSession};
pub use types::{LuminanceFrame, NormalizedPoint, PixelFormat};

pub mod prelude {
    pub use crate::calibration::{
        CalibrationEngine, CalibrationState, FallbackPolicy, LuminanceReading, ReadySource,
    };
    pub use crate::camera::{CameraSource, CameraStream};
    pub use crate::config::{CalibrationConfig, ScanGuardConfig, SimulationConfig};
    pub use crate::context::{MedicalHistory, SessionContext};
    pub use crate::errors::{ReasonCode, ScanError};
    pub use crate::events::{EventBus, ScanEvent};
    pub use crate::safety::{
        DangerZone, DangerZoneCatalog, Procedure, ProcedureCatalog, SafetyValidator,
        SimulationSession, SimulationSummary, ZoneClassification,
    };
    pub use crate::types::{LuminanceFrame, NormalizedPoint, PixelFormat};
}

/// Initialize logging for the scan core
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "scanguard=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "scanguard");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
