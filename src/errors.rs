use crate::calibration::CalibrationState;
use crate::safety::ZoneClassification;
use std::fmt;
use thiserror::Error;

/// Machine-readable reason attached to every rejection and failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    DeviceUnavailable,
    /// Not an error: reported while the engine sits in `Checking`.
    InsufficientLight,
    InvalidTransition,
    ContraindicationConflict,
    UnsafeZone,
    NoProcedureSelected,
    UnknownProcedure,
    PointOutOfBounds,
    EmptyPlan,
    CaptureIncomplete,
    InvalidSession,
    Runtime,
    Config,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::DeviceUnavailable => "device_unavailable",
            ReasonCode::InsufficientLight => "insufficient_light",
            ReasonCode::InvalidTransition => "invalid_transition",
            ReasonCode::ContraindicationConflict => "contraindication_conflict",
            ReasonCode::UnsafeZone => "unsafe_zone",
            ReasonCode::NoProcedureSelected => "no_procedure_selected",
            ReasonCode::UnknownProcedure => "unknown_procedure",
            ReasonCode::PointOutOfBounds => "point_out_of_bounds",
            ReasonCode::EmptyPlan => "empty_plan",
            ReasonCode::CaptureIncomplete => "capture_incomplete",
            ReasonCode::InvalidSession => "invalid_session",
            ReasonCode::Runtime => "runtime",
            ReasonCode::Config => "config",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: CalibrationState,
        action: &'static str,
    },

    #[error("Procedure {procedure_id} is contraindicated: {}", .terms.join(", "))]
    ContraindicationConflict {
        procedure_id: String,
        terms: Vec<String>,
    },

    #[error("Point lies in {classification} danger zone: {zone}")]
    UnsafeZone {
        zone: String,
        classification: ZoneClassification,
    },

    #[error("No procedure selected")]
    NoProcedureSelected,

    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),

    #[error("Point ({x}, {y}) is outside the 0-100 face grid")]
    PointOutOfBounds { x: f32, y: f32 },

    #[error("Injection plan is empty")]
    EmptyPlan,

    #[error("Facial capture has not completed")]
    CaptureIncomplete,

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScanError {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            ScanError::DeviceUnavailable(_) => ReasonCode::DeviceUnavailable,
            ScanError::InvalidTransition { .. } => ReasonCode::InvalidTransition,
            ScanError::ContraindicationConflict { .. } => ReasonCode::ContraindicationConflict,
            ScanError::UnsafeZone { .. } => ReasonCode::UnsafeZone,
            ScanError::NoProcedureSelected => ReasonCode::NoProcedureSelected,
            ScanError::UnknownProcedure(_) => ReasonCode::UnknownProcedure,
            ScanError::PointOutOfBounds { .. } => ReasonCode::PointOutOfBounds,
            ScanError::EmptyPlan => ReasonCode::EmptyPlan,
            ScanError::CaptureIncomplete => ReasonCode::CaptureIncomplete,
            ScanError::InvalidSession(_) => ReasonCode::InvalidSession,
            ScanError::Runtime(_) => ReasonCode::Runtime,
            ScanError::Config(_) => ReasonCode::Config,
        }
    }

    /// Whether a human can resolve the condition within the current session.
    ///
    /// Device failures end the session; the user has to call `start` again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ScanError::DeviceUnavailable(_) | ScanError::Runtime(_) | ScanError::Config(_)
        )
    }
}
