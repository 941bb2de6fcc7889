/// Procedure-safety validation
///
/// Gates procedure selection against the patient's allergy list and gates
/// injection point placement against anatomical danger zones.
pub mod plan;
pub mod procedures;
pub mod validator;
pub mod zones;

pub use plan::{InjectionPlan, SimulationSession, SimulationSummary, VolumePerPoint, VolumeRange};
pub use procedures::{default_procedures, Procedure, ProcedureCatalog};
pub use validator::{contraindication_conflicts, SafetyValidator};
pub use zones::{
    default_zones, AxisBounds, DangerZone, DangerZoneCatalog, ZoneClassification, ZoneRegion,
};
