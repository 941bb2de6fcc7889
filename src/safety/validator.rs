//! Pure safety checks over the static catalogs
//!
//! Both checks are deterministic functions of their inputs. The validator
//! holds nothing but borrowed, immutable catalogs.

use crate::context::SessionContext;
use crate::errors::ScanError;
use crate::safety::procedures::{Procedure, ProcedureCatalog};
use crate::safety::zones::{DangerZone, DangerZoneCatalog};
use crate::types::NormalizedPoint;

/// Contraindication terms of `procedure` that appear in any allergy entry.
///
/// Matching is a case-insensitive substring test of the term inside the
/// allergy text. Terms keep their catalog spelling and order.
pub fn contraindication_conflicts(procedure: &Procedure, allergies: &[String]) -> Vec<String> {
    let allergies: Vec<String> = allergies.iter().map(|a| a.to_lowercase()).collect();

    procedure
        .contraindications
        .iter()
        .filter(|term| {
            let term = term.to_lowercase();
            allergies.iter().any(|allergy| allergy.contains(&term))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyValidator<'a> {
    zones: &'a DangerZoneCatalog,
    procedures: &'a ProcedureCatalog,
}

impl<'a> SafetyValidator<'a> {
    pub fn new(zones: &'a DangerZoneCatalog, procedures: &'a ProcedureCatalog) -> Self {
        Self { zones, procedures }
    }

    pub fn zones(&self) -> &'a DangerZoneCatalog {
        self.zones
    }

    pub fn procedures(&self) -> &'a ProcedureCatalog {
        self.procedures
    }

    pub fn procedure(&self, id: &str) -> Result<&'a Procedure, ScanError> {
        self.procedures
            .find(id)
            .ok_or_else(|| ScanError::UnknownProcedure(id.to_string()))
    }

    /// Operation A: reject a procedure the patient is allergic to.
    pub fn check_procedure(
        &self,
        procedure: &Procedure,
        context: &SessionContext,
    ) -> Result<(), ScanError> {
        let terms = contraindication_conflicts(procedure, context.allergies());
        if terms.is_empty() {
            return Ok(());
        }
        log::warn!(
            "Procedure {} contraindicated for patient {}: {}",
            procedure.id,
            context.patient_id(),
            terms.join(", ")
        );
        Err(ScanError::ContraindicationConflict {
            procedure_id: procedure.id.clone(),
            terms,
        })
    }

    /// First danger zone containing the point, if any
    pub fn zone_at(&self, point: NormalizedPoint) -> Option<&'a DangerZone> {
        self.zones.first_match(point)
    }

    /// Operation B: reject a point outside the face grid or inside a danger zone.
    pub fn check_point(&self, point: NormalizedPoint) -> Result<(), ScanError> {
        if !point.in_bounds() {
            return Err(ScanError::PointOutOfBounds {
                x: point.x,
                y: point.y,
            });
        }
        match self.zone_at(point) {
            Some(zone) => {
                log::warn!(
                    "Injection point ({:.1}, {:.1}) blocked by {} zone {}",
                    point.x,
                    point.y,
                    zone.classification,
                    zone.name
                );
                Err(ScanError::UnsafeZone {
                    zone: zone.name.clone(),
                    classification: zone.classification,
                })
            }
            None => Ok(()),
        }
    }
}
