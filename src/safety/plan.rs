//! Injection plan and the simulation session that guards it
//!
//! The plan only grows through [`SimulationSession::place_point`], which runs
//! both safety checks before every insertion.

use crate::assert_invariant;
use crate::config::SimulationConfig;
use crate::context::SessionContext;
use crate::errors::ScanError;
use crate::events::{EventBus, ScanEvent};
use crate::invariants::{PLAN_POINT_NO_CONFLICT, PLAN_POINT_ZONE_CLEAR};
use crate::safety::procedures::Procedure;
use crate::safety::validator::{contraindication_conflicts, SafetyValidator};
use crate::types::NormalizedPoint;
use serde::{Deserialize, Serialize};

/// Allowed volume-per-point range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl Default for VolumeRange {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 2.0,
            default: 1.0,
        }
    }
}

impl TryFrom<&SimulationConfig> for VolumeRange {
    type Error = ScanError;

    fn try_from(config: &SimulationConfig) -> Result<Self, Self::Error> {
        config.validate().map_err(ScanError::Config)?;
        Ok(Self {
            min: config.min_volume,
            max: config.max_volume,
            default: config.default_volume,
        })
    }
}

/// Volume injected at each point, always inside its [`VolumeRange`]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumePerPoint(f32);

impl VolumePerPoint {
    /// Clamp user input into the range; non-finite input yields the default.
    pub fn clamped(value: f32, range: &VolumeRange) -> Self {
        if !value.is_finite() {
            return Self(range.default);
        }
        Self(value.clamp(range.min, range.max))
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for VolumePerPoint {
    fn default() -> Self {
        Self(VolumeRange::default().default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InjectionPlan {
    points: Vec<NormalizedPoint>,
}

impl InjectionPlan {
    pub fn points(&self) -> &[NormalizedPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_volume(&self, per_point: VolumePerPoint) -> f32 {
        self.points.len() as f32 * per_point.value()
    }

    fn push(&mut self, point: NormalizedPoint) {
        self.points.push(point);
    }

    fn clear(&mut self) {
        self.points.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub procedure_id: String,
    pub procedure_name: String,
    pub point_count: usize,
    pub volume_per_point: f32,
    pub total_volume: f32,
}

/// Procedure selection plus the injection plan for one patient
pub struct SimulationSession<'a> {
    validator: SafetyValidator<'a>,
    context: &'a SessionContext,
    events: EventBus,
    volume_range: VolumeRange,
    volume: VolumePerPoint,
    selected: Option<&'a Procedure>,
    plan: InjectionPlan,
    simulated: bool,
}

impl<'a> SimulationSession<'a> {
    /// Fails with [`ScanError::Config`] when the volume range is unusable.
    pub fn new(
        validator: SafetyValidator<'a>,
        context: &'a SessionContext,
        config: &SimulationConfig,
        events: EventBus,
    ) -> Result<Self, ScanError> {
        let volume_range = VolumeRange::try_from(config)?;
        Ok(Self {
            validator,
            context,
            events,
            volume_range,
            volume: VolumePerPoint::clamped(volume_range.default, &volume_range),
            selected: None,
            plan: InjectionPlan::default(),
            simulated: false,
        })
    }

    pub fn selected_procedure(&self) -> Option<&'a Procedure> {
        self.selected
    }

    pub fn plan(&self) -> &InjectionPlan {
        &self.plan
    }

    pub fn volume_per_point(&self) -> VolumePerPoint {
        self.volume
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Conflicting contraindication terms of the current selection
    pub fn active_conflicts(&self) -> Vec<String> {
        self.selected
            .map(|p| contraindication_conflicts(p, self.context.allergies()))
            .unwrap_or_default()
    }

    /// Change the selected procedure and re-run the contraindication check.
    ///
    /// The plan is cleared on every change. A rejected procedure remains
    /// selected so its conflict can be displayed, but no point can be placed
    /// until a conflict-free procedure is chosen.
    pub fn select_procedure(&mut self, id: &str) -> Result<&'a Procedure, ScanError> {
        let procedure = self.validator.procedure(id)?;
        self.selected = Some(procedure);
        self.reset_plan();
        log::info!("Procedure selected: {}", procedure.id);

        match self.validator.check_procedure(procedure, self.context) {
            Ok(()) => {
                self.events.emit(ScanEvent::ProcedureAccepted {
                    procedure_id: procedure.id.clone(),
                });
                Ok(procedure)
            }
            Err(err) => {
                if let ScanError::ContraindicationConflict { terms, .. } = &err {
                    self.events.emit(ScanEvent::ProcedureRejected {
                        procedure_id: procedure.id.clone(),
                        terms: terms.clone(),
                    });
                }
                Err(err)
            }
        }
    }

    /// Validate a proposed point and append it to the plan.
    pub fn place_point(&mut self, point: NormalizedPoint) -> Result<(), ScanError> {
        let procedure = self.selected.ok_or(ScanError::NoProcedureSelected)?;
        self.validator.check_procedure(procedure, self.context)?;

        if let Err(err) = self.validator.check_point(point) {
            if let ScanError::UnsafeZone {
                zone,
                classification,
            } = &err
            {
                self.events.emit(ScanEvent::PointRejected {
                    zone: zone.clone(),
                    classification: *classification,
                });
            }
            return Err(err);
        }

        assert_invariant!(
            self.validator.zone_at(point).is_none(),
            PLAN_POINT_ZONE_CLEAR,
            "injection plan"
        );
        assert_invariant!(
            self.active_conflicts().is_empty(),
            PLAN_POINT_NO_CONFLICT,
            "injection plan"
        );

        self.plan.push(point);
        self.simulated = false;
        log::debug!(
            "Injection point accepted at ({:.1}, {:.1}); {} in plan",
            point.x,
            point.y,
            self.plan.len()
        );
        self.events.emit(ScanEvent::PointAccepted { point });
        Ok(())
    }

    /// Set the volume per point, clamped to the configured safe range.
    pub fn set_volume_per_point(&mut self, value: f32) -> VolumePerPoint {
        self.volume = VolumePerPoint::clamped(value, &self.volume_range);
        if self.volume.value() != value {
            log::debug!("Volume {} clamped to {}", value, self.volume.value());
        }
        self.volume
    }

    pub fn total_volume(&self) -> f32 {
        self.plan.total_volume(self.volume)
    }

    pub fn clear_points(&mut self) {
        self.reset_plan();
    }

    fn reset_plan(&mut self) {
        self.simulated = false;
        if !self.plan.is_empty() {
            self.plan.clear();
            self.events.emit(ScanEvent::PlanCleared);
        }
    }

    /// Run the simulation over the current plan.
    ///
    /// Requires a completed facial capture, a conflict-free procedure and at
    /// least one accepted point.
    pub fn run_simulation(&mut self, capture_complete: bool) -> Result<SimulationSummary, ScanError> {
        if !capture_complete {
            return Err(ScanError::CaptureIncomplete);
        }
        let procedure = self.selected.ok_or(ScanError::NoProcedureSelected)?;
        self.validator.check_procedure(procedure, self.context)?;
        if self.plan.is_empty() {
            return Err(ScanError::EmptyPlan);
        }

        let summary = SimulationSummary {
            procedure_id: procedure.id.clone(),
            procedure_name: procedure.name.clone(),
            point_count: self.plan.len(),
            volume_per_point: self.volume.value(),
            total_volume: self.total_volume(),
        };
        self.simulated = true;
        log::info!(
            "Simulation complete: {} points of {} at {:.1} each ({:.1} total)",
            summary.point_count,
            summary.procedure_name,
            summary.volume_per_point,
            summary.total_volume
        );
        self.events.emit(ScanEvent::SimulationCompleted {
            summary: summary.clone(),
        });
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MedicalHistory;
    use crate::invariants::{clear_invariant_log, contract_test};
    use crate::safety::procedures::{default_procedures, ProcedureCatalog};
    use crate::safety::zones::{default_zones, DangerZoneCatalog, ZoneClassification};

    struct Fixture {
        zones: DangerZoneCatalog,
        procedures: ProcedureCatalog,
        context: SessionContext,
        config: SimulationConfig,
    }

    impl Fixture {
        fn new(allergies: &[&str]) -> Self {
            Self {
                zones: DangerZoneCatalog::new(default_zones()),
                procedures: ProcedureCatalog::new(default_procedures()),
                context: SessionContext::new(MedicalHistory::with_allergies(
                    allergies.iter().copied(),
                ))
                .unwrap(),
                config: SimulationConfig::default(),
            }
        }

        fn session(&self) -> SimulationSession<'_> {
            SimulationSession::new(
                SafetyValidator::new(&self.zones, &self.procedures),
                &self.context,
                &self.config,
                EventBus::new(),
            )
            .unwrap()
        }
    }

    #[test]
    fn test_volume_clamping() {
        let range = VolumeRange::default();
        assert_eq!(VolumePerPoint::clamped(0.1, &range).value(), 0.5);
        assert_eq!(VolumePerPoint::clamped(5.0, &range).value(), 2.0);
        assert_eq!(VolumePerPoint::clamped(1.3, &range).value(), 1.3);
        assert_eq!(VolumePerPoint::clamped(f32::NAN, &range).value(), 1.0);
    }

    #[test]
    fn test_inverted_volume_range_rejected() {
        let mut fx = Fixture::new(&["None"]);
        fx.config = SimulationConfig {
            min_volume: 2.0,
            max_volume: 0.5,
            default_volume: 1.0,
        };
        let result = SimulationSession::new(
            SafetyValidator::new(&fx.zones, &fx.procedures),
            &fx.context,
            &fx.config,
            EventBus::new(),
        );
        assert_eq!(
            result.err().map(|e| e.reason_code()),
            Some(crate::errors::ReasonCode::Config)
        );

        fx.config.max_volume = f32::NAN;
        assert!(VolumeRange::try_from(&fx.config).is_err());
    }

    #[test]
    fn test_place_requires_selection() {
        let fx = Fixture::new(&["None"]);
        let mut session = fx.session();
        assert_eq!(
            session.place_point(NormalizedPoint::new(50.0, 50.0)),
            Err(ScanError::NoProcedureSelected)
        );
        assert!(session.plan().is_empty());
    }

    #[test]
    fn test_rejected_procedure_blocks_points() {
        let fx = Fixture::new(&["Lidocaine"]);
        let mut session = fx.session();
        let mut events = session.events().subscribe();

        let err = session.select_procedure("lip-filler").unwrap_err();
        assert_eq!(err.reason_code(), crate::errors::ReasonCode::ContraindicationConflict);
        assert_eq!(
            events.try_recv().unwrap(),
            ScanEvent::ProcedureRejected {
                procedure_id: "lip-filler".to_string(),
                terms: vec!["Lidocaine".to_string()],
            }
        );
        assert_eq!(session.active_conflicts(), vec!["Lidocaine".to_string()]);

        assert!(matches!(
            session.place_point(NormalizedPoint::new(50.0, 50.0)),
            Err(ScanError::ContraindicationConflict { .. })
        ));
        assert!(session.plan().is_empty());

        session.select_procedure("botox-forehead").unwrap();
        assert!(session.active_conflicts().is_empty());
        session.place_point(NormalizedPoint::new(50.0, 50.0)).unwrap();
        assert_eq!(session.plan().len(), 1);
    }

    #[test]
    fn test_zone_rejection_emits_event() {
        let fx = Fixture::new(&["None"]);
        let mut session = fx.session();
        session.select_procedure("dermal-filler-cheek").unwrap();
        let mut events = session.events().subscribe();

        let err = session.place_point(NormalizedPoint::new(10.0, 20.0)).unwrap_err();
        assert_eq!(err.reason_code(), crate::errors::ReasonCode::UnsafeZone);
        assert_eq!(
            events.try_recv().unwrap(),
            ScanEvent::PointRejected {
                zone: "Temporal Artery".to_string(),
                classification: ZoneClassification::Vascular,
            }
        );
        assert!(session.plan().is_empty());
    }

    #[test]
    fn test_total_volume() {
        clear_invariant_log();
        let fx = Fixture::new(&["None"]);
        let mut session = fx.session();
        session.select_procedure("dermal-filler-cheek").unwrap();
        assert_eq!(session.set_volume_per_point(1.2).value(), 1.2);

        for (x, y) in [(50.0, 50.0), (60.0, 60.0), (40.0, 70.0)] {
            session.place_point(NormalizedPoint::new(x, y)).unwrap();
        }
        assert!((session.total_volume() - 3.6).abs() < 1e-5);
        contract_test(
            "plan insertion",
            &[PLAN_POINT_ZONE_CLEAR, PLAN_POINT_NO_CONFLICT],
        );
    }

    #[test]
    fn test_procedure_change_clears_plan() {
        let fx = Fixture::new(&["None"]);
        let mut session = fx.session();
        session.select_procedure("lip-filler").unwrap();
        session.place_point(NormalizedPoint::new(50.0, 80.0)).unwrap();
        let mut events = session.events().subscribe();

        session.select_procedure("botox-crowsfeet").unwrap();
        assert!(session.plan().is_empty());
        assert_eq!(events.try_recv().unwrap(), ScanEvent::PlanCleared);
    }

    #[test]
    fn test_run_simulation_preconditions() {
        let fx = Fixture::new(&["None"]);
        let mut session = fx.session();
        assert_eq!(session.run_simulation(false), Err(ScanError::CaptureIncomplete));
        assert_eq!(session.run_simulation(true), Err(ScanError::NoProcedureSelected));

        session.select_procedure("dermal-filler-nasolabial").unwrap();
        assert_eq!(session.run_simulation(true), Err(ScanError::EmptyPlan));

        session.place_point(NormalizedPoint::new(45.0, 60.0)).unwrap();
        session.place_point(NormalizedPoint::new(55.0, 60.0)).unwrap();
        let summary = session.run_simulation(true).unwrap();
        assert_eq!(summary.procedure_id, "dermal-filler-nasolabial");
        assert_eq!(summary.point_count, 2);
        assert_eq!(summary.volume_per_point, 1.0);
        assert_eq!(summary.total_volume, 2.0);
        assert!(session.is_simulated());

        session.clear_points();
        assert!(!session.is_simulated());
        assert!(session.plan().is_empty());
    }
}
