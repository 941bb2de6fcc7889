//! Safety Validator Testing
//!
//! - Contraindication scenarios and order/case independence
//! - Danger-zone scenarios and determinism
//! - Injection plan growth, volume math and simulation gating
//! - Event stream emitted to the presentation layer

use proptest::prelude::*;
use scanguard::config::SimulationConfig;
use scanguard::context::{MedicalHistory, SessionContext};
use scanguard::errors::{ReasonCode, ScanError};
use scanguard::events::{EventBus, ScanEvent};
use scanguard::safety::{
    contraindication_conflicts, default_procedures, default_zones, AxisBounds, DangerZone,
    DangerZoneCatalog, Procedure, ProcedureCatalog, SafetyValidator, SimulationSession,
    ZoneClassification, ZoneRegion,
};
use scanguard::types::NormalizedPoint;

fn context(allergies: &[&str]) -> SessionContext {
    SessionContext::new(MedicalHistory::with_allergies(allergies.iter().copied())).unwrap()
}

fn temple_catalog() -> DangerZoneCatalog {
    DangerZoneCatalog::new(vec![DangerZone::new(
        "Temple",
        ZoneClassification::Vascular,
        ZoneRegion::Rect {
            x: AxisBounds::below(20.0),
            y: AxisBounds::below(30.0),
        },
    )])
}

#[test]
fn test_hyaluronic_allergy_scenario() {
    let zones = DangerZoneCatalog::default();
    let procedures = ProcedureCatalog::new(vec![Procedure::new(
        "cheek",
        "Cheek Filler",
        "Hyaluronic acid",
        &["Hyaluronic Acid", "Lidocaine"],
    )]);
    let validator = SafetyValidator::new(&zones, &procedures);
    let ctx = context(&["Hyaluronic acid"]);

    let err = validator
        .check_procedure(validator.procedure("cheek").unwrap(), &ctx)
        .unwrap_err();
    assert_eq!(
        err,
        ScanError::ContraindicationConflict {
            procedure_id: "cheek".to_string(),
            terms: vec!["Hyaluronic Acid".to_string()],
        }
    );
}

#[test]
fn test_temple_zone_scenario() {
    let zones = temple_catalog();
    let procedures = ProcedureCatalog::default();
    let validator = SafetyValidator::new(&zones, &procedures);

    match validator.check_point(NormalizedPoint::new(10.0, 20.0)) {
        Err(ScanError::UnsafeZone { classification, .. }) => {
            assert_eq!(classification, ZoneClassification::Vascular)
        }
        other => panic!("expected vascular rejection, got {:?}", other),
    }
    assert!(validator.check_point(NormalizedPoint::new(50.0, 50.0)).is_ok());
}

#[test]
fn test_three_points_total_volume() {
    let zones = temple_catalog();
    let procedures = ProcedureCatalog::new(default_procedures());
    let ctx = context(&["None"]);
    let config = SimulationConfig::default();
    let mut session = SimulationSession::new(
        SafetyValidator::new(&zones, &procedures),
        &ctx,
        &config,
        EventBus::new(),
    )
    .unwrap();

    session.select_procedure("dermal-filler-cheek").unwrap();
    session.set_volume_per_point(1.2);
    session.place_point(NormalizedPoint::new(50.0, 50.0)).unwrap();
    session.place_point(NormalizedPoint::new(55.0, 60.0)).unwrap();
    session.place_point(NormalizedPoint::new(45.0, 60.0)).unwrap();

    assert_eq!(session.plan().len(), 3);
    assert!((session.total_volume() - 3.6).abs() < 1e-5);
}

#[test]
fn test_volume_clamped_at_input_boundary() {
    let zones = DangerZoneCatalog::default();
    let procedures = ProcedureCatalog::new(default_procedures());
    let ctx = context(&["None"]);
    let config = SimulationConfig::default();
    let mut session = SimulationSession::new(
        SafetyValidator::new(&zones, &procedures),
        &ctx,
        &config,
        EventBus::new(),
    )
    .unwrap();

    assert_eq!(session.set_volume_per_point(10.0).value(), 2.0);
    assert_eq!(session.set_volume_per_point(0.0).value(), 0.5);
    assert_eq!(session.volume_per_point().value(), 0.5);
}

#[test]
fn test_full_simulation_event_stream() {
    let zones = DangerZoneCatalog::new(default_zones());
    let procedures = ProcedureCatalog::new(default_procedures());
    let ctx = context(&["Penicillin"]);
    let config = SimulationConfig::default();
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let mut session =
        SimulationSession::new(SafetyValidator::new(&zones, &procedures), &ctx, &config, bus)
            .unwrap();

    session.select_procedure("lip-filler").unwrap();
    let rejected = session.place_point(NormalizedPoint::new(50.0, 25.0)).unwrap_err();
    assert_eq!(rejected.reason_code(), ReasonCode::UnsafeZone);
    session.place_point(NormalizedPoint::new(50.0, 80.0)).unwrap();
    let summary = session.run_simulation(true).unwrap();
    assert_eq!(summary.point_count, 1);

    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    assert_eq!(
        events,
        vec![
            ScanEvent::ProcedureAccepted {
                procedure_id: "lip-filler".to_string()
            },
            ScanEvent::PointRejected {
                zone: "Infraorbital Nerve".to_string(),
                classification: ZoneClassification::Neural,
            },
            ScanEvent::PointAccepted {
                point: NormalizedPoint::new(50.0, 80.0)
            },
            ScanEvent::SimulationCompleted { summary },
        ]
    );
}

#[test]
fn test_unknown_procedure_keeps_previous_selection() {
    let zones = DangerZoneCatalog::default();
    let procedures = ProcedureCatalog::new(default_procedures());
    let ctx = context(&["None"]);
    let config = SimulationConfig::default();
    let mut session = SimulationSession::new(
        SafetyValidator::new(&zones, &procedures),
        &ctx,
        &config,
        EventBus::new(),
    )
    .unwrap();

    session.select_procedure("botox-forehead").unwrap();
    session.place_point(NormalizedPoint::new(50.0, 10.0)).unwrap();
    let err = session.select_procedure("facelift").unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::UnknownProcedure);
    assert_eq!(session.selected_procedure().unwrap().id, "botox-forehead");
    assert_eq!(session.plan().len(), 1);
}

fn recase(s: &str, mask: u64) -> String {
    s.chars()
        .enumerate()
        .map(|(i, c)| {
            if mask >> (i % 64) & 1 == 1 {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

fn allergy_entry() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Hyaluronic acid".to_string()),
        Just("Lidocaine".to_string()),
        Just("Botox".to_string()),
        Just("Latex".to_string()),
        Just("None".to_string()),
        "[a-zA-Z ]{1,16}",
    ]
}

proptest! {
    #[test]
    fn prop_contraindication_order_and_case_independent(
        allergies in proptest::collection::vec(allergy_entry(), 1..6),
        masks in proptest::collection::vec(any::<u64>(), 6),
        seed in any::<u64>(),
    ) {
        let shuffled: Vec<String> = {
            let mut v: Vec<String> = allergies
                .iter()
                .zip(masks.iter())
                .map(|(a, m)| recase(a, *m))
                .collect();
            let len = v.len();
            v.rotate_left((seed as usize) % len);
            v.reverse();
            v
        };

        for procedure in default_procedures() {
            let original = contraindication_conflicts(&procedure, &allergies);
            let permuted = contraindication_conflicts(&procedure, &shuffled);
            prop_assert_eq!(original.is_empty(), permuted.is_empty());
            prop_assert_eq!(original, permuted);
        }
    }

    #[test]
    fn prop_point_check_deterministic(x in -10.0f32..110.0, y in -10.0f32..110.0) {
        let zones = DangerZoneCatalog::new(default_zones());
        let procedures = ProcedureCatalog::default();
        let validator = SafetyValidator::new(&zones, &procedures);
        let point = NormalizedPoint::new(x, y);

        let first = validator.check_point(point);
        let second = validator.check_point(point);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_accepted_points_never_in_zone(
        points in proptest::collection::vec((0.0f32..=100.0, 0.0f32..=100.0), 1..30)
    ) {
        let zones = DangerZoneCatalog::new(default_zones());
        let procedures = ProcedureCatalog::new(default_procedures());
        let ctx = context(&["None"]);
        let config = SimulationConfig::default();
        let mut session = SimulationSession::new(
            SafetyValidator::new(&zones, &procedures),
            &ctx,
            &config,
            EventBus::new(),
        )
        .unwrap();
        session.select_procedure("dermal-filler-cheek").unwrap();

        for (x, y) in points {
            let _ = session.place_point(NormalizedPoint::new(x, y));
        }
        for p in session.plan().points() {
            prop_assert!(zones.first_match(*p).is_none());
        }
    }
}
