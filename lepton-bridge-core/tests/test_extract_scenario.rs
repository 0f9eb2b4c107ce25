//! End-to-end extraction against the scripted fake event

use glam::DVec3;
use lepton_bridge_core::config::{EngineSettings, StartMode};
use lepton_bridge_core::extract::extract;
use lepton_bridge_core::geometry::direction_from_angles;
use lepton_bridge_core::session::{EngineMode, SimulationSession};
use lepton_bridge_core::symbols::SymbolTable;
use lepton_bridge_core::tests::test_helpers::{
    approx_eq, approx_eq_vec, EventScript, FakeEngine, Mismatch, NEAR_DETECTOR_CM,
};
use lepton_bridge_core::{BridgeContext, BridgeError, Doublet, EventResult, Flavor};

fn run_tau_scenario(engine: &FakeEngine, mode: EngineMode) -> Result<EventResult, BridgeError> {
    let symbols = SymbolTable::resolve(engine)?;
    let mut session = SimulationSession::new(BridgeContext::new(engine, &symbols), mode);
    session.instantiate()?;
    session.define_particle(Flavor::Tau, Doublet::Neutrino, 1e10)?;
    session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0)?;
    session.configure_geometry()?;
    session.run_event()?;
    extract(&session)
}

#[test]
fn test_tau_neutrino_scenario() {
    let engine = FakeEngine::new();
    let result = run_tau_scenario(&engine, EngineMode::Parametrized(EngineSettings::default()))
        .expect("scenario runs");
    let n = engine.script().interactions;

    assert_eq!(result.primary_energy, 1e10);
    assert!(!result.track_records.is_empty() || !result.cascade_records.is_empty());
    assert_eq!(result.track_records.len(), n + 1);
    assert_eq!(result.cascade_records.len(), n);

    // The track starts with the primary itself, at the start location
    let first = &result.track_records[0];
    assert_eq!(first.name, "Tau Neutrino");
    assert_eq!(first.particle.energy, 1e10);
    assert!(approx_eq(first.distance_from_start, 0.0, 1e-9));
    assert!(approx_eq_vec(first.position, result.start.detector, 1e-9));

    // First interaction of a neutrino is hadronic
    assert_eq!(result.cascade_records[0].particle.flavor, Flavor::Pion);
    assert_eq!(result.cascade_records[0].name, "Pion+");
    assert_eq!(result.cascade_records[1].name, "Electron");

    assert_eq!(result.final_particle.name, "Tau");
    assert_eq!(result.final_particle.particle.doublet, Doublet::Charged);
    assert!(approx_eq(result.final_energy, 1e10 * 0.6f64.powi(n as i32), 1e-3));
    assert!(approx_eq(
        result.final_energy + result.cascade_total_energy(),
        result.primary_energy,
        1e-3
    ));
}

#[test]
fn test_total_length_matches_coordinates() {
    let engine = FakeEngine::new();
    let result = run_tau_scenario(&engine, EngineMode::Default).expect("scenario runs");
    let script = engine.script();

    let recomputed = result.start.detector.distance(result.end);
    assert!(approx_eq(result.total_length, recomputed, 1e-6));
    assert!(approx_eq(
        result.total_length,
        script.step_cm * (script.interactions + 1) as f64,
        1e-6
    ));

    for record in result.track_records.iter().chain(&result.cascade_records) {
        let expected = record.position.distance(result.start.detector);
        assert!(approx_eq(record.distance_from_start, expected, 1e-9));
    }

    // Both frames describe the same direction
    assert!(approx_eq_vec(result.direction.detector, direction_from_angles(0.0, 0.0), 1e-12));
    assert!(approx_eq_vec(result.direction.earth_center, result.direction.detector, 1e-12));
}

#[test]
fn test_line_and_angle_forms_agree() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);
    let position = DVec3::new(100.0, -50.0, 20.0);

    session.instantiate().expect("instantiate");
    session.define_particle(Flavor::Muon, Doublet::Charged, 1e8).expect("particle");
    session.define_geometry_angles(position, 60.0, 30.0).expect("angles");
    session.configure_geometry().expect("configure");
    session.run_event().expect("run");
    let by_angles = extract(&session).expect("extract");

    session
        .define_geometry_line(position, direction_from_angles(60.0, 30.0))
        .expect("line");
    session.configure_geometry().expect("configure");
    session.run_event().expect("run");
    let by_line = extract(&session).expect("extract");

    assert!(approx_eq_vec(by_angles.start.detector, by_line.start.detector, 1e-3));
    assert!(approx_eq_vec(by_angles.end, by_line.end, 1e-3));
}

#[test]
fn test_rerun_is_deterministic() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);
    session.instantiate().expect("instantiate");
    session.define_particle(Flavor::Electron, Doublet::Neutrino, 3e6).expect("particle");
    session.define_geometry_angles(DVec3::ZERO, 90.0, 0.0).expect("geometry");
    session.configure_geometry().expect("configure");

    session.run_event().expect("run");
    let first = extract(&session).expect("extract");
    session.run_event().expect("run");
    let second = extract(&session).expect("extract");
    assert_eq!(first, second);
}

#[test]
fn test_start_location_override_is_reported() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);
    session.instantiate().expect("instantiate");
    session.define_particle(Flavor::Tau, Doublet::Charged, 1e9).expect("particle");
    session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0).expect("geometry");
    session.configure_geometry().expect("configure");
    session.set_start_location_along_axis(5.0e7).expect("override");
    session.run_event().expect("run");

    let result = extract(&session).expect("extract");
    assert_eq!(result.distance_along_axis_from_entry, 5.0e7);
}

#[test]
fn test_near_detector_start_uses_shift() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let settings = EngineSettings {
        start_mode: StartMode::NearDetector,
        ..EngineSettings::default()
    };
    let mut session = SimulationSession::new(
        BridgeContext::new(&engine, &symbols),
        EngineMode::Parametrized(settings),
    );
    let shift = DVec3::new(2500.0, 0.0, 0.0);

    session.instantiate().expect("instantiate");
    session.set_geometry_shift(shift).expect("shift");
    session.define_particle(Flavor::Muon, Doublet::Charged, 1e6).expect("particle");
    session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0).expect("geometry");
    session.configure_geometry().expect("configure");
    session.run_event().expect("run");

    let result = extract(&session).expect("extract");
    let expected = shift - direction_from_angles(0.0, 0.0) * NEAR_DETECTOR_CM;
    assert!(approx_eq_vec(result.start.detector, expected, 1e-6));
}

#[test]
fn test_event_without_interactions() {
    let engine = FakeEngine::new().with_script(EventScript {
        interactions: 0,
        ..EventScript::default()
    });
    let result = run_tau_scenario(&engine, EngineMode::Default).expect("scenario runs");

    assert!(result.cascade_records.is_empty());
    assert_eq!(result.track_records.len(), 1);
    assert_eq!(result.cascade_total_energy(), 0.0);
    assert_eq!(result.final_energy, result.primary_energy);
}

#[test]
fn test_desynchronized_cursors_fail_fast() {
    for (mismatch, sequence) in [
        (Mismatch::ExtraCascadeLocation, "cascade"),
        (Mismatch::MissingTrackLocation, "track"),
    ] {
        let engine = FakeEngine::new().with_mismatch(mismatch);
        let err = run_tau_scenario(&engine, EngineMode::Default).expect_err("must fail");
        match err {
            BridgeError::PairingMismatch {
                sequence: s, index, ..
            } => {
                assert_eq!(s, sequence);
                assert_eq!(index, engine.script().interactions);
            }
            other => panic!("expected a pairing mismatch, got {other:?}"),
        }
        // Only the session's engine instance is left, and it went with the session
        assert_eq!(engine.live_handles(), 0, "leaked {:?}", engine.live_labels());
        assert_eq!(engine.invalid_releases(), 0);
    }
}

#[test]
fn test_result_serializes_to_json() {
    let engine = FakeEngine::new();
    let result = run_tau_scenario(&engine, EngineMode::Default).expect("scenario runs");
    let json = serde_json::to_value(&result).expect("serializes");

    assert_eq!(json["primary_energy"], serde_json::json!(1e10));
    assert_eq!(json["track_records"][0]["particle"]["flavor"], "tau");
    assert_eq!(json["track_records"][0]["particle"]["doublet"], "neutrino");
    assert_eq!(json["start"]["detector"].as_array().map(Vec::len), Some(3));
    assert_eq!(
        json["cascade_records"].as_array().map(Vec::len),
        Some(engine.script().interactions)
    );
}
