//! Session state machine: ordering errors, re-entry and failure semantics

use glam::DVec3;
use lepton_bridge_core::extract::extract;
use lepton_bridge_core::session::{EngineMode, Requirement, SessionState, SimulationSession};
use lepton_bridge_core::symbols::SymbolTable;
use lepton_bridge_core::tests::test_helpers::{FakeEngine, LogEntry};
use lepton_bridge_core::{BridgeContext, BridgeError, Doublet, Flavor};

fn calls(engine: &FakeEngine) -> usize {
    engine
        .log()
        .iter()
        .filter(|e| matches!(e, LogEntry::Call(_)))
        .count()
}

fn assert_state_error(result: Result<(), BridgeError>, actual: SessionState) {
    match result {
        Err(BridgeError::State(err)) => assert_eq!(err.actual, actual),
        other => panic!("expected a session state error, got {other:?}"),
    }
}

#[test]
fn test_operations_before_instantiate_are_rejected() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);

    assert_state_error(
        session.define_particle(Flavor::Tau, Doublet::Neutrino, 1e10),
        SessionState::Created,
    );
    assert_state_error(
        session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0),
        SessionState::Created,
    );
    assert_state_error(
        session.define_geometry_line(DVec3::ZERO, DVec3::Z),
        SessionState::Created,
    );
    assert_state_error(session.configure_geometry(), SessionState::Created);
    assert_state_error(session.run_event(), SessionState::Created);
    assert_state_error(session.set_start_location_along_axis(1.0), SessionState::Created);
    assert_state_error(session.set_geometry_shift(DVec3::X), SessionState::Created);
    assert!(matches!(extract(&session), Err(BridgeError::State(_))));

    // Nothing reached the engine and nothing moved
    assert_eq!(session.state(), SessionState::Created);
    assert_eq!(calls(&engine), 0);
    assert_eq!(engine.live_handles(), 0);
}

#[test]
fn test_each_phase_requires_the_previous_one() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);
    session.instantiate().expect("instantiate");

    // Geometry needs a particle
    match session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0) {
        Err(BridgeError::State(err)) => {
            assert_eq!(err.operation, "define_geometry_angles");
            assert_eq!(err.expected, Requirement::AtLeast(SessionState::ParticleDefined));
            assert_eq!(err.actual, SessionState::Instantiated);
        }
        other => panic!("unexpected {other:?}"),
    }

    session
        .define_particle(Flavor::Muon, Doublet::Charged, 1e6)
        .expect("define particle");
    assert_state_error(session.configure_geometry(), SessionState::ParticleDefined);

    session
        .define_geometry_angles(DVec3::ZERO, 30.0, 45.0)
        .expect("define geometry");
    assert_state_error(session.run_event(), SessionState::GeometryDefined);
    assert!(matches!(extract(&session), Err(BridgeError::State(_))));

    session.configure_geometry().expect("configure");
    assert!(matches!(extract(&session), Err(BridgeError::State(_))));

    session.run_event().expect("run");
    assert_eq!(session.state(), SessionState::EventExecuted);
    extract(&session).expect("extract");
}

#[test]
fn test_reentry_after_execution() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);
    session.instantiate().expect("instantiate");
    session.define_particle(Flavor::Tau, Doublet::Neutrino, 1e9).expect("particle");
    session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0).expect("geometry");
    session.configure_geometry().expect("configure");
    session.run_event().expect("run");

    // Running again on the same configuration is allowed
    session.run_event().expect("re-run");
    assert_eq!(session.state(), SessionState::EventExecuted);

    // A new particle sends the machine back, geometry must follow
    session.define_particle(Flavor::Muon, Doublet::Charged, 1e7).expect("new particle");
    assert_eq!(session.state(), SessionState::ParticleDefined);
    assert_state_error(session.run_event(), SessionState::ParticleDefined);

    session.define_geometry_line(DVec3::ZERO, DVec3::NEG_Z).expect("new geometry");
    assert_eq!(session.state(), SessionState::GeometryDefined);
}

#[test]
fn test_supplementary_operations_have_narrow_windows() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);
    session.instantiate().expect("instantiate");

    // Start location only right after configuration
    assert_state_error(session.set_start_location_along_axis(1e7), SessionState::Instantiated);

    session.set_geometry_shift(DVec3::new(100.0, 0.0, 0.0)).expect("shift");
    session.define_particle(Flavor::Tau, Doublet::Neutrino, 1e9).expect("particle");
    session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0).expect("geometry");
    session.set_geometry_shift(DVec3::ZERO).expect("shift before configure");
    session.configure_geometry().expect("configure");

    assert_state_error(session.set_geometry_shift(DVec3::X), SessionState::GeometryConfigured);
    session.set_start_location_along_axis(5e7).expect("start location");
    assert_eq!(session.state(), SessionState::GeometryConfigured);

    session.run_event().expect("run");
    assert_state_error(session.set_start_location_along_axis(5e7), SessionState::EventExecuted);
}

#[test]
fn test_invalid_arguments_make_no_call() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);
    session.instantiate().expect("instantiate");
    let before = calls(&engine);

    for energy in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let result = session.define_particle(Flavor::Electron, Doublet::Charged, energy);
        assert!(matches!(result, Err(BridgeError::InvalidArgument(_))), "energy {energy}");
    }
    let result = session.define_particle(Flavor::Pion, Doublet::Charged, 1e3);
    assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));

    session.define_particle(Flavor::Electron, Doublet::Charged, 1e3).expect("particle");
    let result = session.define_geometry_line(DVec3::ZERO, DVec3::ZERO);
    assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));
    session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0).expect("geometry");
    session.configure_geometry().expect("configure");
    let result = session.set_start_location_along_axis(-3.0);
    assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));

    // define + geometry + configure only
    assert_eq!(calls(&engine), before + 3);
    assert_eq!(session.state(), SessionState::GeometryConfigured);
}

#[test]
fn test_failed_call_leaves_state_unchanged() {
    let engine = FakeEngine::new().failing_on("configurePropagationGeometry");
    let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
    let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);
    session.instantiate().expect("instantiate");
    session.define_particle(Flavor::Tau, Doublet::Neutrino, 1e9).expect("particle");
    session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0).expect("geometry");

    let err = session.configure_geometry().expect_err("configure raises");
    assert!(matches!(err, BridgeError::Foreign(_)), "got {err:?}");
    assert_eq!(session.state(), SessionState::GeometryDefined);
}
