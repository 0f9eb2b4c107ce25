//! Symbol table resolution against the fake engine

use lepton_bridge_core::config::EventCard;
use lepton_bridge_core::pipeline::{run_events, RunPlan};
use lepton_bridge_core::session::EngineMode;
use lepton_bridge_core::symbols::{SymbolKind, SymbolTable, ENGINE_CLASS, LINE_CLASS, PARTICLE_CLASS};
use lepton_bridge_core::tests::test_helpers::{FakeEngine, LogEntry};
use lepton_bridge_core::BridgeError;

fn calls(engine: &FakeEngine) -> usize {
    engine
        .log()
        .iter()
        .filter(|e| matches!(e, LogEntry::Call(_)))
        .count()
}

#[test]
fn test_full_table_resolves() {
    let engine = FakeEngine::new();
    let symbols = SymbolTable::resolve(&engine).expect("all symbols present");

    // Two overloads of definePropagationGeometry resolve to distinct ids
    assert_ne!(
        symbols.engine.define_geometry_line,
        symbols.engine.define_geometry_angles
    );
    assert_ne!(symbols.engine.new_parametrized, symbols.engine.new_default);

    // Resolution is lookups only: no calls, no handles
    assert_eq!(calls(&engine), 0);
    assert_eq!(engine.live_handles(), 0);
}

#[test]
fn test_missing_method_stops_resolution() {
    let engine = FakeEngine::new().without_symbol("configurePropagationGeometry");
    let err = SymbolTable::resolve(&engine).expect_err("resolution must fail");

    assert_eq!(err.kind, SymbolKind::Method);
    assert_eq!(err.owner, ENGINE_CLASS);
    assert_eq!(err.name, "configurePropagationGeometry");
    assert_eq!(err.signature, "()V");

    // The failed lookup is the last one issued
    let lookups = engine.lookups();
    let last = lookups.last().expect("at least one lookup");
    assert!(last.contains("configurePropagationGeometry"), "last lookup was {last}");
    assert!(!lookups.iter().any(|l| l.contains("java/util/ListIterator")));
}

#[test]
fn test_missing_class_is_reported_against_class_path() {
    let engine = FakeEngine::new().without_symbol(LINE_CLASS);
    let err = SymbolTable::resolve(&engine).expect_err("resolution must fail");

    assert_eq!(err.kind, SymbolKind::Class);
    assert_eq!(err.owner, "the class path");
    assert_eq!(err.name, LINE_CLASS);
    assert_eq!(
        err.to_string(),
        "cannot find class `geometry/J3Line` in the class path"
    );
}

#[test]
fn test_missing_static_method_and_field() {
    let err = SymbolTable::resolve(&FakeEngine::new().without_symbol("particleName"))
        .expect_err("static lookup must fail");
    assert_eq!(err.kind, SymbolKind::StaticMethod);
    assert_eq!(err.owner, PARTICLE_CLASS);

    let err = SymbolTable::resolve(&FakeEngine::new().without_symbol("primaryEnergy"))
        .expect_err("field lookup must fail");
    assert_eq!(err.kind, SymbolKind::Field);
    assert_eq!(err.signature, "D");
}

#[test]
fn test_missing_constructor() {
    let err = SymbolTable::resolve(&FakeEngine::new().without_symbol("<init>"))
        .expect_err("constructor lookup must fail");
    assert_eq!(err.kind, SymbolKind::Constructor);
    assert_eq!(err.owner, ENGINE_CLASS);
}

#[test]
fn test_missing_symbol_prevents_any_session_call() {
    let engine = FakeEngine::new().without_symbol("getTrackLocationIce3Iterator");
    let plan = RunPlan::new(EngineMode::Default, EventCard::default());

    let err = run_events(&engine, &plan).expect_err("run must fail");
    assert!(matches!(err, BridgeError::Symbol(_)), "got {err:?}");

    // Nothing was constructed or called
    assert_eq!(calls(&engine), 0);
    assert_eq!(engine.live_handles(), 0);
}
