//! Quantified properties of the configure/run/extract cycle

use glam::DVec3;
use lepton_bridge_core::extract::extract;
use lepton_bridge_core::session::{EngineMode, SessionState, SimulationSession};
use lepton_bridge_core::symbols::SymbolTable;
use lepton_bridge_core::tests::test_helpers::{approx_eq, EventScript, FakeEngine};
use lepton_bridge_core::{BridgeContext, Doublet, Flavor};
use proptest::prelude::*;

fn lepton() -> impl Strategy<Value = Flavor> {
    prop_oneof![Just(Flavor::Electron), Just(Flavor::Muon), Just(Flavor::Tau)]
}

fn doublet() -> impl Strategy<Value = Doublet> {
    prop_oneof![Just(Doublet::Neutrino), Just(Doublet::Charged)]
}

proptest! {
    #[test]
    fn prop_cycle_round_trips_primary_energy(
        flavor in lepton(),
        doublet in doublet(),
        energy in 1.0f64..1e12,
        interactions in 0usize..8,
        nadir in 0.0f64..180.0,
        azimuth in 0.0f64..360.0,
        x in -1e5f64..1e5,
    ) {
        let engine = FakeEngine::new().with_script(EventScript {
            interactions,
            ..EventScript::default()
        });
        let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
        let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);

        session.instantiate().expect("instantiate");
        session.define_particle(flavor, doublet, energy).expect("particle");
        session.define_geometry_angles(DVec3::new(x, 0.0, 0.0), nadir, azimuth).expect("geometry");
        session.configure_geometry().expect("configure");
        session.run_event().expect("run");
        let live = engine.live_handles();
        let result = extract(&session).expect("extract");

        prop_assert_eq!(result.primary_energy, energy);
        prop_assert_eq!(result.track_records.len(), interactions + 1);
        prop_assert_eq!(result.cascade_records.len(), interactions);
        let recomputed = result.start.detector.distance(result.end);
        prop_assert!(approx_eq(result.total_length, recomputed, 1e-9 * recomputed.max(1.0)));
        prop_assert_eq!(engine.live_handles(), live);
        prop_assert_eq!(engine.invalid_releases(), 0);
    }

    #[test]
    fn prop_out_of_order_calls_never_move_state(
        ops in prop::collection::vec(0u8..5, 1..20),
    ) {
        let engine = FakeEngine::new();
        let symbols = SymbolTable::resolve(&engine).expect("symbols resolve");
        let mut session = SimulationSession::new(BridgeContext::new(&engine, &symbols), EngineMode::Default);

        for op in ops {
            let result = match op {
                0 => session.define_particle(Flavor::Tau, Doublet::Neutrino, 1e10),
                1 => session.define_geometry_angles(DVec3::ZERO, 0.0, 0.0),
                2 => session.configure_geometry(),
                3 => session.run_event(),
                _ => extract(&session).map(|_| ()),
            };
            prop_assert!(result.is_err());
            prop_assert_eq!(session.state(), SessionState::Created);
        }
        prop_assert_eq!(engine.live_handles(), 0);
    }
}
