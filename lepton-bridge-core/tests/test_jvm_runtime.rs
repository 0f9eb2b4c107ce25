//! Starting the in-process JVM and resolving against it
#![cfg(feature = "jvm")]

use lepton_bridge_core::config::{BridgeConfig, RuntimeConfig};
use lepton_bridge_core::jvm::JvmRuntime;
use lepton_bridge_core::symbols::{SymbolKind, ENGINE_CLASS};
use lepton_bridge_core::{
    format_fatal, run_with_runtime, BridgeError, EngineMode, ForeignEnv, ForeignRuntime, RunPlan,
    SymbolTable,
};

// One JVM per process, so the whole lifecycle lives in a single test.
#[test]
fn test_jvm_lifecycle_without_engine_classes() {
    let runtime_config = RuntimeConfig {
        class_path: "/nonexistent/lepton-bridge-classes".to_string(),
        ..RuntimeConfig::default()
    };
    let runtime = JvmRuntime::create(&runtime_config).expect("jvm starts");

    {
        let env = runtime.attach().expect("attach");

        // Misses clear their exception, so later lookups still succeed
        assert!(env.find_class(ENGINE_CLASS).is_none());
        let cursor = env.find_class("java/util/ListIterator").expect("jdk class");
        assert!(env.method_id(cursor, "noSuchMethod", "()V").is_none());
        assert!(env.field_id(cursor, "noSuchField", "I").is_none());
        assert!(env.method_id(cursor, "hasNext", "()Z").is_some());

        let err = SymbolTable::resolve(&env).expect_err("engine classes are absent");
        assert_eq!(err.kind, SymbolKind::Class);
        assert_eq!(err.name, ENGINE_CLASS);
    }

    let config = BridgeConfig::default();
    let plan = RunPlan::new(EngineMode::Default, config.event);
    let err = run_with_runtime(runtime, &plan).expect_err("resolution fails");
    assert!(matches!(err, BridgeError::Symbol(_)));
    let line = format_fatal(&err);
    assert!(line.starts_with("fatal symbol resolution error: cannot find class"));
    assert!(!line.contains('\n'));
}
