pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod foreign;
pub mod geometry;
pub mod handle;
#[cfg(feature = "jvm")]
pub mod jvm;
pub mod particle;
pub mod pipeline;
pub mod runtime;
pub mod session;
pub mod symbols;

pub use config::{AxisSpec, BridgeConfig, ConfigError, EngineSettings, EventCard, RuntimeConfig};
pub use context::BridgeContext;
pub use diagnostics::{exit_code, format_fatal};
pub use error::BridgeError;
pub use extract::{extract, EventResult, Framed, NamedParticle, PairedCursor, ParticleRecord};
pub use foreign::{ForeignEnv, ForeignError};
pub use particle::{Doublet, Flavor, ParticleDescriptor};
pub use pipeline::{run_events, run_with_runtime, RunPlan};
pub use runtime::{ForeignRuntime, RuntimeInitError};
pub use session::{EngineMode, SessionState, SessionStateError, SimulationSession};
pub use symbols::{SymbolResolutionError, SymbolTable};
