//! End-to-end driver: resolve, configure, run and extract

use crate::config::EventCard;
use crate::context::BridgeContext;
use crate::error::BridgeError;
use crate::extract::{extract, EventResult};
use crate::foreign::ForeignEnv;
use crate::runtime::ForeignRuntime;
use crate::session::{EngineMode, SimulationSession};
use crate::symbols::SymbolTable;
use tracing::info;

/// What to run against a freshly attached environment
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub mode: EngineMode,
    pub card: EventCard,
    /// Events to run on the configured geometry
    pub events: usize,
}

impl RunPlan {
    pub fn new(mode: EngineMode, card: EventCard) -> Self {
        Self {
            mode,
            card,
            events: 1,
        }
    }
}

/// Resolve symbols on `env`, configure one session and run `plan.events`
/// events on it, extracting each.
pub fn run_events<E: ForeignEnv + ?Sized>(
    env: &E,
    plan: &RunPlan,
) -> Result<Vec<EventResult>, BridgeError> {
    if plan.events == 0 {
        return Err(BridgeError::InvalidArgument(
            "event count must be at least 1".into(),
        ));
    }

    let symbols = SymbolTable::resolve(env)?;
    let ctx = BridgeContext::new(env, &symbols);
    let mut session = SimulationSession::new(ctx, plan.mode.clone());

    session.instantiate()?;
    if let Some(shift) = plan.card.geometry_shift {
        session.set_geometry_shift(shift)?;
    }
    session.define_event(&plan.card)?;
    session.configure_geometry()?;
    if let Some(cm) = plan.card.start_location_cm {
        session.set_start_location_along_axis(cm)?;
    }

    let mut results = Vec::with_capacity(plan.events);
    for n in 0..plan.events {
        session.run_event()?;
        let result = extract(&session)?;
        info!(
            event = n + 1,
            tracks = result.track_records.len(),
            cascades = result.cascade_records.len(),
            "event extracted"
        );
        results.push(result);
    }
    Ok(results)
}

/// Attach to `runtime`, run the plan, then destroy the runtime whether or
/// not the run succeeded.
pub fn run_with_runtime<R: ForeignRuntime>(
    runtime: R,
    plan: &RunPlan,
) -> Result<Vec<EventResult>, BridgeError> {
    let outcome = match runtime.attach() {
        Ok(env) => run_events(&env, plan),
        Err(err) => Err(err.into()),
    };
    runtime.destroy();
    info!("foreign runtime destroyed");
    outcome
}
