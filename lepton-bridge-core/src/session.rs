//! Simulation session
//!
//! A session owns the engine instance and drives the configuration protocol
//! in order:
//!
//! ```text
//! Created -> Instantiated -> ParticleDefined -> GeometryDefined
//!         -> GeometryConfigured -> EventExecuted
//! ```
//!
//! Calling an operation out of order returns [`SessionStateError`] without
//! touching the engine. A failed foreign call leaves the state as it was.

use crate::config::{AxisSpec, EngineSettings, EventCard};
use crate::context::BridgeContext;
use crate::error::BridgeError;
use crate::foreign::{Arg, ForeignEnv, ForeignError, MethodId, ObjectId, ReturnKind};
use crate::geometry::{build_line, build_point};
use crate::handle::LocalRef;
use crate::particle::{Doublet, Flavor, ParticleDescriptor};
use glam::DVec3;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    Created,
    Instantiated,
    ParticleDefined,
    GeometryDefined,
    GeometryConfigured,
    EventExecuted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "Created",
            SessionState::Instantiated => "Instantiated",
            SessionState::ParticleDefined => "ParticleDefined",
            SessionState::GeometryDefined => "GeometryDefined",
            SessionState::GeometryConfigured => "GeometryConfigured",
            SessionState::EventExecuted => "EventExecuted",
        };
        f.write_str(s)
    }
}

/// States in which an operation may be called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AtLeast(SessionState),
    Exactly(SessionState),
    Between(SessionState, SessionState),
}

impl Requirement {
    pub fn admits(self, state: SessionState) -> bool {
        match self {
            Requirement::AtLeast(min) => state >= min,
            Requirement::Exactly(only) => state == only,
            Requirement::Between(min, max) => min <= state && state <= max,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::AtLeast(min) => write!(f, "{min} or later"),
            Requirement::Exactly(only) => write!(f, "{only}"),
            Requirement::Between(min, max) => write!(f, "{min} through {max}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{operation}` requires state {expected}, session is {actual}")]
pub struct SessionStateError {
    pub operation: &'static str,
    pub expected: Requirement,
    pub actual: SessionState,
}

/// How the engine is constructed. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMode {
    /// Full physics configuration passed to the constructor
    Parametrized(EngineSettings),
    /// No-argument constructor; the particle is configured afterwards
    Default,
}

pub struct SimulationSession<'e, E: ForeignEnv + ?Sized> {
    ctx: BridgeContext<'e, E>,
    mode: EngineMode,
    engine: Option<LocalRef<'e, E>>,
    state: SessionState,
}

impl<'e, E: ForeignEnv + ?Sized> SimulationSession<'e, E> {
    pub fn new(ctx: BridgeContext<'e, E>, mode: EngineMode) -> Self {
        Self {
            ctx,
            mode,
            engine: None,
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> BridgeContext<'e, E> {
        self.ctx
    }

    /// Engine instance, if the session has been instantiated.
    pub fn engine(&self) -> Option<ObjectId> {
        self.engine.as_ref().map(LocalRef::raw)
    }

    /// Check `expected` against the current state and return the engine.
    pub(crate) fn require(
        &self,
        operation: &'static str,
        expected: Requirement,
    ) -> Result<ObjectId, SessionStateError> {
        let error = SessionStateError {
            operation,
            expected,
            actual: self.state,
        };
        if !expected.admits(self.state) {
            return Err(error);
        }
        self.engine().ok_or(error)
    }

    fn call_void(
        &self,
        engine: ObjectId,
        name: &'static str,
        method: MethodId,
        args: &[Arg],
    ) -> Result<(), ForeignError> {
        debug!(method = name, "calling engine");
        self.ctx
            .env()
            .call_method(engine, method, ReturnKind::Void, args)?;
        Ok(())
    }

    /// Construct a fresh engine instance, releasing the previous one first.
    ///
    /// If construction fails the session is left in `Created`.
    pub fn instantiate(&mut self) -> Result<(), BridgeError> {
        if let Some(old) = self.engine.take() {
            debug!(handle = old.raw().0, "releasing previous engine instance");
            drop(old);
            self.state = SessionState::Created;
        }

        let engine = &self.ctx.symbols().engine;
        let raw = match &self.mode {
            EngineMode::Parametrized(settings) => {
                debug!(?settings, "constructing parametrized engine");
                self.ctx.env().new_object(
                    engine.class,
                    engine.new_parametrized,
                    &settings.constructor_args(),
                )?
            }
            EngineMode::Default => {
                debug!("constructing default engine");
                self.ctx
                    .env()
                    .new_object(engine.class, engine.new_default, &[])?
            }
        };
        self.engine = Some(LocalRef::new(self.ctx.env(), raw, "engine"));
        self.state = SessionState::Instantiated;
        info!(handle = raw.0, "engine instantiated");
        Ok(())
    }

    pub fn define_particle(
        &mut self,
        flavor: Flavor,
        doublet: Doublet,
        energy: f64,
    ) -> Result<(), BridgeError> {
        let engine = self.require(
            "define_particle",
            Requirement::AtLeast(SessionState::Instantiated),
        )?;
        let particle = ParticleDescriptor {
            flavor,
            doublet,
            energy,
        };
        particle
            .validate_primary()
            .map_err(|err| BridgeError::InvalidArgument(err.to_string()))?;

        self.call_void(
            engine,
            "definePropagatingParticle",
            self.ctx.symbols().engine.define_propagating_particle,
            &[
                Arg::Int(flavor.code()),
                Arg::Int(doublet.code()),
                Arg::Double(energy),
            ],
        )?;
        self.state = SessionState::ParticleDefined;
        Ok(())
    }

    /// Define the axis as a point [cm] and a direction, both detector frame.
    pub fn define_geometry_line(
        &mut self,
        position: DVec3,
        direction: DVec3,
    ) -> Result<(), BridgeError> {
        let engine = self.require(
            "define_geometry_line",
            Requirement::AtLeast(SessionState::ParticleDefined),
        )?;
        check_position(position)?;
        if !direction.is_finite() || direction.length_squared() == 0.0 {
            return Err(BridgeError::InvalidArgument(format!(
                "axis direction must be finite and non-zero, got {direction}"
            )));
        }

        let axis = build_line(self.ctx, position, direction)?;
        self.call_void(
            engine,
            "definePropagationGeometry(line)",
            self.ctx.symbols().engine.define_geometry_line,
            &[axis.as_arg()],
        )?;
        drop(axis);
        self.state = SessionState::GeometryDefined;
        Ok(())
    }

    /// Define the axis as a point [cm] and detector-frame angles [deg].
    pub fn define_geometry_angles(
        &mut self,
        position: DVec3,
        nadir_deg: f64,
        azimuth_deg: f64,
    ) -> Result<(), BridgeError> {
        let engine = self.require(
            "define_geometry_angles",
            Requirement::AtLeast(SessionState::ParticleDefined),
        )?;
        check_position(position)?;
        if !(nadir_deg.is_finite() && azimuth_deg.is_finite()) {
            return Err(BridgeError::InvalidArgument(format!(
                "axis angles must be finite, got nadir {nadir_deg} azimuth {azimuth_deg}"
            )));
        }

        self.call_void(
            engine,
            "definePropagationGeometry(angles)",
            self.ctx.symbols().engine.define_geometry_angles,
            &[
                Arg::Double(position.x),
                Arg::Double(position.y),
                Arg::Double(position.z),
                Arg::Double(nadir_deg),
                Arg::Double(azimuth_deg),
            ],
        )?;
        self.state = SessionState::GeometryDefined;
        Ok(())
    }

    /// Define particle and geometry from an event card.
    pub fn define_event(&mut self, card: &EventCard) -> Result<(), BridgeError> {
        self.define_particle(card.flavor, card.doublet, card.energy)?;
        match card.axis {
            AxisSpec::Direction { direction } => {
                self.define_geometry_line(card.position, direction)
            }
            AxisSpec::Angles {
                nadir_deg,
                azimuth_deg,
            } => self.define_geometry_angles(card.position, nadir_deg, azimuth_deg),
        }
    }

    pub fn configure_geometry(&mut self) -> Result<(), BridgeError> {
        let engine = self.require(
            "configure_geometry",
            Requirement::AtLeast(SessionState::GeometryDefined),
        )?;
        self.call_void(
            engine,
            "configurePropagationGeometry",
            self.ctx.symbols().engine.configure_geometry,
            &[],
        )?;
        self.state = SessionState::GeometryConfigured;
        Ok(())
    }

    /// Run one event. May be repeated on the same configured geometry.
    pub fn run_event(&mut self) -> Result<(), BridgeError> {
        let engine = self.require(
            "run_event",
            Requirement::AtLeast(SessionState::GeometryConfigured),
        )?;
        self.call_void(
            engine,
            "runSingleEvent",
            self.ctx.symbols().engine.run_single_event,
            &[],
        )?;
        self.state = SessionState::EventExecuted;
        Ok(())
    }

    /// Override the start location [cm along the axis from the Earth
    /// entrance]. Configuration recomputes it, so this must follow
    /// `configure_geometry` directly.
    pub fn set_start_location_along_axis(&mut self, cm: f64) -> Result<(), BridgeError> {
        let engine = self.require(
            "set_start_location_along_axis",
            Requirement::Exactly(SessionState::GeometryConfigured),
        )?;
        if !(cm.is_finite() && cm > 0.0) {
            return Err(BridgeError::InvalidArgument(format!(
                "start location must be a positive distance in cm, got {cm}"
            )));
        }
        self.call_void(
            engine,
            "setStartLocationAlongTheAxis",
            self.ctx.symbols().engine.set_start_location_along_axis,
            &[Arg::Double(cm)],
        )?;
        Ok(())
    }

    /// Shift the detector-frame reference point [cm] used when the engine
    /// starts propagation near the detector. Consumed by configuration.
    pub fn set_geometry_shift(&mut self, position: DVec3) -> Result<(), BridgeError> {
        let engine = self.require(
            "set_geometry_shift",
            Requirement::Between(SessionState::Instantiated, SessionState::GeometryDefined),
        )?;
        check_position(position)?;
        let point = build_point(self.ctx, position)?;
        self.call_void(
            engine,
            "setGeometryShift",
            self.ctx.symbols().engine.set_geometry_shift,
            &[point.as_arg()],
        )?;
        Ok(())
    }
}

fn check_position(position: DVec3) -> Result<(), BridgeError> {
    if !position.is_finite() {
        return Err(BridgeError::InvalidArgument(format!(
            "position must be finite, got {position}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_admit_expected_states() {
        use SessionState::*;
        assert!(Requirement::AtLeast(ParticleDefined).admits(EventExecuted));
        assert!(!Requirement::AtLeast(ParticleDefined).admits(Instantiated));
        assert!(Requirement::Exactly(GeometryConfigured).admits(GeometryConfigured));
        assert!(!Requirement::Exactly(GeometryConfigured).admits(EventExecuted));
        let shift = Requirement::Between(Instantiated, GeometryDefined);
        assert!(shift.admits(ParticleDefined));
        assert!(!shift.admits(Created));
        assert!(!shift.admits(GeometryConfigured));
    }

    #[test]
    fn state_error_reads_well() {
        let err = SessionStateError {
            operation: "run_event",
            expected: Requirement::AtLeast(SessionState::GeometryConfigured),
            actual: SessionState::Created,
        };
        assert_eq!(
            err.to_string(),
            "`run_event` requires state GeometryConfigured or later, session is Created"
        );
    }
}
