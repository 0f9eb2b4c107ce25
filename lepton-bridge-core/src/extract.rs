//! Reading an executed event out of the engine
//!
//! The engine exposes its results as two pairs of lists: cascade particles
//! with their interaction points, and the track (the propagating particle at
//! each step) with its points. Each pair is walked with a [`PairedCursor`]
//! that advances both cursors together. Per-element handles are released
//! before the next element is read; the cursors and the summary objects are
//! released once both pairs are done, or on the first error.

use crate::context::BridgeContext;
use crate::error::BridgeError;
use crate::foreign::{ForeignEnv, ForeignError, MethodId, ObjectId, ReturnKind};
use crate::handle::{Cursor, Descriptor, ValueKind, ValueObject};
use crate::particle::ParticleDescriptor;
use crate::session::{Requirement, SessionState, SimulationSession};
use glam::DVec3;
use serde::Serialize;
use tracing::{debug, warn};

/// One element of a cascade or track sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleRecord {
    pub particle: ParticleDescriptor,
    pub name: String,
    /// Detector frame [cm]
    pub position: DVec3,
    /// Distance from the detector-frame start location [cm]
    pub distance_from_start: f64,
}

/// A vector given in both coordinate frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Framed {
    pub earth_center: DVec3,
    pub detector: DVec3,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedParticle {
    pub particle: ParticleDescriptor,
    pub name: String,
}

/// Everything read back from one executed event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventResult {
    /// [GeV]
    pub primary_energy: f64,
    /// [GeV]
    pub final_energy: f64,
    /// The propagating particle after the run
    pub final_particle: NamedParticle,
    /// [cm]
    pub start: Framed,
    /// Detector frame [cm]
    pub end: DVec3,
    pub direction: Framed,
    /// Start location along the axis, measured from the Earth entrance [cm]
    pub distance_along_axis_from_entry: f64,
    /// Detector-frame distance from start to end [cm]
    pub total_length: f64,
    pub cascade_records: Vec<ParticleRecord>,
    pub track_records: Vec<ParticleRecord>,
}

impl EventResult {
    /// Energy deposited in cascades [GeV]
    pub fn cascade_total_energy(&self) -> f64 {
        self.cascade_records
            .iter()
            .map(|r| r.particle.energy)
            .sum()
    }
}

/// Handles held for the whole extraction, in acquisition order
struct EventHandles<'e, E: ForeignEnv + ?Sized> {
    particles: Cursor<'e, E>,
    track_particles: Cursor<'e, E>,
    locations: Cursor<'e, E>,
    track_locations: Cursor<'e, E>,
    propagating: Descriptor<'e, E>,
    start_earth: ValueObject<'e, E>,
    start_detector: ValueObject<'e, E>,
    end_detector: ValueObject<'e, E>,
    direction_earth: ValueObject<'e, E>,
    direction_detector: ValueObject<'e, E>,
}

impl<'e, E: ForeignEnv + ?Sized> EventHandles<'e, E> {
    fn acquire(ctx: BridgeContext<'e, E>, engine: ObjectId) -> Result<Self, ForeignError> {
        let s = &ctx.symbols().engine;
        Ok(Self {
            particles: cursor(ctx, engine, s.particle_iterator, "particle cursor")?,
            track_particles: cursor(
                ctx,
                engine,
                s.track_particle_iterator,
                "track particle cursor",
            )?,
            locations: cursor(ctx, engine, s.location_iterator, "location cursor")?,
            track_locations: cursor(
                ctx,
                engine,
                s.track_location_iterator,
                "track location cursor",
            )?,
            propagating: {
                let raw = ctx
                    .env()
                    .get_field(engine, s.prop_particle, ReturnKind::Object)?
                    .into_object()?;
                Descriptor::new(ctx, raw)
            },
            start_earth: value(ctx, engine, s.starts_in_earth_frame, ValueKind::Point)?,
            start_detector: value(ctx, engine, s.starts_in_detector_frame, ValueKind::Point)?,
            end_detector: value(ctx, engine, s.ends_in_detector_frame, ValueKind::Point)?,
            direction_earth: value(
                ctx,
                engine,
                s.direction_in_earth_frame,
                ValueKind::Direction,
            )?,
            direction_detector: value(
                ctx,
                engine,
                s.direction_in_detector_frame,
                ValueKind::Direction,
            )?,
        })
    }
}

fn cursor<'e, E: ForeignEnv + ?Sized>(
    ctx: BridgeContext<'e, E>,
    engine: ObjectId,
    method: MethodId,
    label: &'static str,
) -> Result<Cursor<'e, E>, ForeignError> {
    debug!(cursor = label, "opening cursor");
    let raw = ctx
        .env()
        .call_method(engine, method, ReturnKind::Object, &[])?
        .into_object()?;
    Ok(Cursor::new(ctx, raw, label))
}

fn value<'e, E: ForeignEnv + ?Sized>(
    ctx: BridgeContext<'e, E>,
    engine: ObjectId,
    method: MethodId,
    kind: ValueKind,
) -> Result<ValueObject<'e, E>, ForeignError> {
    let raw = ctx
        .env()
        .call_method(engine, method, ReturnKind::Object, &[])?
        .into_object()?;
    Ok(ValueObject::new(ctx, raw, kind))
}

/// Lock-step walk over a descriptor cursor and its position cursor.
///
/// Yields one (descriptor, position) pair per step. Stops after the first
/// error; a step where only one cursor has an element is reported as
/// [`BridgeError::PairingMismatch`].
pub struct PairedCursor<'c, 'e, E: ForeignEnv + ?Sized> {
    sequence: &'static str,
    particles: &'c Cursor<'e, E>,
    positions: &'c Cursor<'e, E>,
    index: usize,
    finished: bool,
}

impl<'c, 'e, E: ForeignEnv + ?Sized> PairedCursor<'c, 'e, E> {
    pub fn new(
        sequence: &'static str,
        particles: &'c Cursor<'e, E>,
        positions: &'c Cursor<'e, E>,
    ) -> Self {
        Self {
            sequence,
            particles,
            positions,
            index: 0,
            finished: false,
        }
    }

    fn step(&mut self) -> Result<Option<(Descriptor<'e, E>, ValueObject<'e, E>)>, BridgeError> {
        let more_particles = self.particles.has_next()?;
        let more_positions = self.positions.has_next()?;
        match (more_particles, more_positions) {
            (false, false) => Ok(None),
            (true, true) => {
                let descriptor = self.particles.next_descriptor()?;
                let position = self.positions.next_point()?;
                self.index += 1;
                Ok(Some((descriptor, position)))
            }
            (true, false) => Err(self.mismatch("particle cursor has more elements")),
            (false, true) => Err(self.mismatch("location cursor has more elements")),
        }
    }

    fn mismatch(&self, detail: &'static str) -> BridgeError {
        BridgeError::PairingMismatch {
            sequence: self.sequence,
            index: self.index,
            detail,
        }
    }
}

impl<'e, E: ForeignEnv + ?Sized> Iterator for PairedCursor<'_, 'e, E> {
    type Item = Result<(Descriptor<'e, E>, ValueObject<'e, E>), BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let step = self.step().transpose();
        if !matches!(step, Some(Ok(_))) {
            self.finished = true;
        }
        step
    }
}

fn walk<E: ForeignEnv + ?Sized>(
    sequence: &'static str,
    particles: &Cursor<'_, E>,
    positions: &Cursor<'_, E>,
    start: DVec3,
) -> Result<Vec<ParticleRecord>, BridgeError> {
    let mut records = Vec::new();
    for step in PairedCursor::new(sequence, particles, positions) {
        let (descriptor, point) = step?;
        let particle = descriptor.read()?;
        let name = descriptor.display_name(&particle)?;
        let position = point.components()?;
        records.push(ParticleRecord {
            particle,
            name,
            position,
            distance_from_start: position.distance(start),
        });
    }
    debug!(sequence, count = records.len(), "sequence read");
    Ok(records)
}

/// Read the results of the event the session just ran.
pub fn extract<E: ForeignEnv + ?Sized>(
    session: &SimulationSession<'_, E>,
) -> Result<EventResult, BridgeError> {
    let engine = session.require("extract", Requirement::Exactly(SessionState::EventExecuted))?;
    let ctx = session.context();
    let env = ctx.env();
    let symbols = &ctx.symbols().engine;

    let handles = EventHandles::acquire(ctx, engine)?;

    let primary_energy = env
        .get_field(engine, symbols.primary_energy, ReturnKind::Double)?
        .into_f64()?;
    let final_particle = handles.propagating.read()?;
    let final_name = handles.propagating.display_name(&final_particle)?;

    let start = Framed {
        earth_center: handles.start_earth.components()?,
        detector: handles.start_detector.components()?,
    };
    let distance_along_axis_from_entry = env
        .call_method(engine, symbols.start_location_along_axis, ReturnKind::Double, &[])?
        .into_f64()?;
    let direction = Framed {
        earth_center: handles.direction_earth.components()?,
        detector: handles.direction_detector.components()?,
    };
    let end = handles.end_detector.components()?;
    if end == DVec3::ZERO {
        warn!("engine reported the detector origin as end location; it may be unset");
    }

    let total_length = start.detector.distance(end);

    let track_records = walk(
        "track",
        &handles.track_particles,
        &handles.track_locations,
        start.detector,
    )?;
    let cascade_records = walk(
        "cascade",
        &handles.particles,
        &handles.locations,
        start.detector,
    )?;

    drop(handles);

    Ok(EventResult {
        primary_energy,
        final_energy: final_particle.energy,
        final_particle: NamedParticle {
            particle: final_particle,
            name: final_name,
        },
        start,
        end,
        direction,
        distance_along_axis_from_entry,
        total_length,
        cascade_records,
        track_records,
    })
}
