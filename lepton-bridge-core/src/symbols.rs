//! Symbol resolution
//!
//! Every class, method and field the bridge touches is resolved once, right
//! after the runtime is attached. The table is all-or-nothing: the first
//! missing symbol aborts resolution and no partial table is returned.

use crate::foreign::{ClassId, FieldId, ForeignEnv, MethodId, StaticMethodId};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

pub const ENGINE_CLASS: &str = "iceCube/uhe/event/JulietEventGenerator";
pub const CURSOR_CLASS: &str = "java/util/ListIterator";
pub const PARTICLE_CLASS: &str = "iceCube/uhe/particles/Particle";
pub const POINT_CLASS: &str = "geometry/J3Vector";
pub const DIRECTION_CLASS: &str = "geometry/J3UnitVector";
pub const LINE_CLASS: &str = "geometry/J3Line";

pub const CONSTRUCTOR: &str = "<init>";

/// flavor, doublet, energy, medium, 16 process toggles, start mode, seed
pub const PARAMETRIZED_CONSTRUCTOR_SIG: &str =
    concat!("(IIDI", "IIII", "IIII", "IIII", "IIII", "IJ)V");
pub const DEFAULT_CONSTRUCTOR_SIG: &str = "()V";

pub const POINT_SIG: &str = "Lgeometry/J3Vector;";
pub const DIRECTION_SIG: &str = "Lgeometry/J3UnitVector;";
pub const VECTOR_CONSTRUCTOR_SIG: &str = "(DDD)V";
pub const LINE_CONSTRUCTOR_SIG: &str = "(Lgeometry/J3Vector;Lgeometry/J3UnitVector;)V";
pub const RETURNS_POINT_SIG: &str = "()Lgeometry/J3Vector;";
pub const RETURNS_DIRECTION_SIG: &str = "()Lgeometry/J3UnitVector;";
pub const RETURNS_CURSOR_SIG: &str = "()Ljava/util/ListIterator;";
pub const DEFINE_PARTICLE_SIG: &str = "(IID)V";
pub const DEFINE_GEOMETRY_LINE_SIG: &str = "(Lgeometry/J3Line;)V";
pub const DEFINE_GEOMETRY_ANGLES_SIG: &str = "(DDDDD)V";
pub const SET_SHIFT_SIG: &str = "(Lgeometry/J3Vector;)V";
pub const PARTICLE_FIELD_SIG: &str = "LiceCube/uhe/particles/Particle;";
pub const PARTICLE_NAME_SIG: &str = "(II)Ljava/lang/String;";

/// What kind of symbol failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Constructor,
    Method,
    StaticMethod,
    Field,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Class => "class",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Method => "method",
            SymbolKind::StaticMethod => "static method",
            SymbolKind::Field => "field",
        };
        f.write_str(s)
    }
}

/// A symbol the engine does not provide. Indicates a contract mismatch with
/// the deployed engine, never a transient fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot find {kind} `{name}{signature}` in {owner}")]
pub struct SymbolResolutionError {
    pub kind: SymbolKind,
    pub owner: String,
    pub name: String,
    pub signature: String,
}

/// Methods and fields of the event generator
#[derive(Debug, Clone)]
pub struct EngineSymbols {
    pub class: ClassId,
    pub new_parametrized: MethodId,
    pub new_default: MethodId,
    pub run_single_event: MethodId,
    pub start_location_along_axis: MethodId,
    pub starts_in_earth_frame: MethodId,
    pub starts_in_detector_frame: MethodId,
    pub ends_in_detector_frame: MethodId,
    pub direction_in_earth_frame: MethodId,
    pub direction_in_detector_frame: MethodId,
    pub define_propagating_particle: MethodId,
    pub define_geometry_line: MethodId,
    pub define_geometry_angles: MethodId,
    pub configure_geometry: MethodId,
    pub set_start_location_along_axis: MethodId,
    pub set_geometry_shift: MethodId,
    pub particle_iterator: MethodId,
    pub track_particle_iterator: MethodId,
    pub location_iterator: MethodId,
    pub track_location_iterator: MethodId,
    pub prop_particle: FieldId,
    pub primary_energy: FieldId,
}

/// `java.util.ListIterator`
#[derive(Debug, Clone)]
pub struct CursorSymbols {
    pub class: ClassId,
    pub has_next: MethodId,
    pub next: MethodId,
}

/// The engine's particle descriptor class
#[derive(Debug, Clone)]
pub struct ParticleSymbols {
    pub class: ClassId,
    pub get_energy: MethodId,
    pub get_flavor: MethodId,
    pub get_doublet: MethodId,
    pub particle_name: StaticMethodId,
}

/// A three-component value class (point or unit direction)
#[derive(Debug, Clone)]
pub struct VectorSymbols {
    pub class: ClassId,
    pub new: MethodId,
    pub get_x: MethodId,
    pub get_y: MethodId,
    pub get_z: MethodId,
}

#[derive(Debug, Clone)]
pub struct LineSymbols {
    pub class: ClassId,
    pub new: MethodId,
}

/// Every identifier used by a session, resolved up front
#[derive(Debug, Clone)]
pub struct SymbolTable {
    pub engine: EngineSymbols,
    pub cursor: CursorSymbols,
    pub particle: ParticleSymbols,
    pub point: VectorSymbols,
    pub direction: VectorSymbols,
    pub line: LineSymbols,
}

impl SymbolTable {
    /// Resolve the full table, stopping at the first missing symbol.
    pub fn resolve<E: ForeignEnv + ?Sized>(env: &E) -> Result<Self, SymbolResolutionError> {
        let r = Resolver { env };

        let engine = r.class(ENGINE_CLASS)?;
        let engine = EngineSymbols {
            class: engine,
            run_single_event: r.method(engine, ENGINE_CLASS, "runSingleEvent", "()V")?,
            start_location_along_axis: r.method(
                engine,
                ENGINE_CLASS,
                "getStartLocationAlongTheAxis",
                "()D",
            )?,
            starts_in_earth_frame: r.method(
                engine,
                ENGINE_CLASS,
                "wherePrimaryParticleStartsInEarthCenterCoordinate",
                RETURNS_POINT_SIG,
            )?,
            starts_in_detector_frame: r.method(
                engine,
                ENGINE_CLASS,
                "wherePrimaryParticleStartsInIceCubeCoordinate",
                RETURNS_POINT_SIG,
            )?,
            ends_in_detector_frame: r.method(
                engine,
                ENGINE_CLASS,
                "wherePrimaryParticleEndsInIceCubeCoordinate",
                RETURNS_POINT_SIG,
            )?,
            direction_in_earth_frame: r.method(
                engine,
                ENGINE_CLASS,
                "getPrimaryParticleDirectionInEarthCenterCoordinate",
                RETURNS_DIRECTION_SIG,
            )?,
            direction_in_detector_frame: r.method(
                engine,
                ENGINE_CLASS,
                "getPrimaryParticleDirectionInIceCubeCoordinate",
                RETURNS_DIRECTION_SIG,
            )?,
            define_propagating_particle: r.method(
                engine,
                ENGINE_CLASS,
                "definePropagatingParticle",
                DEFINE_PARTICLE_SIG,
            )?,
            define_geometry_line: r.method(
                engine,
                ENGINE_CLASS,
                "definePropagationGeometry",
                DEFINE_GEOMETRY_LINE_SIG,
            )?,
            define_geometry_angles: r.method(
                engine,
                ENGINE_CLASS,
                "definePropagationGeometry",
                DEFINE_GEOMETRY_ANGLES_SIG,
            )?,
            configure_geometry: r.method(
                engine,
                ENGINE_CLASS,
                "configurePropagationGeometry",
                "()V",
            )?,
            set_start_location_along_axis: r.method(
                engine,
                ENGINE_CLASS,
                "setStartLocationAlongTheAxis",
                "(D)V",
            )?,
            set_geometry_shift: r.method(engine, ENGINE_CLASS, "setGeometryShift", SET_SHIFT_SIG)?,
            particle_iterator: r.method(
                engine,
                ENGINE_CLASS,
                "getParticleIterator",
                RETURNS_CURSOR_SIG,
            )?,
            track_particle_iterator: r.method(
                engine,
                ENGINE_CLASS,
                "getTrackParticleIterator",
                RETURNS_CURSOR_SIG,
            )?,
            location_iterator: r.method(
                engine,
                ENGINE_CLASS,
                "getLocationIce3Iterator",
                RETURNS_CURSOR_SIG,
            )?,
            track_location_iterator: r.method(
                engine,
                ENGINE_CLASS,
                "getTrackLocationIce3Iterator",
                RETURNS_CURSOR_SIG,
            )?,
            new_parametrized: r.constructor(engine, ENGINE_CLASS, PARAMETRIZED_CONSTRUCTOR_SIG)?,
            new_default: r.constructor(engine, ENGINE_CLASS, DEFAULT_CONSTRUCTOR_SIG)?,
            prop_particle: r.field(engine, ENGINE_CLASS, "propParticle", PARTICLE_FIELD_SIG)?,
            primary_energy: r.field(engine, ENGINE_CLASS, "primaryEnergy", "D")?,
        };

        let cursor = r.class(CURSOR_CLASS)?;
        let cursor = CursorSymbols {
            class: cursor,
            has_next: r.method(cursor, CURSOR_CLASS, "hasNext", "()Z")?,
            next: r.method(cursor, CURSOR_CLASS, "next", "()Ljava/lang/Object;")?,
        };

        let particle = r.class(PARTICLE_CLASS)?;
        let particle = ParticleSymbols {
            class: particle,
            get_energy: r.method(particle, PARTICLE_CLASS, "getEnergy", "()D")?,
            get_flavor: r.method(particle, PARTICLE_CLASS, "getFlavor", "()I")?,
            get_doublet: r.method(particle, PARTICLE_CLASS, "getDoublet", "()I")?,
            particle_name: r.static_method(
                particle,
                PARTICLE_CLASS,
                "particleName",
                PARTICLE_NAME_SIG,
            )?,
        };

        let point = r.vector(POINT_CLASS)?;
        let direction = r.vector(DIRECTION_CLASS)?;

        let line = r.class(LINE_CLASS)?;
        let line = LineSymbols {
            class: line,
            new: r.constructor(line, LINE_CLASS, LINE_CONSTRUCTOR_SIG)?,
        };

        info!("symbol table resolved");
        Ok(Self {
            engine,
            cursor,
            particle,
            point,
            direction,
            line,
        })
    }
}

struct Resolver<'e, E: ForeignEnv + ?Sized> {
    env: &'e E,
}

impl<E: ForeignEnv + ?Sized> Resolver<'_, E> {
    fn class(&self, name: &str) -> Result<ClassId, SymbolResolutionError> {
        debug!(class = name, "resolving class");
        self.env
            .find_class(name)
            .ok_or_else(|| missing(SymbolKind::Class, "the class path", name, ""))
    }

    fn method(
        &self,
        class: ClassId,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> Result<MethodId, SymbolResolutionError> {
        debug!(owner, method = name, signature, "resolving method");
        self.env
            .method_id(class, name, signature)
            .ok_or_else(|| missing(SymbolKind::Method, owner, name, signature))
    }

    fn constructor(
        &self,
        class: ClassId,
        owner: &str,
        signature: &str,
    ) -> Result<MethodId, SymbolResolutionError> {
        debug!(owner, signature, "resolving constructor");
        self.env
            .method_id(class, CONSTRUCTOR, signature)
            .ok_or_else(|| missing(SymbolKind::Constructor, owner, CONSTRUCTOR, signature))
    }

    fn static_method(
        &self,
        class: ClassId,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> Result<StaticMethodId, SymbolResolutionError> {
        debug!(owner, method = name, signature, "resolving static method");
        self.env
            .static_method_id(class, name, signature)
            .ok_or_else(|| missing(SymbolKind::StaticMethod, owner, name, signature))
    }

    fn field(
        &self,
        class: ClassId,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> Result<FieldId, SymbolResolutionError> {
        debug!(owner, field = name, signature, "resolving field");
        self.env
            .field_id(class, name, signature)
            .ok_or_else(|| missing(SymbolKind::Field, owner, name, signature))
    }

    fn vector(&self, class_name: &str) -> Result<VectorSymbols, SymbolResolutionError> {
        let class = self.class(class_name)?;
        Ok(VectorSymbols {
            class,
            new: self.constructor(class, class_name, VECTOR_CONSTRUCTOR_SIG)?,
            get_x: self.method(class, class_name, "getX", "()D")?,
            get_y: self.method(class, class_name, "getY", "()D")?,
            get_z: self.method(class, class_name, "getZ", "()D")?,
        })
    }
}

fn missing(kind: SymbolKind, owner: &str, name: &str, signature: &str) -> SymbolResolutionError {
    SymbolResolutionError {
        kind,
        owner: owner.to_string(),
        name: name.to_string(),
        signature: signature.to_string(),
    }
}
