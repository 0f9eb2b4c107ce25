//! Scoped guards for foreign object references
//!
//! Each guard owns exactly one local reference and releases it on drop, so a
//! reference is released on every exit path including `?` returns. There is
//! one guard per handle category:
//!
//! - [`ValueObject`]: points, unit directions and lines, either built as call
//!   arguments or returned by the engine.
//! - [`Cursor`]: a `ListIterator` over one of the engine's result lists.
//! - [`Descriptor`]: a particle returned by a cursor or read from a field.

use crate::context::BridgeContext;
use crate::error::BridgeError;
use crate::foreign::{Arg, ForeignEnv, ForeignError, ObjectId, ReturnKind};
use crate::particle::{Doublet, Flavor, ParticleDescriptor};
use crate::symbols::VectorSymbols;
use glam::DVec3;
use tracing::trace;

/// Owner of a single local reference
pub struct LocalRef<'e, E: ForeignEnv + ?Sized> {
    env: &'e E,
    raw: ObjectId,
    label: &'static str,
}

impl<'e, E: ForeignEnv + ?Sized> LocalRef<'e, E> {
    /// Take ownership of a reference just returned by `env`.
    pub fn new(env: &'e E, raw: ObjectId, label: &'static str) -> Self {
        trace!(handle = raw.0, label, "acquired local reference");
        Self { env, raw, label }
    }

    pub fn raw(&self) -> ObjectId {
        self.raw
    }
}

impl<E: ForeignEnv + ?Sized> Drop for LocalRef<'_, E> {
    fn drop(&mut self) {
        trace!(handle = self.raw.0, label = self.label, "releasing local reference");
        self.env.delete_local_ref(self.raw);
    }
}

impl<E: ForeignEnv + ?Sized> std::fmt::Debug for LocalRef<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRef")
            .field("raw", &self.raw)
            .field("label", &self.label)
            .finish()
    }
}

/// Which value class a [`ValueObject`] is an instance of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Point,
    Direction,
    Line,
}

impl ValueKind {
    fn label(self) -> &'static str {
        match self {
            ValueKind::Point => "point",
            ValueKind::Direction => "direction",
            ValueKind::Line => "line",
        }
    }
}

/// Guard for a point, direction or line object
pub struct ValueObject<'e, E: ForeignEnv + ?Sized> {
    ctx: BridgeContext<'e, E>,
    handle: LocalRef<'e, E>,
    kind: ValueKind,
}

impl<'e, E: ForeignEnv + ?Sized> ValueObject<'e, E> {
    pub fn new(ctx: BridgeContext<'e, E>, raw: ObjectId, kind: ValueKind) -> Self {
        Self {
            ctx,
            handle: LocalRef::new(ctx.env(), raw, kind.label()),
            kind,
        }
    }

    pub fn raw(&self) -> ObjectId {
        self.handle.raw()
    }

    pub fn as_arg(&self) -> Arg {
        Arg::Object(self.raw())
    }

    /// Read the (x, y, z) components through the class's own accessors.
    pub fn components(&self) -> Result<DVec3, ForeignError> {
        let symbols = self.ctx.symbols();
        let accessors = match self.kind {
            ValueKind::Point => &symbols.point,
            ValueKind::Direction => &symbols.direction,
            ValueKind::Line => return Err(ForeignError::NoComponents("line")),
        };
        read_components(self.ctx.env(), self.raw(), accessors)
    }
}

fn read_components<E: ForeignEnv + ?Sized>(
    env: &E,
    raw: ObjectId,
    accessors: &VectorSymbols,
) -> Result<DVec3, ForeignError> {
    let x = env
        .call_method(raw, accessors.get_x, ReturnKind::Double, &[])?
        .into_f64()?;
    let y = env
        .call_method(raw, accessors.get_y, ReturnKind::Double, &[])?
        .into_f64()?;
    let z = env
        .call_method(raw, accessors.get_z, ReturnKind::Double, &[])?
        .into_f64()?;
    Ok(DVec3::new(x, y, z))
}

/// Guard for a `ListIterator` over one of the engine's result lists
pub struct Cursor<'e, E: ForeignEnv + ?Sized> {
    ctx: BridgeContext<'e, E>,
    handle: LocalRef<'e, E>,
}

impl<'e, E: ForeignEnv + ?Sized> Cursor<'e, E> {
    pub fn new(ctx: BridgeContext<'e, E>, raw: ObjectId, label: &'static str) -> Self {
        Self {
            ctx,
            handle: LocalRef::new(ctx.env(), raw, label),
        }
    }

    pub fn has_next(&self) -> Result<bool, ForeignError> {
        let cursor = &self.ctx.symbols().cursor;
        self.ctx
            .env()
            .call_method(self.handle.raw(), cursor.has_next, ReturnKind::Boolean, &[])?
            .into_bool()
    }

    fn next_raw(&self) -> Result<ObjectId, ForeignError> {
        let cursor = &self.ctx.symbols().cursor;
        self.ctx
            .env()
            .call_method(self.handle.raw(), cursor.next, ReturnKind::Object, &[])?
            .into_object()
    }

    /// Advance and take the element as a particle descriptor.
    pub fn next_descriptor(&self) -> Result<Descriptor<'e, E>, ForeignError> {
        let raw = self.next_raw()?;
        Ok(Descriptor::new(self.ctx, raw))
    }

    /// Advance and take the element as a point.
    pub fn next_point(&self) -> Result<ValueObject<'e, E>, ForeignError> {
        let raw = self.next_raw()?;
        Ok(ValueObject::new(self.ctx, raw, ValueKind::Point))
    }
}

/// Guard for a particle object
pub struct Descriptor<'e, E: ForeignEnv + ?Sized> {
    ctx: BridgeContext<'e, E>,
    handle: LocalRef<'e, E>,
}

impl<'e, E: ForeignEnv + ?Sized> Descriptor<'e, E> {
    pub fn new(ctx: BridgeContext<'e, E>, raw: ObjectId) -> Self {
        Self {
            ctx,
            handle: LocalRef::new(ctx.env(), raw, "particle"),
        }
    }

    pub fn energy(&self) -> Result<f64, ForeignError> {
        let particle = &self.ctx.symbols().particle;
        self.ctx
            .env()
            .call_method(self.handle.raw(), particle.get_energy, ReturnKind::Double, &[])?
            .into_f64()
    }

    pub fn flavor_code(&self) -> Result<i32, ForeignError> {
        let particle = &self.ctx.symbols().particle;
        self.ctx
            .env()
            .call_method(self.handle.raw(), particle.get_flavor, ReturnKind::Int, &[])?
            .into_i32()
    }

    pub fn doublet_code(&self) -> Result<i32, ForeignError> {
        let particle = &self.ctx.symbols().particle;
        self.ctx
            .env()
            .call_method(self.handle.raw(), particle.get_doublet, ReturnKind::Int, &[])?
            .into_i32()
    }

    /// Read energy, flavor and doublet in one go.
    pub fn read(&self) -> Result<ParticleDescriptor, BridgeError> {
        let energy = self.energy()?;
        let flavor = Flavor::from_code(self.flavor_code()?)?;
        let doublet = Doublet::from_code(self.doublet_code()?)?;
        Ok(ParticleDescriptor {
            flavor,
            doublet,
            energy,
        })
    }

    /// Display name as the engine spells it. The returned string object is
    /// itself a local reference and is released before returning.
    pub fn display_name(&self, particle: &ParticleDescriptor) -> Result<String, ForeignError> {
        engine_particle_name(self.ctx, particle.flavor, particle.doublet)
    }
}

/// Ask the engine for the display name of a (flavor, doublet) pair.
pub fn engine_particle_name<E: ForeignEnv + ?Sized>(
    ctx: BridgeContext<'_, E>,
    flavor: Flavor,
    doublet: Doublet,
) -> Result<String, ForeignError> {
    let particle = &ctx.symbols().particle;
    let raw = ctx
        .env()
        .call_static_method(
            particle.class,
            particle.particle_name,
            ReturnKind::Object,
            &[Arg::Int(flavor.code()), Arg::Int(doublet.code())],
        )?
        .into_object()?;
    let name = LocalRef::new(ctx.env(), raw, "particle name");
    ctx.env().read_string(name.raw())
}
