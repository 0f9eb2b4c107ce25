//! Construction of the short-lived geometry objects passed to the engine

use crate::context::BridgeContext;
use crate::foreign::{Arg, ForeignEnv, ForeignError};
use crate::handle::{ValueKind, ValueObject};
use crate::symbols::VectorSymbols;
use glam::DVec3;
use tracing::debug;

/// A propagation axis built in the foreign runtime.
///
/// Owns the line and the point and direction it was composed from. Fields
/// drop in declaration order, so the line is released first, then the
/// direction, then the point.
pub struct AxisLine<'e, E: ForeignEnv + ?Sized> {
    pub line: ValueObject<'e, E>,
    pub direction: ValueObject<'e, E>,
    pub point: ValueObject<'e, E>,
}

impl<E: ForeignEnv + ?Sized> AxisLine<'_, E> {
    pub fn as_arg(&self) -> Arg {
        self.line.as_arg()
    }
}

/// Build a point [cm].
pub fn build_point<'e, E: ForeignEnv + ?Sized>(
    ctx: BridgeContext<'e, E>,
    position: DVec3,
) -> Result<ValueObject<'e, E>, ForeignError> {
    build_vector(ctx, &ctx.symbols().point, ValueKind::Point, position)
}

/// Build a unit direction. The engine normalizes the components itself.
pub fn build_direction<'e, E: ForeignEnv + ?Sized>(
    ctx: BridgeContext<'e, E>,
    direction: DVec3,
) -> Result<ValueObject<'e, E>, ForeignError> {
    build_vector(ctx, &ctx.symbols().direction, ValueKind::Direction, direction)
}

fn build_vector<'e, E: ForeignEnv + ?Sized>(
    ctx: BridgeContext<'e, E>,
    class: &VectorSymbols,
    kind: ValueKind,
    v: DVec3,
) -> Result<ValueObject<'e, E>, ForeignError> {
    debug!(?kind, x = v.x, y = v.y, z = v.z, "constructing value object");
    let raw = ctx.env().new_object(
        class.class,
        class.new,
        &[Arg::Double(v.x), Arg::Double(v.y), Arg::Double(v.z)],
    )?;
    Ok(ValueObject::new(ctx, raw, kind))
}

/// Build the point, the direction and the line through them, in that order.
///
/// If any step fails, whatever was already built is released before the
/// error is returned.
pub fn build_line<'e, E: ForeignEnv + ?Sized>(
    ctx: BridgeContext<'e, E>,
    position: DVec3,
    direction: DVec3,
) -> Result<AxisLine<'e, E>, ForeignError> {
    let point = build_point(ctx, position)?;
    let direction = build_direction(ctx, direction)?;

    let line_symbols = &ctx.symbols().line;
    debug!("constructing propagation axis");
    let raw = ctx.env().new_object(
        line_symbols.class,
        line_symbols.new,
        &[point.as_arg(), direction.as_arg()],
    )?;
    let line = ValueObject::new(ctx, raw, ValueKind::Line);

    Ok(AxisLine {
        line,
        direction,
        point,
    })
}

/// Detector-frame unit vector for a (nadir, azimuth) pair in degrees.
///
/// Same convention the engine applies to the angle form of the geometry:
/// `x = sinθ sinφ`, `y = sinθ cosφ`, `z = cosθ`.
pub fn direction_from_angles(nadir_deg: f64, azimuth_deg: f64) -> DVec3 {
    let (sin_theta, cos_theta) = nadir_deg.to_radians().sin_cos();
    let (sin_phi, cos_phi) = azimuth_deg.to_radians().sin_cos();
    DVec3::new(sin_theta * sin_phi, sin_theta * cos_phi, cos_theta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_helpers::approx_eq;

    #[test]
    fn zero_nadir_points_along_z() {
        let d = direction_from_angles(0.0, 0.0);
        assert!(approx_eq(d.x, 0.0, 1e-12));
        assert!(approx_eq(d.y, 0.0, 1e-12));
        assert!(approx_eq(d.z, 1.0, 1e-12));
    }

    #[test]
    fn horizontal_axis_follows_azimuth() {
        let d = direction_from_angles(90.0, 90.0);
        assert!(approx_eq(d.x, 1.0, 1e-12));
        assert!(approx_eq(d.y, 0.0, 1e-12));
        assert!(approx_eq(d.z, 0.0, 1e-12));
        assert!(approx_eq(direction_from_angles(37.0, 211.0).length(), 1.0, 1e-12));
    }
}
