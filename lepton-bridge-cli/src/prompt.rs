//! Console prompts for the interactive run mode

use glam::DVec3;
use lepton_bridge_core::config::{AxisSpec, EventCard};
use lepton_bridge_core::geometry::direction_from_angles;
use lepton_bridge_core::{Doublet, Flavor};
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// Ask for the particle, position and axis of one event.
///
/// Unparsable answers are asked again; end of input is an error.
pub fn read_event_card<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<EventCard> {
    let flavor: Flavor = ask(input, out, "flavor? (0[e]/1[mu]/2[tau])->", |f: &Flavor| {
        f.is_lepton()
    })?;
    let doublet: Doublet = ask(input, out, "doublet? (0[neutrino]/1[charged lepton])->", |_| true)?;
    let energy: f64 = ask(input, out, "energy? [GeV]->", |e: &f64| e.is_finite() && *e > 0.0)?;

    let position = DVec3::new(
        ask(input, out, "x [cm] in the ice3 coordinate->", finite)?,
        ask(input, out, "y [cm] in the ice3 coordinate->", finite)?,
        ask(input, out, "z [cm] in the ice3 coordinate->", finite)?,
    );

    let by_angles: u8 = ask(input, out, "axis? (0[direction vector]/1[nadir and azimuth])->", |v| {
        *v <= 1
    })?;
    let axis = if by_angles == 1 {
        let nadir_deg = ask(input, out, "nadir [deg] in the ice3 coordinate->", finite)?;
        let azimuth_deg = ask(input, out, "azimuth [deg] in the ice3 coordinate->", finite)?;
        let n = direction_from_angles(nadir_deg, azimuth_deg);
        writeln!(out, "axis direction ({:.4}, {:.4}, {:.4})", n.x, n.y, n.z)?;
        AxisSpec::Angles {
            nadir_deg,
            azimuth_deg,
        }
    } else {
        loop {
            let direction = DVec3::new(
                ask(input, out, "nx in the ice3 coordinate->", finite)?,
                ask(input, out, "ny in the ice3 coordinate->", finite)?,
                ask(input, out, "nz in the ice3 coordinate->", finite)?,
            );
            if direction.length_squared() > 0.0 {
                break AxisSpec::Direction { direction };
            }
            writeln!(out, "direction must be non-zero")?;
        }
    };

    Ok(EventCard {
        flavor,
        doublet,
        energy,
        position,
        axis,
        geometry_shift: None,
        start_location_cm: None,
    })
}

fn finite(v: &f64) -> bool {
    v.is_finite()
}

fn ask<T, R, W>(input: &mut R, out: &mut W, question: &str, accept: impl Fn(&T) -> bool) -> io::Result<T>
where
    T: FromStr,
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(out, "{question}")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("input ended before answering `{question}`"),
            ));
        }
        match line.trim().parse::<T>() {
            Ok(value) if accept(&value) => return Ok(value),
            _ => writeln!(out, "invalid answer {:?}", line.trim())?,
        }
    }
}
