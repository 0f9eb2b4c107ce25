//! Console rendering of extracted events

use lepton_bridge_core::{EventResult, ParticleRecord};
use std::io::{self, Write};

pub fn write_event<W: Write>(out: &mut W, number: usize, result: &EventResult) -> io::Result<()> {
    writeln!(out, "=== event {number} ===")?;
    writeln!(
        out,
        "Primary Energy {:e} Final Energy {:e} [GeV] ({})",
        result.primary_energy, result.final_energy, result.final_particle.name
    )?;
    let c = result.start.earth_center;
    writeln!(
        out,
        "This track starts at {:.1} [cm] {:.1} [cm] {:.1} [cm] in EarthCenterCoordinate",
        c.x, c.y, c.z
    )?;
    let d = result.start.detector;
    writeln!(
        out,
        "This track starts at {:.1} [cm] {:.1} [cm] {:.1} [cm] in IceCubeCoordinate",
        d.x, d.y, d.z
    )?;
    let e = result.end;
    writeln!(
        out,
        "This track ends at {:.1} [cm] {:.1} [cm] {:.1} [cm] in IceCubeCoordinate",
        e.x, e.y, e.z
    )?;
    let n = result.direction.detector;
    writeln!(
        out,
        "Direction ({:.4}, {:.4}, {:.4}) in IceCubeCoordinate",
        n.x, n.y, n.z
    )?;
    writeln!(
        out,
        "Distance from the Earth entrance point : {:.1} [cm]",
        result.distance_along_axis_from_entry
    )?;
    writeln!(out, "Track length : {:.1} [cm]", result.total_length)?;

    writeln!(
        out,
        "-- cascades ({}, {:e} GeV deposited)",
        result.cascade_records.len(),
        result.cascade_total_energy()
    )?;
    write_records(out, &result.cascade_records)?;
    writeln!(out, "-- track ({})", result.track_records.len())?;
    write_records(out, &result.track_records)
}

fn write_records<W: Write>(out: &mut W, records: &[ParticleRecord]) -> io::Result<()> {
    for (i, r) in records.iter().enumerate() {
        writeln!(
            out,
            "{:>4} Flavor {} {:<14} Energy {:>10.4e} [GeV] {:>12.1} [cm] {:>12.1} [cm] {:>12.1} [cm] {:>12.1} [cm from start]",
            i + 1,
            r.particle.flavor.code(),
            r.name,
            r.particle.energy,
            r.position.x,
            r.position.y,
            r.position.z,
            r.distance_from_start,
        )?;
    }
    Ok(())
}
