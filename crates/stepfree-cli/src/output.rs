//! Output formatting for route, staircase and amenity listings.
//!
//! Every renderer writes to a caller-supplied writer so tests can capture
//! the text without spawning the binary.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use stepfree_lib::{NearbyAmenity, PolicyComparison, RouteResult, Staircase};

use crate::terminal::{format_distance_km, format_duration_min, ColorPalette};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Write `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

/// Render a single route result.
pub fn render_route<W: Write>(
    out: &mut W,
    result: &RouteResult,
    palette: ColorPalette,
) -> io::Result<()> {
    let p = palette;
    match result.failure() {
        Some(failure) => {
            writeln!(
                out,
                "{}[FAIL]{} {}: {}",
                p.tag_fail, p.reset, result.policy, failure
            )
        }
        None => {
            write!(
                out,
                "{}[ OK ]{} {}: {}{}{} in {}",
                p.tag_ok,
                p.reset,
                result.policy,
                p.white_bold,
                format_distance_km(result.distance_km),
                p.reset,
                format_duration_min(result.duration_min),
            )?;
            if result.staircases > 0 {
                write!(
                    out,
                    " {}[STAIRS x{}]{}",
                    p.tag_stairs, result.staircases, p.reset
                )?;
            }
            writeln!(out)?;
            for (index, point) in result.polyline.iter().enumerate() {
                writeln!(out, "  {}{}. {}{}", p.gray, index + 1, point, p.reset)?;
            }
            Ok(())
        }
    }
}

/// Render both policy results followed by a short verdict.
pub fn render_comparison<W: Write>(
    out: &mut W,
    comparison: &PolicyComparison,
    palette: ColorPalette,
) -> io::Result<()> {
    render_route(out, &comparison.allow_stairs, palette)?;
    writeln!(out)?;
    render_route(out, &comparison.avoid_stairs, palette)?;
    writeln!(out)?;

    if comparison.step_free_unavailable() {
        writeln!(
            out,
            "Step-free route unavailable: the destination is only reachable using stairs."
        )
    } else if let Some(detour_km) = comparison.step_free_detour_km() {
        writeln!(
            out,
            "Step-free detour: {}",
            format_distance_km(detour_km.max(0.0))
        )
    } else {
        Ok(())
    }
}

pub fn render_staircases<W: Write>(
    out: &mut W,
    staircases: &[Staircase],
    palette: ColorPalette,
) -> io::Result<()> {
    let p = palette;
    writeln!(out, "Staircases found: {}", staircases.len())?;
    for stair in staircases {
        writeln!(
            out,
            "  {}[STAIRS]{} {} {}({} -> {}, {:.0} m){}",
            p.tag_stairs,
            p.reset,
            stair.midpoint,
            p.gray,
            stair.source,
            stair.target,
            stair.length_m,
            p.reset
        )?;
    }
    Ok(())
}

pub fn render_amenities<W: Write>(
    out: &mut W,
    nearby: &[NearbyAmenity<'_>],
    palette: ColorPalette,
) -> io::Result<()> {
    let p = palette;
    if nearby.is_empty() {
        return writeln!(out, "No amenities found.");
    }
    for entry in nearby {
        let amenity = entry.amenity;
        write!(
            out,
            "{}{}{} {}[{}]{} {}",
            p.white_bold,
            amenity.name,
            p.reset,
            p.cyan,
            amenity.category,
            p.reset,
            format_distance_km(entry.distance_km),
        )?;
        if let Some(address) = &amenity.address {
            write!(out, " - {address}")?;
        }
        if let Some(hours) = &amenity.hours {
            write!(out, " {}({hours}){}", p.gray, p.reset)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
