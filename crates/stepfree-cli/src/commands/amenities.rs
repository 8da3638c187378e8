//! Amenities command handler: nearby points of interest from a CSV catalog.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use stepfree_cli::output::{render_amenities, write_json, OutputFormat};
use stepfree_cli::terminal::ColorPalette;
use stepfree_lib::{AmenityCatalog, GeoPoint};

pub fn handle_amenities_command(
    csv: &Path,
    at: GeoPoint,
    radius_km: f64,
    category: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let catalog = AmenityCatalog::from_path(csv)
        .with_context(|| format!("failed to load amenity catalog {}", csv.display()))?;
    let nearby = catalog.within_radius(at, radius_km, category)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => write_json(&mut out, &nearby)?,
        OutputFormat::Text => render_amenities(&mut out, &nearby, ColorPalette::detect())?,
    }
    out.flush()?;
    Ok(())
}
