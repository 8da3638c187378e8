//! Stairs command handler: list staircase edges around a point.

use std::io::{self, Write};

use anyhow::{Context, Result};

use stepfree_cli::output::{render_staircases, write_json, OutputFormat};
use stepfree_cli::terminal::ColorPalette;
use stepfree_lib::{build_walk_graph, staircases, GeoPoint, Router};

pub fn handle_stairs_command(
    at: GeoPoint,
    radius_m: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let router = Router::from_env()?;
    let radius_m = radius_m.unwrap_or(router.config().default_radius_m);
    let graph = build_walk_graph(router.source(), at, radius_m)
        .with_context(|| format!("failed to build walk graph around {at}"))?;
    let found = staircases(&graph);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => write_json(&mut out, &found)?,
        OutputFormat::Text => render_staircases(&mut out, &found, ColorPalette::detect())?,
    }
    out.flush()?;
    Ok(())
}
