//! Route command handler.

use std::io::{self, Write};

use anyhow::{bail, Result};
use clap::ValueEnum;

use stepfree_lib::{GeoPoint, RoutePolicy, Router, WalkingSpeed};
use stepfree_cli::output::{render_comparison, render_route, write_json, OutputFormat};
use stepfree_cli::terminal::ColorPalette;

/// Which policies to route under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PolicyChoice {
    /// Stairs may be used.
    Allow,
    /// Staircase edges are removed.
    Avoid,
    /// Route under both policies from one map fetch.
    #[default]
    Both,
}

#[derive(Debug, Clone)]
pub struct RouteCommandArgs {
    pub from: GeoPoint,
    pub to: GeoPoint,
    /// Search radius in metres; the configured default when `None`.
    pub radius_m: Option<f64>,
    pub policy: PolicyChoice,
    pub speed: WalkingSpeed,
}

/// Route between two coordinates and print the result.
///
/// Fails (non-zero exit) when no requested policy produced a route.
pub fn handle_route_command(args: &RouteCommandArgs, format: OutputFormat) -> Result<()> {
    let router = Router::from_env()?;
    let radius_m = args.radius_m.unwrap_or(router.config().default_radius_m);
    let speed_kmh = args.speed.kmh();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let palette = ColorPalette::detect();

    let any_ok = match args.policy {
        PolicyChoice::Both => {
            let comparison =
                router.route_both_policies(args.from, args.to, radius_m, speed_kmh);
            match format {
                OutputFormat::Json => write_json(&mut out, &comparison)?,
                OutputFormat::Text => render_comparison(&mut out, &comparison, palette)?,
            }
            comparison.allow_stairs.is_ok() || comparison.avoid_stairs.is_ok()
        }
        PolicyChoice::Allow | PolicyChoice::Avoid => {
            let policy = match args.policy {
                PolicyChoice::Avoid => RoutePolicy::AvoidStairs,
                _ => RoutePolicy::AllowStairs,
            };
            let request = router
                .request(args.from, args.to)
                .with_radius(radius_m)
                .with_speed(speed_kmh)
                .with_policy(policy);
            let result = router.route(&request);
            match format {
                OutputFormat::Json => write_json(&mut out, result.as_ref())?,
                OutputFormat::Text => render_route(&mut out, &result, palette)?,
            }
            result.is_ok()
        }
    };
    out.flush()?;

    if !any_ok {
        bail!("no route could be computed");
    }
    Ok(())
}
