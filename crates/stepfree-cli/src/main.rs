mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stepfree_cli::output::OutputFormat;
use stepfree_lib::{GeoPoint, WalkingSpeed};

use commands::amenities::handle_amenities_command;
use commands::route::{handle_route_command, PolicyChoice, RouteCommandArgs};
use commands::stairs::handle_stairs_command;

#[derive(Parser, Debug)]
#[command(author, version, about = "Stair-aware pedestrian routing")]
struct Cli {
    /// Output format for command results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log line format written to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute walking routes between two coordinates.
    Route {
        /// Origin as LAT,LON.
        #[arg(long = "from", allow_hyphen_values = true)]
        from: GeoPoint,
        /// Destination as LAT,LON.
        #[arg(long = "to", allow_hyphen_values = true)]
        to: GeoPoint,
        /// Map search radius around the origin in metres.
        #[arg(long)]
        radius: Option<f64>,
        /// Staircase policy.
        #[arg(long, value_enum, default_value_t = PolicyChoice::Both)]
        policy: PolicyChoice,
        /// Walking speed: general, slow, or a number of km/h.
        #[arg(long, default_value = "general")]
        speed: WalkingSpeed,
    },
    /// List staircases in the walk network around a point.
    Stairs {
        /// Center as LAT,LON.
        #[arg(long, allow_hyphen_values = true)]
        at: GeoPoint,
        /// Map search radius in metres.
        #[arg(long)]
        radius: Option<f64>,
    },
    /// List amenities from a CSV catalog near a point.
    Amenities {
        /// Amenity CSV file.
        #[arg(long)]
        csv: PathBuf,
        /// Center as LAT,LON.
        #[arg(long, allow_hyphen_values = true)]
        at: GeoPoint,
        /// Search radius in kilometres.
        #[arg(long = "radius-km", default_value_t = 1.0)]
        radius_km: f64,
        /// Only show this category.
        #[arg(long)]
        category: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Route {
            from,
            to,
            radius,
            policy,
            speed,
        } => handle_route_command(
            &RouteCommandArgs {
                from,
                to,
                radius_m: radius,
                policy,
                speed,
            },
            cli.format,
        ),
        Command::Stairs { at, radius } => handle_stairs_command(at, radius, cli.format),
        Command::Amenities {
            csv,
            at,
            radius_km,
            category,
        } => handle_amenities_command(&csv, at, radius_km, category.as_deref(), cli.format),
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
}
