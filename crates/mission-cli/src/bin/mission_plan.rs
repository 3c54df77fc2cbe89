//! mission-plan - assemble a mission plan from a JSON message

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use mission_cli::{assemble, is_fatal, read_json, render_text, Config, PlanReport, Request};
use mission_core::{GeoPoint, PlannerRules};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print the plan as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Turn radius for densified paths, meters
    #[arg(long, global = true)]
    turn_radius: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a plan-database message
    Plandb {
        /// Path to the message JSON
        file: PathBuf,
    },
    /// Assemble a mission-control message
    Control {
        /// Path to the message JSON
        file: PathBuf,

        /// Densify the path along turn-constrained curves
        #[arg(long)]
        densify: bool,

        /// Vehicle latitude, degrees
        #[arg(long, requires = "start_lon", allow_hyphen_values = true)]
        start_lat: Option<f64>,

        /// Vehicle longitude, degrees
        #[arg(long, requires = "start_lat", allow_hyphen_values = true)]
        start_lon: Option<f64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mission_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let mut rules = PlannerRules::default();
    if let Some(radius) = args.turn_radius {
        if radius.is_nan() || radius <= 0.0 {
            bail!("turn radius must be positive, got {}", radius);
        }
        rules.turn_radius_m = radius;
    }

    let request = match args.command {
        Command::Plandb { file } => Request::PlanDb(read_json(&file)?),
        Command::Control {
            file,
            densify,
            start_lat,
            start_lon,
        } => Request::Control {
            message: read_json(&file)?,
            densify,
            vehicle_start: start_lat.zip(start_lon).map(|(lat, lon)| GeoPoint::new(lat, lon)),
        },
    };

    let gateway = config.gateway(&rules, request.location_hint())?;
    tracing::info!(endpoints = ?gateway.endpoint_names(), "Geodesy gateway configured");

    let plan = assemble(request, &gateway, &config, rules);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&PlanReport::new(&plan))?);
    } else {
        print!("{}", render_text(&plan));
    }

    if is_fatal(&plan) {
        bail!("mission {} cannot be geo-anchored", plan.plan_id());
    }
    Ok(())
}
