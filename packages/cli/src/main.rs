#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line tool for case snapshots.
//!
//! Decodes a snapshot and prints metric summaries, exports a renderable
//! scene as JSON, looks up the place under a point, or encodes a new
//! snapshot from a JSON description. Without a subcommand an interactive
//! menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`covid_map_cli_utils::init_logger`])
//! so log lines and progress bars share the terminal cleanly.

mod commands;
mod config;
mod encode;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use covid_map_metrics::{MetricError, MetricKey};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "covid_map")]
#[command(about = "Inspect, render and encode county case snapshots")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "covid_map.toml")]
    config: PathBuf,

    /// Subcommand to execute. Omit for the interactive menu.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print dataset metadata and the value of a metric per state.
    Summary {
        /// Snapshot file to decode.
        snapshot: PathBuf,

        /// Metric key (see `metrics`). Defaults to the configured metric.
        #[arg(long, value_parser = parse_metric)]
        metric: Option<MetricKey>,

        /// Day index. Defaults to the most recent day.
        #[arg(long)]
        day: Option<usize>,
    },

    /// List the available metric keys.
    Metrics,

    /// Build the scene for one day of a metric and print it as JSON.
    Scene {
        /// Snapshot file to decode.
        snapshot: PathBuf,

        #[arg(long, value_parser = parse_metric)]
        metric: Option<MetricKey>,

        #[arg(long)]
        day: Option<usize>,

        /// Zoom level relative to the initial view.
        #[arg(long, default_value_t = 0.0)]
        zoom: f64,

        /// Write the JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the county or state drawn at a point.
    Locate {
        snapshot: PathBuf,

        x: f64,

        y: f64,

        #[arg(long, value_parser = parse_metric)]
        metric: Option<MetricKey>,

        #[arg(long)]
        day: Option<usize>,
    },

    /// Encode a snapshot from a JSON description of states and counties.
    Encode {
        /// JSON description to read.
        input: PathBuf,

        /// Snapshot file to write.
        output: PathBuf,
    },
}

fn parse_metric(key: &str) -> Result<MetricKey, MetricError> {
    covid_map_metrics::lookup(key)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = covid_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let default_metric = config.display.default_metric;

    let Some(command) = cli.command else {
        println!("Covid Map");
        println!();
        return interactive::run(&config, &multi);
    };

    match command {
        Commands::Summary {
            snapshot,
            metric,
            day,
        } => {
            let dataset = commands::load_dataset(&snapshot, config.decode_options(), &multi)?;
            let lines =
                commands::summary_lines(&dataset, metric.unwrap_or(default_metric), day)?;
            for line in lines {
                println!("{line}");
            }
        }
        Commands::Metrics => {
            for line in commands::metric_lines() {
                println!("{line}");
            }
        }
        Commands::Scene {
            snapshot,
            metric,
            day,
            zoom,
            output,
        } => {
            let dataset = commands::load_dataset(&snapshot, config.decode_options(), &multi)?;
            let json = commands::scene_json(
                &dataset,
                metric.unwrap_or(default_metric),
                day,
                &config.scene_options(zoom),
            )?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    log::info!("Wrote scene to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Locate {
            snapshot,
            x,
            y,
            metric,
            day,
        } => {
            let dataset = commands::load_dataset(&snapshot, config.decode_options(), &multi)?;
            let lines =
                commands::locate_lines(&dataset, metric.unwrap_or(default_metric), day, x, y)?;
            if lines.is_empty() {
                println!("Nothing at ({x}, {y})");
            }
            for line in lines {
                println!("{line}");
            }
        }
        Commands::Encode { input, output } => {
            commands::encode_file(&input, &output, &multi)?;
        }
    }

    Ok(())
}
