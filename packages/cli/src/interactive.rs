//! Menu-driven front end used when `covid_map` runs without a subcommand.

use std::path::PathBuf;

use covid_map_cli_utils::MultiProgress;
use covid_map_metrics::MetricKey;
use dialoguer::{Input, Select};

use crate::commands;
use crate::config::Config;

enum Action {
    Summary,
    Scene,
    Locate,
    Encode,
    ListMetrics,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Summary,
        Self::Scene,
        Self::Locate,
        Self::Encode,
        Self::ListMetrics,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Summary => "Summarize a snapshot",
            Self::Scene => "Export a scene as JSON",
            Self::Locate => "Look up a point",
            Self::Encode => "Encode a snapshot from JSON",
            Self::ListMetrics => "List metrics",
        }
    }
}

/// Prompts for an action and its arguments, then runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected command fails.
pub fn run(config: &Config, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Summary => {
            let path = prompt_path("Snapshot file")?;
            let key = prompt_metric(config.display.default_metric)?;
            let day = prompt_day()?;

            let dataset = commands::load_dataset(&path, config.decode_options(), multi)?;
            for line in commands::summary_lines(&dataset, key, day)? {
                println!("{line}");
            }
        }
        Action::Scene => {
            let path = prompt_path("Snapshot file")?;
            let key = prompt_metric(config.display.default_metric)?;
            let day = prompt_day()?;
            let output = prompt_path("Output JSON file")?;

            let dataset = commands::load_dataset(&path, config.decode_options(), multi)?;
            let json = commands::scene_json(&dataset, key, day, &config.scene_options(0.0))?;
            std::fs::write(&output, json)?;
            log::info!("Wrote scene to {}", output.display());
        }
        Action::Locate => {
            let path = prompt_path("Snapshot file")?;
            let key = prompt_metric(config.display.default_metric)?;
            let x: f64 = Input::new().with_prompt("X").interact_text()?;
            let y: f64 = Input::new().with_prompt("Y").interact_text()?;

            let dataset = commands::load_dataset(&path, config.decode_options(), multi)?;
            let lines = commands::locate_lines(&dataset, key, None, x, y)?;
            if lines.is_empty() {
                println!("Nothing at ({x}, {y})");
            }
            for line in lines {
                println!("{line}");
            }
        }
        Action::Encode => {
            let input = prompt_path("Input JSON file")?;
            let output = prompt_path("Output snapshot file")?;
            commands::encode_file(&input, &output, multi)?;
        }
        Action::ListMetrics => {
            for line in commands::metric_lines() {
                println!("{line}");
            }
        }
    }

    Ok(())
}

fn prompt_path(prompt: &str) -> Result<PathBuf, dialoguer::Error> {
    let text: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(PathBuf::from(text.trim()))
}

fn prompt_metric(default: MetricKey) -> Result<MetricKey, dialoguer::Error> {
    let keys = MetricKey::all();
    let labels: Vec<&str> = keys.iter().map(|key| key.description()).collect();
    let default = keys.iter().position(|&key| key == default).unwrap_or(0);

    let idx = Select::new()
        .with_prompt("Metric")
        .items(&labels)
        .default(default)
        .interact()?;

    Ok(keys[idx])
}

/// Empty input means the most recent day.
fn prompt_day() -> Result<Option<usize>, Box<dyn std::error::Error>> {
    let text: String = Input::new()
        .with_prompt("Day index (blank for latest)")
        .allow_empty(true)
        .interact_text()?;

    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(text.parse()?))
}
