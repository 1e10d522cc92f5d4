//! Implementations behind each `covid_map` subcommand.
//!
//! Text-producing commands return their lines so they can be printed by the
//! caller and checked in tests.

use std::path::{Path, PathBuf};

use covid_map_cli_utils::{IndicatifProgress, MultiProgress};
use covid_map_dataset_models::{Dataset, Place};
use covid_map_decoder::{DecodeError, DecodeOptions, Decoder};
use covid_map_metrics::format::group_digits;
use covid_map_metrics::{Metric as _, MetricError, MetricKey, MetricQuery};
use covid_map_scene::{PlaceIndex, SceneError, SceneOptions, build_scene};
use thiserror::Error;

use crate::encode::{self, EncodeError};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("failed to serialize scene: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads and decodes a snapshot file with a byte progress bar.
///
/// # Errors
///
/// Returns [`CommandError`] if the file cannot be read or decoded.
pub fn load_dataset(
    path: &Path,
    options: DecodeOptions,
    multi: &MultiProgress,
) -> Result<Dataset, CommandError> {
    let bytes = std::fs::read(path).map_err(|source| CommandError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Read {} bytes from {}", bytes.len(), path.display());

    let progress = IndicatifProgress::bytes_bar(multi, &format!("Decoding {}", path.display()));
    let dataset = Decoder::new(&bytes, options)?
        .with_progress(progress)
        .finish()?;

    Ok(dataset)
}

/// Dataset metadata, the national value and every state's value of `key`.
///
/// `day` defaults to the most recent day.
///
/// # Errors
///
/// Returns [`MetricError::DayOutOfRange`] if `day` is past the dataset.
pub fn summary_lines(
    dataset: &Dataset,
    key: MetricKey,
    day: Option<usize>,
) -> Result<Vec<String>, MetricError> {
    let mut query = MetricQuery::new(dataset);
    if let Some(day) = day {
        query.set_current_day(day)?;
    }
    let day = query.current_day();

    let mut lines = vec![format!("Last updated: {}", dataset.last_updated)];
    match dataset.dates.get(day) {
        Some(date) => lines.push(format!(
            "Day {} of {}: {} {}",
            day + 1,
            dataset.num_days,
            date.weekday,
            date.text
        )),
        None => lines.push("No days in snapshot".to_string()),
    }
    lines.push(format!(
        "{} states, {} counties, population {}",
        dataset.states.len(),
        dataset.counties.len(),
        group_digits(dataset.total_population)
    ));

    if dataset.num_days == 0 {
        return Ok(lines);
    }

    lines.push(String::new());
    lines.push(format!("{}:", key.description()));
    lines.push(format!(
        "  United States: {}",
        query.describe(key, query.get_total(key, None)?)
    ));

    for state in &dataset.states {
        let value = query.get_for_state(key, &state.name, None)?;
        lines.push(format!("  {}: {}", state.name, query.describe(key, value)));
    }

    Ok(lines)
}

/// One line per registered metric key.
#[must_use]
pub fn metric_lines() -> Vec<String> {
    let width = MetricKey::all()
        .iter()
        .map(|key| key.as_ref().len())
        .max()
        .unwrap_or(0);

    MetricKey::all()
        .iter()
        .map(|key| format!("{:<width$}  {}", key.as_ref(), key.description()))
        .collect()
}

/// Scene for `key` on `day` (default: most recent day) as pretty JSON.
///
/// # Errors
///
/// Returns [`CommandError`] if the scene cannot be built or serialized.
pub fn scene_json(
    dataset: &Dataset,
    key: MetricKey,
    day: Option<usize>,
    options: &SceneOptions,
) -> Result<String, CommandError> {
    let day = day.unwrap_or_else(|| MetricQuery::new(dataset).current_day());
    let scene = build_scene(dataset, key, day, options)?;
    log::debug!(
        "Scene has {} county regions, {} markers and {} labels",
        scene.county_regions.len(),
        scene.markers.len(),
        scene.labels.len()
    );
    Ok(serde_json::to_string_pretty(&scene)?)
}

/// Tooltip text for whatever is drawn at `(x, y)`.
///
/// Counties take precedence over states. Returns no lines if nothing is
/// there.
///
/// # Errors
///
/// Returns [`MetricError::DayOutOfRange`] if `day` is past the dataset.
pub fn locate_lines(
    dataset: &Dataset,
    key: MetricKey,
    day: Option<usize>,
    x: f64,
    y: f64,
) -> Result<Vec<String>, MetricError> {
    let day = day.unwrap_or_else(|| MetricQuery::new(dataset).current_day());

    let (title, value) = match PlaceIndex::build(dataset).place_at(dataset, x, y) {
        Some(Place::County(county)) => (
            format!("{} County, {}", county.name, county.state),
            key.for_county(dataset, &county, day)?,
        ),
        Some(Place::State(state)) => (
            format!("{} ({})", state.name, state.shortcode),
            key.for_state(dataset, &state.name, day)?,
        ),
        None => return Ok(Vec::new()),
    };

    Ok(vec![
        title,
        format!("{} {}", key.format(value), key.pluralize(value)),
    ])
}

/// Encodes the JSON description at `input` into a snapshot at `output`.
///
/// # Errors
///
/// Returns [`CommandError`] if either file cannot be accessed or the
/// description cannot be encoded.
pub fn encode_file(input: &Path, output: &Path, multi: &MultiProgress) -> Result<(), CommandError> {
    let json = std::fs::read_to_string(input).map_err(|source| CommandError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let snapshot = encode::parse_input(&json)?;

    let progress = IndicatifProgress::records_bar(
        multi,
        "Encoding",
        snapshot.record_count() as u64,
    );
    let bytes = encode::encode(&snapshot, &progress)?;

    std::fs::write(output, &bytes).map_err(|source| CommandError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    log::info!("Wrote {} bytes to {}", bytes.len(), output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{
        "lastUpdated": "April 3 at 5:00 PM PST",
        "firstDate": "2020-03-01",
        "states": [
            {
                "shortcode": "CA",
                "name": "California",
                "population": 200000,
                "polygons": [{ "outer": [[0, 0], [100, 0], [100, 100], [0, 100]] }],
                "counties": [{
                    "name": "Alpha",
                    "population": 100000,
                    "polygons": [{ "outer": [[10, 10], [10, 40], [40, 40], [40, 10]] }],
                    "cases": [1, 1, 1201],
                    "deaths": [0, 0, 0]
                }]
            },
            {
                "shortcode": "NV",
                "name": "Nevada",
                "polygons": [{ "outer": [[200, 0], [300, 0], [300, 100], [200, 100]] }]
            }
        ]
    }"#;

    fn dataset() -> Dataset {
        let input = encode::parse_input(INPUT).unwrap();
        covid_map_decoder::decode(&encode::encode_quietly(&input).unwrap()).unwrap()
    }

    #[test]
    fn summary_defaults_to_last_day() {
        let lines = summary_lines(&dataset(), MetricKey::Cases, None).unwrap();

        assert_eq!(lines[0], "Last updated: April 3 at 5:00 PM PST");
        assert_eq!(lines[1], "Day 3 of 3: Tue Mar 3");
        assert_eq!(lines[2], "2 states, 1 counties, population 200,000");
        assert_eq!(lines[4], "Confirmed cases:");
        assert_eq!(lines[5], "  United States: 1,201 cases");
        assert_eq!(lines[6], "  California: 1,201 cases");
        assert_eq!(lines[7], "  Nevada: 0 cases");
    }

    #[test]
    fn summary_of_daily_metric_on_earlier_day() {
        let lines = summary_lines(&dataset(), MetricKey::NewCases, Some(1)).unwrap();

        assert_eq!(lines[1], "Day 2 of 3: Mon Mar 2");
        assert_eq!(lines[5], "  United States: 0 new cases");
    }

    #[test]
    fn summary_rejects_day_past_end() {
        assert_eq!(
            summary_lines(&dataset(), MetricKey::Cases, Some(3)),
            Err(MetricError::DayOutOfRange {
                day: 3,
                num_days: 3
            })
        );
    }

    #[test]
    fn lists_every_metric() {
        let lines = metric_lines();
        assert_eq!(lines.len(), MetricKey::all().len());
        assert!(lines[0].starts_with("cases "));
        assert!(lines.iter().any(|line| line.starts_with("newCasesWeekPer100k")));
    }

    #[test]
    fn scene_serializes_camel_case() {
        let json = scene_json(&dataset(), MetricKey::Cases, None, &SceneOptions::default())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metric"], "cases");
        assert_eq!(value["day"], 2);
        assert!(value["countyRegions"].is_array());
        assert!(value["radiusScale"].is_number());
    }

    #[test]
    fn locate_prefers_county_then_state() {
        let data = dataset();

        let county = locate_lines(&data, MetricKey::Cases, None, 20.0, 20.0).unwrap();
        assert_eq!(county, vec!["Alpha County, California", "1,201 cases"]);

        let state = locate_lines(&data, MetricKey::Cases, None, 250.0, 50.0).unwrap();
        assert_eq!(state, vec!["Nevada (NV)", "0 cases"]);

        assert!(locate_lines(&data, MetricKey::Cases, None, 150.0, 50.0)
            .unwrap()
            .is_empty());
    }
}
