//! Builds a snapshot from a JSON description of states and counties.
//!
//! ```json
//! {
//!   "lastUpdated": "April 3 at 5:00 PM PST",
//!   "firstDate": "2020-01-22",
//!   "states": [{
//!     "shortcode": "CA",
//!     "name": "California",
//!     "population": 39500000,
//!     "polygons": [{ "outer": [[0, 0], [0, 10], [10, 10], [10, 0]] }],
//!     "counties": [{
//!       "name": "Alameda",
//!       "population": 1670000,
//!       "polygons": [],
//!       "cases": [0, 0, 3],
//!       "deaths": [0, 0, 0]
//!     }]
//!   }]
//! }
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use covid_map_decoder::progress::null_progress;
use covid_map_decoder::{PolygonRecord, ProgressCallback, SnapshotWriter, WriteError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid snapshot description: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// Counties of one snapshot must all cover the same days.
    #[error("county {county:?} has {cases} days of cases and {deaths} days of deaths")]
    UnevenSeries {
        county: String,
        cases: usize,
        deaths: usize,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInput {
    pub last_updated: String,
    pub first_date: NaiveDate,
    #[serde(default)]
    pub states: Vec<StateInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateInput {
    pub shortcode: String,
    pub name: String,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub polygons: Vec<PolygonInput>,
    #[serde(default)]
    pub counties: Vec<CountyInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyInput {
    pub name: String,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub polygons: Vec<PolygonInput>,
    pub cases: Vec<u64>,
    pub deaths: Vec<u64>,
}

/// One polygon in snapshot coordinates. Winding is fixed up on write.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonInput {
    pub outer: Vec<[u16; 2]>,
    #[serde(default)]
    pub holes: Vec<Vec<[u16; 2]>>,
}

impl SnapshotInput {
    /// Number of state and county records the snapshot will contain.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.states.iter().map(|state| 1 + state.counties.len()).sum()
    }
}

fn polygon_record(population: u64, polygons: &[PolygonInput]) -> PolygonRecord {
    let mut record = PolygonRecord {
        population,
        components: Vec::new(),
    };
    for polygon in polygons {
        record
            .components
            .extend(PolygonRecord::from_polygon(population, &polygon.outer, &polygon.holes).components);
    }
    record
}

/// Parses a JSON snapshot description.
///
/// # Errors
///
/// Returns [`EncodeError::Json`] if the text does not describe a snapshot.
pub fn parse_input(json: &str) -> Result<SnapshotInput, EncodeError> {
    Ok(serde_json::from_str(json)?)
}

/// Encodes a snapshot description into snapshot bytes.
///
/// # Errors
///
/// Returns [`EncodeError`] if a county's series differ in length or a
/// record cannot be encoded.
pub fn encode(
    input: &SnapshotInput,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<u8>, EncodeError> {
    let mut writer = SnapshotWriter::new(&input.last_updated, input.first_date);

    for state in &input.states {
        writer.write_state(
            &state.shortcode,
            &state.name,
            &polygon_record(state.population, &state.polygons),
        )?;
        progress.inc(1);

        for county in &state.counties {
            if county.cases.len() != county.deaths.len() {
                return Err(EncodeError::UnevenSeries {
                    county: county.name.clone(),
                    cases: county.cases.len(),
                    deaths: county.deaths.len(),
                });
            }

            writer.write_county(
                &county.name,
                &polygon_record(county.population, &county.polygons),
                &county.cases,
                &county.deaths,
            )?;
            progress.inc(1);
        }
        progress.set_message(state.name.clone());
    }

    let bytes = writer.into_bytes();
    progress.finish(format!("{} records, {} bytes", input.record_count(), bytes.len()));
    Ok(bytes)
}

/// Encodes without progress reporting.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_quietly(input: &SnapshotInput) -> Result<Vec<u8>, EncodeError> {
    encode(input, &null_progress())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{
        "lastUpdated": "April 3, at 5:00 PM Pacific / nytimes",
        "firstDate": "2020-01-30",
        "states": [
            {
                "shortcode": "CA",
                "name": "California",
                "population": 100,
                "polygons": [{ "outer": [[0, 0], [100, 0], [100, 100], [0, 100]] }],
                "counties": [
                    {
                        "name": "Alpha",
                        "population": 40,
                        "polygons": [{
                            "outer": [[10, 10], [10, 50], [50, 50], [50, 10]],
                            "holes": [[[20, 20], [30, 20], [30, 30], [20, 30]]]
                        }],
                        "cases": [5, 6, 7],
                        "deaths": [0, 0, 1]
                    },
                    { "name": "Beta", "cases": [0, 0, 0], "deaths": [0, 0, 0] }
                ]
            },
            { "shortcode": "NV", "name": "Nevada" }
        ]
    }"#;

    #[test]
    fn encoded_snapshot_decodes() {
        let input = parse_input(INPUT).unwrap();
        assert_eq!(input.record_count(), 4);

        let bytes = encode_quietly(&input).unwrap();
        let dataset = covid_map_decoder::decode(&bytes).unwrap();

        assert_eq!(dataset.last_updated, "April 3 at 5:00 PM PST");
        assert_eq!(dataset.dates[2].text, "Feb 1");
        assert_eq!(dataset.num_days, 3);
        assert_eq!(dataset.states.len(), 2);
        assert_eq!(dataset.total_population, 100);
        assert_eq!(dataset.total_cases, vec![5, 6, 7]);
        assert_eq!(dataset.state_cases("Nevada"), Some(&vec![0, 0, 0]));

        let alpha = &dataset.counties[0];
        let polygon = alpha.polygon.as_ref().unwrap();
        assert_eq!(polygon.polygons.0.len(), 1);
        assert_eq!(polygon.polygons.0[0].interiors().len(), 1);
        assert!(dataset.counties[1].polygon.is_none());
    }

    #[test]
    fn uneven_series_is_rejected() {
        let mut input = parse_input(INPUT).unwrap();
        input.states[0].counties[0].deaths.pop();

        assert!(matches!(
            encode_quietly(&input),
            Err(EncodeError::UnevenSeries { cases: 3, deaths: 2, .. })
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            parse_input("{\"states\": []}"),
            Err(EncodeError::Json(_))
        ));
    }
}
