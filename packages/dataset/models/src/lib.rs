#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place, geometry and time-series types for decoded case snapshots.
//!
//! A [`Dataset`] is produced once per snapshot decode and is read-only
//! afterwards. It owns every [`State`] and [`County`]; counties refer to
//! their state by name, resolved through [`Dataset::state`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use geo::{MultiPolygon, Rect};
use serde::{Deserialize, Serialize};

/// Dense per-day cumulative counts, one entry per day of the dataset.
pub type TimeSeries = Vec<u64>;

/// Representative interior point of a place's geometry.
///
/// `distance` is the radius of the largest circle centred on `(x, y)` that
/// fits inside the polygon it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPoint {
    pub x: f64,
    pub y: f64,
    pub distance: f64,
}

impl LabelPoint {
    /// Position as an `[x, y]` pair.
    #[must_use]
    pub const fn position(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// Decoded boundary of a place.
///
/// Only present when the snapshot carried coordinates for the place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceGeometry {
    /// Every polygon of the place, outer ring first, holes after.
    pub polygons: MultiPolygon<f64>,
    /// Bounding box over every decoded coordinate of the place.
    pub bbox: Rect<f64>,
    /// Best label point across all polygons.
    pub label: LabelPoint,
}

/// Statistics attached to a place record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceStats {
    /// Population, absent when the record carried no geometry block.
    pub population: Option<u64>,
}

impl PlaceStats {
    /// Population with a missing value counted as zero.
    #[must_use]
    pub fn population_or_zero(&self) -> u64 {
        self.population.unwrap_or(0)
    }
}

/// A state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Stable identifier, assigned in record order across states and counties.
    pub id: u32,
    /// Two-letter code (e.g. "CA").
    pub shortcode: String,
    /// Full name (e.g. "California"). Counties refer to the state by this.
    pub name: String,
    pub polygon: Option<PlaceGeometry>,
    pub stats: PlaceStats,
}

/// A county record with its daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct County {
    pub id: u32,
    pub name: String,
    /// Name of the owning [`State`].
    pub state: String,
    pub polygon: Option<PlaceGeometry>,
    pub stats: PlaceStats,
    /// Cumulative confirmed cases per day.
    pub cases: TimeSeries,
    /// Cumulative deaths per day.
    pub deaths: TimeSeries,
}

/// Either kind of decoded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Place {
    State(State),
    County(County),
}

impl Place {
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::State(state) => state.id,
            Self::County(county) => county.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::State(state) => &state.name,
            Self::County(county) => &county.name,
        }
    }

    #[must_use]
    pub const fn polygon(&self) -> Option<&PlaceGeometry> {
        match self {
            Self::State(state) => state.polygon.as_ref(),
            Self::County(county) => county.polygon.as_ref(),
        }
    }
}

/// Display text for one day of the date axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateLabel {
    /// Short month and day (e.g. "Mar 5").
    pub text: String,
    /// Short weekday (e.g. "Thu").
    pub weekday: String,
}

/// A fully decoded snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Normalized "last updated" text from the snapshot header.
    pub last_updated: String,
    /// Calendar date of day index 0.
    pub first_date: NaiveDate,
    /// One label per day index.
    pub dates: Vec<DateLabel>,
    /// Length of every [`TimeSeries`] in the dataset.
    pub num_days: usize,
    pub states: Vec<State>,
    pub counties: Vec<County>,
    /// State name -> index into [`Self::states`].
    pub states_by_name: BTreeMap<String, usize>,
    pub state_cases: BTreeMap<String, TimeSeries>,
    pub state_deaths: BTreeMap<String, TimeSeries>,
    /// National cumulative cases per day.
    pub total_cases: TimeSeries,
    /// National cumulative deaths per day.
    pub total_deaths: TimeSeries,
    /// Sum of state populations.
    pub total_population: u64,
    /// Largest value of the national cases series.
    pub max_total_cases: u64,
    /// Largest value of the national deaths series.
    pub max_total_deaths: u64,
    /// Largest single-day value of any county's cases series.
    pub max_county_cases: u64,
    /// Largest single-day value of any county's deaths series.
    pub max_county_deaths: u64,
    /// Multiplier applied to `sqrt(cases)` to get a county marker radius.
    pub marker_scale: f64,
    /// Bounds of all geometry, grown to cover final-day county markers.
    pub bounds: Option<Rect<f64>>,
}

impl Dataset {
    /// Looks up a state by its full name.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<&State> {
        self.states_by_name
            .get(name)
            .and_then(|&index| self.states.get(index))
    }

    /// Rolled-up cumulative cases for the named state.
    #[must_use]
    pub fn state_cases(&self, name: &str) -> Option<&TimeSeries> {
        self.state_cases.get(name)
    }

    /// Rolled-up cumulative deaths for the named state.
    #[must_use]
    pub fn state_deaths(&self, name: &str) -> Option<&TimeSeries> {
        self.state_deaths.get(name)
    }

    /// Counties belonging to the named state, in record order.
    pub fn counties_in<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a County> + 'a {
        self.counties.iter().filter(move |county| county.state == state)
    }

    /// Index of the most recent day, if the dataset has any days.
    #[must_use]
    pub const fn last_day(&self) -> Option<usize> {
        self.num_days.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn county(name: &str, state: &str) -> County {
        County {
            id: 2,
            name: name.to_string(),
            state: state.to_string(),
            polygon: None,
            stats: PlaceStats::default(),
            cases: vec![1, 2],
            deaths: vec![0, 0],
        }
    }

    fn dataset() -> Dataset {
        let state = State {
            id: 1,
            shortcode: "WA".to_string(),
            name: "Washington".to_string(),
            polygon: None,
            stats: PlaceStats {
                population: Some(10),
            },
        };

        Dataset {
            last_updated: "today".to_string(),
            first_date: NaiveDate::from_ymd_opt(2020, 1, 22).unwrap(),
            dates: Vec::new(),
            num_days: 2,
            states: vec![state],
            counties: vec![county("King", "Washington"), county("Kings", "New York")],
            states_by_name: BTreeMap::from([("Washington".to_string(), 0)]),
            state_cases: BTreeMap::from([("Washington".to_string(), vec![1, 2])]),
            state_deaths: BTreeMap::from([("Washington".to_string(), vec![0, 0])]),
            total_cases: vec![1, 2],
            total_deaths: vec![0, 0],
            total_population: 10,
            max_total_cases: 2,
            max_total_deaths: 0,
            max_county_cases: 2,
            max_county_deaths: 0,
            marker_scale: 1.0,
            bounds: None,
        }
    }

    #[test]
    fn state_lookup_by_name() {
        let data = dataset();
        assert_eq!(data.state("Washington").unwrap().shortcode, "WA");
        assert!(data.state("Oregon").is_none());
        assert_eq!(data.state_cases("Washington"), Some(&vec![1, 2]));
    }

    #[test]
    fn counties_filtered_by_state() {
        let data = dataset();
        let names: Vec<&str> = data
            .counties_in("Washington")
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["King"]);
    }

    #[test]
    fn last_day_of_empty_dataset() {
        let mut data = dataset();
        assert_eq!(data.last_day(), Some(1));
        data.num_days = 0;
        assert_eq!(data.last_day(), None);
    }

    #[test]
    fn missing_population_counts_as_zero() {
        assert_eq!(PlaceStats::default().population_or_zero(), 0);
        assert_eq!(
            PlaceStats {
                population: Some(7)
            }
            .population_or_zero(),
            7
        );
    }

    #[test]
    fn place_serializes_with_type_tag() {
        let place = Place::County(county("King", "Washington"));
        let json = serde_json::to_value(&place).unwrap();
        assert_eq!(json["type"], "county");
        assert_eq!(json["name"], "King");
        assert_eq!(place.id(), 2);
    }
}
