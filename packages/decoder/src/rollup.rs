//! Incremental state and national totals.
//!
//! Counties are folded in one at a time while the snapshot is scanned, so
//! the totals are complete as soon as the last record is read.

use std::collections::BTreeMap;

use covid_map_dataset_models::{County, State, TimeSeries};
use geo::{Coord, Rect};

use crate::DecodeError;
use crate::polygon::union_rect;

/// Running sums collected during a decode.
#[derive(Debug, Default)]
pub struct Rollup {
    num_days: Option<usize>,
    state_cases: BTreeMap<String, TimeSeries>,
    state_deaths: BTreeMap<String, TimeSeries>,
    total_cases: TimeSeries,
    total_deaths: TimeSeries,
    total_population: u64,
    max_county_cases: u64,
    max_county_deaths: u64,
}

/// Finished totals, every series padded to `num_days`.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupTotals {
    pub num_days: usize,
    pub state_cases: BTreeMap<String, TimeSeries>,
    pub state_deaths: BTreeMap<String, TimeSeries>,
    pub total_cases: TimeSeries,
    pub total_deaths: TimeSeries,
    pub total_population: u64,
    pub max_total_cases: u64,
    pub max_total_deaths: u64,
    pub max_county_cases: u64,
    pub max_county_deaths: u64,
}

impl Rollup {
    /// Registers a state so it gets series even if no county follows it.
    pub fn add_state(&mut self, state: &State) {
        if self.state_cases.contains_key(&state.name) {
            log::warn!(
                "Duplicate state header for {}, keeping earlier totals",
                state.name
            );
        }

        self.total_population += state.stats.population_or_zero();
        self.state_cases.entry(state.name.clone()).or_default();
        self.state_deaths.entry(state.name.clone()).or_default();
    }

    /// Day count fixed by the first county, if any has been added.
    #[must_use]
    pub const fn num_days(&self) -> Option<usize> {
        self.num_days
    }

    /// Adds a county's series into its state's and the national totals.
    ///
    /// The first county fixes the number of days. A later series that is
    /// longer only by trailing zeros is cut back to that length.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::SeriesLengthMismatch`] if either series cannot
    /// be brought to the dataset's day count.
    pub fn add_county(
        &mut self,
        county: &mut County,
        max_cases: u64,
        max_deaths: u64,
    ) -> Result<(), DecodeError> {
        let num_days = *self.num_days.get_or_insert(county.cases.len());
        fit_series(&mut county.cases, num_days, county.id)?;
        fit_series(&mut county.deaths, num_days, county.id)?;

        self.max_county_cases = self.max_county_cases.max(max_cases);
        self.max_county_deaths = self.max_county_deaths.max(max_deaths);

        add_into(
            self.state_cases.entry(county.state.clone()).or_default(),
            &county.cases,
        );
        add_into(
            self.state_deaths.entry(county.state.clone()).or_default(),
            &county.deaths,
        );
        add_into(&mut self.total_cases, &county.cases);
        add_into(&mut self.total_deaths, &county.deaths);

        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> RollupTotals {
        let num_days = self.num_days.unwrap_or(0);
        let pad = |mut series: TimeSeries| {
            series.resize(num_days, 0);
            series
        };
        let pad_all = |map: BTreeMap<String, TimeSeries>| {
            map.into_iter()
                .map(|(name, series)| (name, pad(series)))
                .collect::<BTreeMap<_, _>>()
        };

        let total_cases = pad(self.total_cases);
        let total_deaths = pad(self.total_deaths);

        RollupTotals {
            num_days,
            state_cases: pad_all(self.state_cases),
            state_deaths: pad_all(self.state_deaths),
            max_total_cases: total_cases.iter().copied().max().unwrap_or(0),
            max_total_deaths: total_deaths.iter().copied().max().unwrap_or(0),
            total_cases,
            total_deaths,
            total_population: self.total_population,
            max_county_cases: self.max_county_cases,
            max_county_deaths: self.max_county_deaths,
        }
    }
}

fn fit_series(series: &mut TimeSeries, num_days: usize, record: u32) -> Result<(), DecodeError> {
    if series.len() > num_days && series[num_days..].iter().all(|&v| v == 0) {
        log::debug!(
            "Record {record}: dropping {} trailing zero days",
            series.len() - num_days
        );
        series.truncate(num_days);
    }

    if series.len() == num_days {
        Ok(())
    } else {
        Err(DecodeError::SeriesLengthMismatch {
            record,
            expected: num_days,
            actual: series.len(),
        })
    }
}

fn add_into(target: &mut TimeSeries, values: &[u64]) {
    if target.len() < values.len() {
        target.resize(values.len(), 0);
    }
    for (total, value) in target.iter_mut().zip(values) {
        *total += value;
    }
}

/// Radius multiplier such that the county with the most cases on any day
/// gets a marker of `max_marker_radius`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn marker_scale(max_county_cases: u64, max_marker_radius: f64) -> f64 {
    if max_county_cases == 0 {
        return 0.0;
    }
    max_marker_radius / (max_county_cases as f64).sqrt()
}

/// Grows `bounds` to cover every county's final-day marker, a square of
/// half-width `sqrt(cases) * scale` around its label point.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn inflate_bounds(
    bounds: Option<Rect<f64>>,
    counties: &[County],
    scale: f64,
) -> Option<Rect<f64>> {
    counties.iter().fold(bounds, |acc, county| {
        let (Some(polygon), Some(&cases)) = (&county.polygon, county.cases.last()) else {
            return acc;
        };

        let half = (cases as f64).sqrt() * scale;
        let marker = Rect::new(
            Coord {
                x: polygon.label.x - half,
                y: polygon.label.y - half,
            },
            Coord {
                x: polygon.label.x + half,
                y: polygon.label.y + half,
            },
        );
        Some(union_rect(acc, marker))
    })
}
