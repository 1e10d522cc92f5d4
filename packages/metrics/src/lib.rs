#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derived case and death metrics.
//!
//! Every metric is a variant of [`MetricKey`] and answers the same set of
//! questions through [`Metric`]: its national value on a day, its value for
//! one state or county, the value that maps to full colour intensity, and
//! how to display and pluralize a value. Which metric and day are active is
//! left to the caller; [`MetricQuery`] keeps a current day for convenience.

pub mod format;
pub mod query;

use covid_map_dataset_models::{County, Dataset};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

pub use format::ValueFormat;
pub use query::MetricQuery;

/// Errors returned by metric lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// No metric has this key.
    #[error("unknown metric key {key:?}")]
    UnknownMetricKey {
        /// The key that was requested.
        key: String,
    },

    /// No state has this name.
    #[error("state {name:?} not found")]
    StateNotFound {
        /// The state name that was requested.
        name: String,
    },

    /// The day index is past the end of the dataset.
    #[error("day {day} is out of range, dataset has {num_days} days")]
    DayOutOfRange { day: usize, num_days: usize },
}

/// Selectable metric.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MetricKey {
    /// Cumulative confirmed cases
    Cases,
    /// Cumulative deaths
    Deaths,
    /// Cumulative cases per 100k residents
    #[strum(serialize = "casesPer100k")]
    CasesPer100k,
    /// Cumulative deaths per 100k residents
    #[strum(serialize = "deathsPer100k")]
    DeathsPer100k,
    /// Cases added since the previous day
    NewCases,
    /// Deaths added since the previous day
    NewDeaths,
    /// Cases added over the trailing seven days
    NewCasesWeek,
    /// Deaths added over the trailing seven days
    NewDeathsWeek,
    /// Daily new cases per 100k residents
    #[strum(serialize = "newCasesPer100k")]
    NewCasesPer100k,
    /// Daily new deaths per 100k residents
    #[strum(serialize = "newDeathsPer100k")]
    NewDeathsPer100k,
    /// Weekly new cases per 100k residents
    #[strum(serialize = "newCasesWeekPer100k")]
    NewCasesWeekPer100k,
    /// Weekly new deaths per 100k residents
    #[strum(serialize = "newDeathsWeekPer100k")]
    NewDeathsWeekPer100k,
    /// Deaths as a fraction of cases
    DeathRate,
}

/// Window of the daily delta metrics.
const DAY: usize = 1;
/// Window of the weekly delta metrics.
const WEEK: usize = 7;

/// Which cumulative series a formula reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Cases,
    Deaths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Formula {
    Cumulative(Source),
    Per100k(Source),
    Delta { source: Source, days: usize },
    DeltaPer100k { source: Source, days: usize },
    DeathRate,
}

/// Series and population of whatever a metric is evaluated for.
struct Subject<'a> {
    cases: &'a [u64],
    deaths: &'a [u64],
    population: u64,
}

impl Subject<'_> {
    fn series(&self, source: Source) -> &[u64] {
        match source {
            Source::Cases => self.cases,
            Source::Deaths => self.deaths,
        }
    }
}

impl MetricKey {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Cases,
            Self::Deaths,
            Self::CasesPer100k,
            Self::DeathsPer100k,
            Self::NewCases,
            Self::NewDeaths,
            Self::NewCasesWeek,
            Self::NewDeathsWeek,
            Self::NewCasesPer100k,
            Self::NewDeathsPer100k,
            Self::NewCasesWeekPer100k,
            Self::NewDeathsWeekPer100k,
            Self::DeathRate,
        ]
    }

    const fn formula(self) -> Formula {
        match self {
            Self::Cases => Formula::Cumulative(Source::Cases),
            Self::Deaths => Formula::Cumulative(Source::Deaths),
            Self::CasesPer100k => Formula::Per100k(Source::Cases),
            Self::DeathsPer100k => Formula::Per100k(Source::Deaths),
            Self::NewCases => Formula::Delta {
                source: Source::Cases,
                days: DAY,
            },
            Self::NewDeaths => Formula::Delta {
                source: Source::Deaths,
                days: DAY,
            },
            Self::NewCasesWeek => Formula::Delta {
                source: Source::Cases,
                days: WEEK,
            },
            Self::NewDeathsWeek => Formula::Delta {
                source: Source::Deaths,
                days: WEEK,
            },
            Self::NewCasesPer100k => Formula::DeltaPer100k {
                source: Source::Cases,
                days: DAY,
            },
            Self::NewDeathsPer100k => Formula::DeltaPer100k {
                source: Source::Deaths,
                days: DAY,
            },
            Self::NewCasesWeekPer100k => Formula::DeltaPer100k {
                source: Source::Cases,
                days: WEEK,
            },
            Self::NewDeathsWeekPer100k => Formula::DeltaPer100k {
                source: Source::Deaths,
                days: WEEK,
            },
            Self::DeathRate => Formula::DeathRate,
        }
    }

    #[must_use]
    pub const fn value_format(self) -> ValueFormat {
        match self.formula() {
            Formula::Cumulative(_) | Formula::Delta { .. } => ValueFormat::Count,
            Formula::Per100k(_) | Formula::DeltaPer100k { .. } => ValueFormat::Per100k,
            Formula::DeathRate => ValueFormat::Percent,
        }
    }

    /// Singular and plural unit text.
    const fn units(self) -> (&'static str, &'static str) {
        match self {
            Self::Cases => ("case", "cases"),
            Self::Deaths => ("death", "deaths"),
            Self::CasesPer100k => ("case per 100k", "cases per 100k"),
            Self::DeathsPer100k => ("death per 100k", "deaths per 100k"),
            Self::NewCases => ("new case", "new cases"),
            Self::NewDeaths => ("new death", "new deaths"),
            Self::NewCasesWeek => ("new case this week", "new cases this week"),
            Self::NewDeathsWeek => ("new death this week", "new deaths this week"),
            Self::NewCasesPer100k => ("new case per 100k", "new cases per 100k"),
            Self::NewDeathsPer100k => ("new death per 100k", "new deaths per 100k"),
            Self::NewCasesWeekPer100k => (
                "new case this week per 100k",
                "new cases this week per 100k",
            ),
            Self::NewDeathsWeekPer100k => (
                "new death this week per 100k",
                "new deaths this week per 100k",
            ),
            Self::DeathRate => ("death rate", "death rate"),
        }
    }

    /// Human readable name for menus and legends.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Cases => "Confirmed cases",
            Self::Deaths => "Deaths",
            Self::CasesPer100k => "Cases per 100k people",
            Self::DeathsPer100k => "Deaths per 100k people",
            Self::NewCases => "New cases (daily)",
            Self::NewDeaths => "New deaths (daily)",
            Self::NewCasesWeek => "New cases (past week)",
            Self::NewDeathsWeek => "New deaths (past week)",
            Self::NewCasesPer100k => "New cases per 100k people (daily)",
            Self::NewDeathsPer100k => "New deaths per 100k people (daily)",
            Self::NewCasesWeekPer100k => "New cases per 100k people (past week)",
            Self::NewDeathsWeekPer100k => "New deaths per 100k people (past week)",
            Self::DeathRate => "Death rate",
        }
    }

    fn evaluate(self, subject: &Subject<'_>, day: usize) -> f64 {
        match self.formula() {
            Formula::Cumulative(source) => as_f64(value_at(subject.series(source), day)),
            Formula::Per100k(source) => {
                per_100k(value_at(subject.series(source), day), subject.population)
            }
            Formula::Delta { source, days } => as_f64(delta(subject.series(source), day, days)),
            Formula::DeltaPer100k { source, days } => {
                per_100k(delta(subject.series(source), day, days), subject.population)
            }
            Formula::DeathRate => {
                as_f64(value_at(subject.deaths, day)) / as_f64(value_at(subject.cases, day))
            }
        }
    }
}

/// Resolves a metric from its key.
///
/// # Errors
///
/// Returns [`MetricError::UnknownMetricKey`] if no metric has this key.
pub fn lookup(key: &str) -> Result<MetricKey, MetricError> {
    key.parse().map_err(|_| MetricError::UnknownMetricKey {
        key: key.to_string(),
    })
}

/// Capability set shared by every metric.
pub trait Metric {
    /// National value on `day`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::DayOutOfRange`] if `day` is past the dataset.
    fn total(&self, dataset: &Dataset, day: usize) -> Result<f64, MetricError>;

    /// Value that corresponds to full colour intensity.
    fn max_for(&self, dataset: &Dataset) -> f64;

    /// Value for one county on `day`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::DayOutOfRange`] if `day` is past the dataset.
    fn for_county(&self, dataset: &Dataset, county: &County, day: usize)
    -> Result<f64, MetricError>;

    /// Value for the named state on `day`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::StateNotFound`] for an unknown state and
    /// [`MetricError::DayOutOfRange`] if `day` is past the dataset.
    fn for_state(&self, dataset: &Dataset, state: &str, day: usize) -> Result<f64, MetricError>;

    /// Display text for a value, `N/A` if it is not finite.
    fn format(&self, value: f64) -> String;

    /// Unit text for a value.
    fn pluralize(&self, count: f64) -> &'static str;
}

impl Metric for MetricKey {
    fn total(&self, dataset: &Dataset, day: usize) -> Result<f64, MetricError> {
        check_day(dataset, day)?;
        let subject = Subject {
            cases: &dataset.total_cases,
            deaths: &dataset.total_deaths,
            population: dataset.total_population,
        };
        Ok(self.evaluate(&subject, day))
    }

    fn max_for(&self, dataset: &Dataset) -> f64 {
        match self {
            Self::Cases => as_f64(dataset.max_total_cases),
            Self::Deaths => as_f64(dataset.max_total_deaths),
            Self::NewCases => max_delta(&dataset.total_cases, DAY),
            Self::NewDeaths => max_delta(&dataset.total_deaths, DAY),
            Self::NewCasesWeek => max_delta(&dataset.total_cases, WEEK),
            Self::NewDeathsWeek => max_delta(&dataset.total_deaths, WEEK),
            Self::CasesPer100k => 100_000.0,
            Self::DeathsPer100k => 2_000.0,
            Self::NewCasesPer100k => 100.0,
            Self::NewDeathsPer100k => 5.0,
            Self::NewCasesWeekPer100k => 500.0,
            Self::NewDeathsWeekPer100k => 25.0,
            Self::DeathRate => 0.1,
        }
    }

    fn for_county(
        &self,
        dataset: &Dataset,
        county: &County,
        day: usize,
    ) -> Result<f64, MetricError> {
        check_day(dataset, day)?;
        let subject = Subject {
            cases: &county.cases,
            deaths: &county.deaths,
            population: county.stats.population_or_zero(),
        };
        Ok(self.evaluate(&subject, day))
    }

    fn for_state(&self, dataset: &Dataset, state: &str, day: usize) -> Result<f64, MetricError> {
        let found = dataset
            .state(state)
            .ok_or_else(|| MetricError::StateNotFound {
                name: state.to_string(),
            })?;
        check_day(dataset, day)?;

        let subject = Subject {
            cases: dataset.state_cases(state).map_or(&[][..], Vec::as_slice),
            deaths: dataset.state_deaths(state).map_or(&[][..], Vec::as_slice),
            population: found.stats.population_or_zero(),
        };
        Ok(self.evaluate(&subject, day))
    }

    fn format(&self, value: f64) -> String {
        self.value_format().format(value)
    }

    fn pluralize(&self, count: f64) -> &'static str {
        let (one, many) = self.units();
        if (count.round() - 1.0).abs() < f64::EPSILON {
            one
        } else {
            many
        }
    }
}

const fn check_day(dataset: &Dataset, day: usize) -> Result<(), MetricError> {
    if day < dataset.num_days {
        Ok(())
    } else {
        Err(MetricError::DayOutOfRange {
            day,
            num_days: dataset.num_days,
        })
    }
}

fn value_at(series: &[u64], day: usize) -> u64 {
    series.get(day).copied().unwrap_or(0)
}

/// Increase over the `days` before `day`, clamped at zero. Days before the
/// start of the series count as zero.
fn delta(series: &[u64], day: usize, days: usize) -> u64 {
    let prior = day.checked_sub(days).map_or(0, |d| value_at(series, d));
    value_at(series, day).saturating_sub(prior)
}

fn max_delta(series: &[u64], days: usize) -> f64 {
    let max = (0..series.len())
        .map(|day| delta(series, day, days))
        .max()
        .unwrap_or(0);
    as_f64(max)
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(value: u64) -> f64 {
    value as f64
}

fn per_100k(value: u64, population: u64) -> f64 {
    as_f64(value) * 100_000.0 / as_f64(population)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use covid_map_dataset_models::Dataset;
    use covid_map_decoder::{PolygonRecord, SnapshotWriter};

    /// California (pop 100) with Alpha (pop 40), and Nevada without
    /// population data holding Beta. National cases are `[10, 20, 35]`.
    pub fn dataset() -> Dataset {
        let square = vec![[0, 0], [0, 10], [10, 10], [10, 0]];
        let mut writer =
            SnapshotWriter::new("today", NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        writer
            .write_state("CA", "California", &PolygonRecord::from_rings(100, &[square.clone()]))
            .unwrap();
        writer
            .write_county(
                "Alpha",
                &PolygonRecord::from_rings(40, &[square]),
                &[5, 6, 7],
                &[0, 1, 1],
            )
            .unwrap();
        writer
            .write_state("NV", "Nevada", &PolygonRecord::empty())
            .unwrap();
        writer
            .write_county("Beta", &PolygonRecord::empty(), &[5, 14, 28], &[0, 0, 0])
            .unwrap();

        covid_map_decoder::decode(&writer.into_bytes()).unwrap()
    }
}
