//! Metric lookups against one dataset with a tracked current day.

use covid_map_dataset_models::{County, Dataset};

use crate::{Metric, MetricError, MetricKey};

/// Answers metric queries for a dataset, defaulting to a current day when
/// none is given.
#[derive(Debug, Clone, Copy)]
pub struct MetricQuery<'a> {
    dataset: &'a Dataset,
    current_day: usize,
}

impl<'a> MetricQuery<'a> {
    /// Starts at the dataset's most recent day.
    #[must_use]
    pub const fn new(dataset: &'a Dataset) -> Self {
        let current_day = match dataset.last_day() {
            Some(day) => day,
            None => 0,
        };
        Self {
            dataset,
            current_day,
        }
    }

    #[must_use]
    pub const fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    #[must_use]
    pub const fn current_day(&self) -> usize {
        self.current_day
    }

    /// Moves the current day.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::DayOutOfRange`] if `day` is past the dataset.
    pub fn set_current_day(&mut self, day: usize) -> Result<(), MetricError> {
        if day >= self.dataset.num_days {
            return Err(MetricError::DayOutOfRange {
                day,
                num_days: self.dataset.num_days,
            });
        }
        log::debug!("Current day {} -> {day}", self.current_day);
        self.current_day = day;
        Ok(())
    }

    /// National value of `key` on `day`, or on the current day.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::DayOutOfRange`] if the day is past the dataset.
    pub fn get_total(&self, key: MetricKey, day: Option<usize>) -> Result<f64, MetricError> {
        key.total(self.dataset, day.unwrap_or(self.current_day))
    }

    /// County value of `key` on `day`, or on the current day.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::DayOutOfRange`] if the day is past the dataset.
    pub fn get_for_county(
        &self,
        key: MetricKey,
        county: &County,
        day: Option<usize>,
    ) -> Result<f64, MetricError> {
        key.for_county(self.dataset, county, day.unwrap_or(self.current_day))
    }

    /// State value of `key` on `day`, or on the current day.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::StateNotFound`] for an unknown state and
    /// [`MetricError::DayOutOfRange`] if the day is past the dataset.
    pub fn get_for_state(
        &self,
        key: MetricKey,
        state: &str,
        day: Option<usize>,
    ) -> Result<f64, MetricError> {
        key.for_state(self.dataset, state, day.unwrap_or(self.current_day))
    }

    #[must_use]
    pub fn format(&self, key: MetricKey, value: f64) -> String {
        key.format(value)
    }

    /// `"{value} {unit}"`, e.g. `"1,204 new cases"`.
    #[must_use]
    pub fn describe(&self, key: MetricKey, value: f64) -> String {
        format!("{} {}", key.format(value), key.pluralize(value))
    }

    #[must_use]
    pub fn max_for(&self, key: MetricKey) -> f64 {
        key.max_for(self.dataset)
    }
}
