//! Drives a full decode and composes the final [`Dataset`].
//!
//! [`Decoder`] can be stepped one record at a time so a caller can
//! interleave decoding with other work; [`Decoder::finish`] runs whatever is
//! left and builds the dataset.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use covid_map_dataset_models::{County, Dataset, DateLabel, State};

use crate::DecodeError;
use crate::assembler::{Assembler, CountyRecord, Record};
use crate::label::{InscribedCircle, PoleOfInaccessibility};
use crate::progress::{ProgressCallback, null_progress};
use crate::reader::ByteReader;
use crate::rollup::{Rollup, inflate_bounds, marker_scale};

/// Radius of the largest county marker unless configured otherwise.
pub const DEFAULT_MAX_MARKER_RADIUS: f64 = 150.0;

/// Tunables for a decode.
#[derive(Clone)]
pub struct DecodeOptions {
    /// Radius the county with the most cases on any day is drawn at.
    pub max_marker_radius: f64,
    /// Label point finder called once per decoded polygon.
    pub inscribed_circle: Arc<dyn InscribedCircle>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_marker_radius: DEFAULT_MAX_MARKER_RADIUS,
            inscribed_circle: Arc::new(PoleOfInaccessibility::default()),
        }
    }
}

impl std::fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeOptions")
            .field("max_marker_radius", &self.max_marker_radius)
            .finish_non_exhaustive()
    }
}

/// Resumable single-pass decoder over one snapshot buffer.
pub struct Decoder<'a> {
    assembler: Assembler<'a>,
    rollup: Rollup,
    states: Vec<State>,
    counties: Vec<County>,
    last_updated: String,
    first_date: NaiveDate,
    max_marker_radius: f64,
    total_bytes: usize,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a> Decoder<'a> {
    /// Reads the two header lines and positions the decoder at the first
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MalformedHeader`] if either header line is
    /// missing or the first date is not `M/D/YYYY`.
    pub fn new(bytes: &'a [u8], options: DecodeOptions) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(bytes);

        let last_updated = reader
            .read_required_line()
            .map_err(|_| DecodeError::MalformedHeader {
                message: "missing last-updated line".to_string(),
            })?;
        let date_line = reader
            .read_required_line()
            .map_err(|_| DecodeError::MalformedHeader {
                message: "missing first-date line".to_string(),
            })?;
        let first_date = parse_first_date(&date_line)?;

        log::debug!(
            "Snapshot header: last updated {last_updated:?}, first date {first_date}, {} bytes",
            bytes.len()
        );

        Ok(Self {
            assembler: Assembler::new(reader, options.inscribed_circle),
            rollup: Rollup::default(),
            states: Vec::new(),
            counties: Vec::new(),
            last_updated: normalize_last_updated(&last_updated),
            first_date,
            max_marker_radius: options.max_marker_radius,
            total_bytes: bytes.len(),
            progress: null_progress(),
        })
    }

    /// Reports bytes consumed to `progress` after every record.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        progress.set_total(self.total_bytes as u64);
        progress.set_position(self.assembler.position() as u64);
        self.progress = progress;
        self
    }

    /// Decodes one record and folds it into the running totals.
    ///
    /// Returns the record's id, or `None` once the buffer is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the record is malformed. The decode cannot
    /// continue after an error.
    pub fn step(&mut self) -> Result<Option<u32>, DecodeError> {
        let Some(record) = self.assembler.next_record()? else {
            return Ok(None);
        };

        let id = match record {
            Record::State(state) => {
                self.rollup.add_state(&state);
                self.progress.set_message(state.name.clone());
                let id = state.id;
                self.states.push(state);
                id
            }
            Record::County(CountyRecord {
                mut county,
                max_cases,
                max_deaths,
            }) => {
                self.rollup.add_county(&mut county, max_cases, max_deaths)?;
                if let Some(num_days) = self.rollup.num_days() {
                    self.assembler.limit_series(num_days);
                }
                let id = county.id;
                self.counties.push(county);
                id
            }
        };

        self.progress
            .set_position(self.assembler.position().min(self.total_bytes) as u64);
        Ok(Some(id))
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.assembler.is_finished()
    }

    /// Decodes every remaining record and composes the dataset.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`] hit by a remaining record.
    pub fn finish(mut self) -> Result<Dataset, DecodeError> {
        while self.step()?.is_some() {}

        let totals = self.rollup.finish();
        let scale = marker_scale(totals.max_county_cases, self.max_marker_radius);
        let bounds = inflate_bounds(self.assembler.bounds(), &self.counties, scale);

        let states_by_name: BTreeMap<String, usize> = self
            .states
            .iter()
            .enumerate()
            .map(|(index, state)| (state.name.clone(), index))
            .collect();

        log::info!(
            "Decoded {} states and {} counties over {} days starting {}",
            self.states.len(),
            self.counties.len(),
            totals.num_days,
            self.first_date
        );
        self.progress.finish(format!(
            "{} states, {} counties",
            self.states.len(),
            self.counties.len()
        ));

        Ok(Dataset {
            last_updated: self.last_updated,
            first_date: self.first_date,
            dates: date_axis(self.first_date, totals.num_days),
            num_days: totals.num_days,
            states: self.states,
            counties: self.counties,
            states_by_name,
            state_cases: totals.state_cases,
            state_deaths: totals.state_deaths,
            total_cases: totals.total_cases,
            total_deaths: totals.total_deaths,
            total_population: totals.total_population,
            max_total_cases: totals.max_total_cases,
            max_total_deaths: totals.max_total_deaths,
            max_county_cases: totals.max_county_cases,
            max_county_deaths: totals.max_county_deaths,
            marker_scale: scale,
            bounds,
        })
    }
}

/// Cleans up the header's free-form "last updated" text.
///
/// `Pacific` is shortened to `PST`, anything from the first `/` on is
/// dropped and `, at` becomes ` at`.
#[must_use]
pub fn normalize_last_updated(raw: &str) -> String {
    let text = raw.trim().replace("Pacific", "PST");
    let text = text.split('/').next().unwrap_or_default();
    text.replace(", at", " at").trim().to_string()
}

/// Parses the `M/D/YYYY` first-date header line.
///
/// # Errors
///
/// Returns [`DecodeError::MalformedHeader`] if the line is not a valid date.
pub fn parse_first_date(line: &str) -> Result<NaiveDate, DecodeError> {
    let line = line.trim();
    NaiveDate::parse_from_str(line, "%m/%d/%Y").map_err(|e| DecodeError::MalformedHeader {
        message: format!("first date {line:?} is not M/D/YYYY: {e}"),
    })
}

/// One display label per day starting at `first_date`.
#[must_use]
pub fn date_axis(first_date: NaiveDate, num_days: usize) -> Vec<DateLabel> {
    (0..num_days)
        .map_while(|offset| first_date.checked_add_days(Days::new(offset as u64)))
        .map(|date| DateLabel {
            text: date.format("%b %-d").to_string(),
            weekday: date.format("%a").to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_last_updated_text() {
        assert_eq!(
            normalize_last_updated("  April 3, at 5:00 PM Pacific / source: somewhere \n"),
            "April 3 at 5:00 PM PST"
        );
        assert_eq!(normalize_last_updated("yesterday"), "yesterday");
    }

    #[test]
    fn parses_unpadded_dates() {
        assert_eq!(
            parse_first_date("1/22/2020").unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 22).unwrap()
        );
        assert_eq!(
            parse_first_date("03/05/2020").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 5).unwrap()
        );
    }

    #[test]
    fn rejects_bad_dates() {
        for line in ["", "2020-01-22", "13/1/2020", "2/30/2020"] {
            assert!(
                matches!(parse_first_date(line), Err(DecodeError::MalformedHeader { .. })),
                "{line:?} should be rejected"
            );
        }
    }

    #[test]
    fn date_axis_crosses_month_end() {
        let axis = date_axis(NaiveDate::from_ymd_opt(2020, 1, 30).unwrap(), 4);
        let text: Vec<&str> = axis.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(text, vec!["Jan 30", "Jan 31", "Feb 1", "Feb 2"]);
        assert_eq!(axis[0].weekday, "Thu");
        assert_eq!(axis[3].weekday, "Sun");
    }

    #[test]
    fn missing_header_lines_are_malformed() {
        let err = Decoder::new(b"", DecodeOptions::default()).err().unwrap();
        assert!(matches!(err, DecodeError::MalformedHeader { .. }));

        let err = Decoder::new(b"today\n", DecodeOptions::default()).err().unwrap();
        assert!(matches!(err, DecodeError::MalformedHeader { .. }));
    }

    #[test]
    fn header_only_snapshot_is_empty_dataset() {
        let dataset = Decoder::new(b"today\n1/22/2020\n", DecodeOptions::default())
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(dataset.num_days, 0);
        assert!(dataset.states.is_empty());
        assert!(dataset.dates.is_empty());
        assert!(dataset.bounds.is_none());
        assert!(dataset.marker_scale.abs() < f64::EPSILON);
    }
}
