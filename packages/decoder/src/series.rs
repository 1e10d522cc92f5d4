//! Run-length series lines.
//!
//! A series line is comma-separated integers in two phases: leading
//! `count,value` runs, then (after a `0` count) one literal value per day.

use covid_map_dataset_models::TimeSeries;
use thiserror::Error;

/// Upper bound on any series before the dataset's day count is known.
pub const MAX_SERIES_DAYS: usize = 36_525;

/// Trailing days a series may carry past the dataset's day count. Only
/// zeros are accepted there, see [`crate::rollup`].
pub const SERIES_SLACK_DAYS: usize = 7;

/// Errors produced while decoding a series line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    /// A token is not a non-negative integer.
    #[error("token {index} ({token:?}) is not a non-negative integer")]
    InvalidToken {
        /// Zero-based token position in the line.
        index: usize,
        /// The offending token text.
        token: String,
    },

    /// A run count is the last token, with no value to repeat.
    #[error("run of {count} at token {index} has no value")]
    DanglingRun {
        /// Zero-based position of the count token.
        index: usize,
        /// The run length that was read.
        count: u64,
    },

    /// Expanding the line would exceed the allowed number of days.
    #[error("series exceeds {max_days} days at token {index}")]
    TooLong {
        /// Zero-based position of the token that overflowed.
        index: usize,
        max_days: usize,
    },
}

/// A dense series and its largest element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedSeries {
    pub values: TimeSeries,
    pub max: u64,
}

impl DecodedSeries {
    fn push_run(&mut self, count: usize, value: u64) {
        self.values.resize(self.values.len() + count, value);
        if count > 0 {
            self.max = self.max.max(value);
        }
    }
}

/// Length after adding `count` days, if it stays within `max_days`.
fn grow(len: usize, count: u64, max_days: usize) -> Option<usize> {
    usize::try_from(count)
        .ok()
        .and_then(|count| len.checked_add(count))
        .filter(|&total| total <= max_days)
}

/// Decodes one series line into its dense per-day values.
///
/// An empty line decodes to an empty series. Runs are checked against
/// `max_days` before they are expanded.
///
/// # Errors
///
/// Returns [`SeriesError`] if a token is not an integer, a run has no
/// value or the series would be longer than `max_days`.
pub fn decode_series(line: &str, max_days: usize) -> Result<DecodedSeries, SeriesError> {
    let line = line.trim();
    let mut series = DecodedSeries::default();

    if line.is_empty() {
        return Ok(series);
    }

    let tokens = line
        .split(',')
        .enumerate()
        .map(|(index, token)| {
            token
                .trim()
                .parse::<u64>()
                .map_err(|_| SeriesError::InvalidToken {
                    index,
                    token: token.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut iter = tokens.iter().copied().enumerate();

    while let Some((index, count)) = iter.next() {
        if count == 0 {
            break;
        }
        let (_, value) = iter.next().ok_or(SeriesError::DanglingRun { index, count })?;
        let total = grow(series.values.len(), count, max_days)
            .ok_or(SeriesError::TooLong { index, max_days })?;
        series.push_run(total - series.values.len(), value);
    }

    for (index, value) in iter {
        if series.values.len() >= max_days {
            return Err(SeriesError::TooLong { index, max_days });
        }
        series.push_run(1, value);
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_zero_makes_line_literal() {
        let series = decode_series("0,5,6,7", MAX_SERIES_DAYS).unwrap();
        assert_eq!(series.values, vec![5, 6, 7]);
        assert_eq!(series.max, 7);
    }

    #[test]
    fn runs_then_literals() {
        let series = decode_series("2,0,3,4,0,9,12", MAX_SERIES_DAYS).unwrap();
        assert_eq!(series.values, vec![0, 0, 4, 4, 4, 9, 12]);
        assert_eq!(series.max, 12);
    }

    #[test]
    fn runs_without_terminator() {
        let series = decode_series("3,0", MAX_SERIES_DAYS).unwrap();
        assert_eq!(series.values, vec![0, 0, 0]);
        assert_eq!(series.max, 0);
    }

    #[test]
    fn run_and_literal_encodings_agree() {
        let literal = decode_series("0,1,1,1,2,2,5", MAX_SERIES_DAYS).unwrap();
        let runs = decode_series("3,1,2,2,0,5", MAX_SERIES_DAYS).unwrap();
        assert_eq!(literal, runs);
    }

    #[test]
    fn literal_encoding_roundtrips() {
        let values: Vec<u64> = vec![0, 3, 3, 8, 21, 21, 40];
        let line = std::iter::once("0".to_string())
            .chain(values.iter().map(u64::to_string))
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(decode_series(&line, MAX_SERIES_DAYS).unwrap().values, values);
    }

    #[test]
    fn empty_line_is_empty_series() {
        assert_eq!(decode_series("", MAX_SERIES_DAYS).unwrap(), DecodedSeries::default());
        assert_eq!(decode_series("\r", MAX_SERIES_DAYS).unwrap(), DecodedSeries::default());
    }

    #[test]
    fn rejects_non_integer_tokens() {
        assert_eq!(
            decode_series("0,1,x", MAX_SERIES_DAYS).unwrap_err(),
            SeriesError::InvalidToken {
                index: 2,
                token: "x".to_string()
            }
        );
        assert!(decode_series("0,-1", MAX_SERIES_DAYS).is_err());
    }

    #[test]
    fn rejects_run_without_value() {
        assert_eq!(
            decode_series("2,5,4", MAX_SERIES_DAYS).unwrap_err(),
            SeriesError::DanglingRun { index: 2, count: 4 }
        );
    }

    #[test]
    fn huge_run_is_rejected_before_expanding() {
        assert_eq!(
            decode_series("50000000,1", MAX_SERIES_DAYS).unwrap_err(),
            SeriesError::TooLong {
                index: 0,
                max_days: MAX_SERIES_DAYS
            }
        );
        assert!(matches!(
            decode_series("18446744073709551615,1", 10),
            Err(SeriesError::TooLong { index: 0, .. })
        ));
    }

    #[test]
    fn limit_applies_across_runs_and_literals() {
        assert_eq!(decode_series("2,1,0,2,3", 4).unwrap().values, vec![1, 1, 2, 3]);
        assert_eq!(
            decode_series("2,1,3,2", 4).unwrap_err(),
            SeriesError::TooLong {
                index: 2,
                max_days: 4
            }
        );
        assert_eq!(
            decode_series("2,1,0,2,3,4", 4).unwrap_err(),
            SeriesError::TooLong {
                index: 5,
                max_days: 4
            }
        );
    }
}
