//! Record-by-record assembly of states and counties.
//!
//! Records are positional: a county belongs to the most recent state
//! header. That ownership is tracked by [`RecordState`], so a county that
//! shows up before any state is a typed error rather than a dangling owner.

use std::sync::Arc;

use covid_map_dataset_models::{County, PlaceGeometry, PlaceStats, State};
use geo::Rect;

use crate::DecodeError;
use crate::label::InscribedCircle;
use crate::polygon::{bounding_box, build_geometry, coordinates_from_components, union_rect};
use crate::reader::ByteReader;
use crate::series::{MAX_SERIES_DAYS, SERIES_SLACK_DAYS, decode_series};

/// Marks a state header line.
pub const STATE_SENTINEL: char = '>';

/// Separates shortcode from name in a state header.
pub const STATE_DELIMITER: char = '-';

/// Which state, if any, currently owns county records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    /// No state header read yet.
    AwaitingState,
    /// Counties belong to the named state.
    InState {
        /// Full name of the owning state.
        name: String,
    },
}

/// Classification of a record's first line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLine {
    State { shortcode: String, name: String },
    County { name: String },
}

impl RecordLine {
    /// Parses a record line: `>SC-Name` is a state, anything else a county.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let Some(header) = line.strip_prefix(STATE_SENTINEL) else {
            return Self::County {
                name: line.to_string(),
            };
        };

        match header.split_once(STATE_DELIMITER) {
            Some((shortcode, name)) => Self::State {
                shortcode: shortcode.to_string(),
                name: name.to_string(),
            },
            None => {
                log::warn!("State header {header:?} has no shortcode delimiter");
                Self::State {
                    shortcode: header.to_string(),
                    name: header.to_string(),
                }
            }
        }
    }
}

/// A county together with the maxima of its two series.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyRecord {
    pub county: County,
    pub max_cases: u64,
    pub max_deaths: u64,
}

/// One assembled record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    State(State),
    County(CountyRecord),
}

/// Reads records from the snapshot body one at a time.
pub struct Assembler<'a> {
    reader: ByteReader<'a>,
    state: RecordState,
    next_id: u32,
    finder: Arc<dyn InscribedCircle>,
    bounds: Option<Rect<f64>>,
    /// Longest series line accepted, in days.
    series_limit: usize,
}

impl<'a> Assembler<'a> {
    /// Takes over a reader positioned at the first record.
    #[must_use]
    pub fn new(reader: ByteReader<'a>, finder: Arc<dyn InscribedCircle>) -> Self {
        Self {
            reader,
            state: RecordState::AwaitingState,
            next_id: 1,
            finder,
            bounds: None,
            series_limit: MAX_SERIES_DAYS,
        }
    }

    /// Caps later series at the dataset's day count plus
    /// [`SERIES_SLACK_DAYS`] once that count is known.
    pub fn limit_series(&mut self, num_days: usize) {
        self.series_limit = num_days
            .saturating_add(SERIES_SLACK_DAYS)
            .min(MAX_SERIES_DAYS);
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.reader.position()
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.reader.is_at_end()
    }

    /// Bounding box over every coordinate decoded so far.
    #[must_use]
    pub const fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    #[must_use]
    pub const fn state(&self) -> &RecordState {
        &self.state
    }

    /// Reads the next record, or `None` once the buffer is exhausted.
    ///
    /// # Errors
    ///
    /// * [`DecodeError::TruncatedRecord`] if the buffer ends inside the record
    /// * [`DecodeError::MalformedRecordOrder`] for a county before any state
    /// * [`DecodeError::MalformedPolygon`] for a negative length or population
    /// * [`DecodeError::MalformedSeries`] for an undecodable series line
    pub fn next_record(&mut self) -> Result<Option<Record>, DecodeError> {
        if self.reader.is_at_end() {
            return Ok(None);
        }

        let id = self.next_id;
        let line = self.reader.read_line();

        let record = match RecordLine::parse(&line) {
            RecordLine::State { shortcode, name } => {
                let (polygon, stats) = self.read_polygon_block(id)?;
                self.state = RecordState::InState { name: name.clone() };

                log::debug!("Record {id}: state {name} ({shortcode})");
                Record::State(State {
                    id,
                    shortcode,
                    name,
                    polygon,
                    stats,
                })
            }
            RecordLine::County { name } => {
                let RecordState::InState { name: state } = &self.state else {
                    return Err(DecodeError::MalformedRecordOrder { record: id, county: name });
                };
                let state = state.clone();

                let (polygon, stats) = self.read_polygon_block(id)?;
                let cases = self.read_series(id)?;
                let deaths = self.read_series(id)?;

                log::debug!("Record {id}: county {name}, {state}");
                Record::County(CountyRecord {
                    county: County {
                        id,
                        name,
                        state,
                        polygon,
                        stats,
                        cases: cases.values,
                        deaths: deaths.values,
                    },
                    max_cases: cases.max,
                    max_deaths: deaths.max,
                })
            }
        };

        self.next_id += 1;
        Ok(Some(record))
    }

    fn read_polygon_block(
        &mut self,
        record: u32,
    ) -> Result<(Option<PlaceGeometry>, PlaceStats), DecodeError> {
        let truncated = |source| DecodeError::TruncatedRecord { record, source };

        self.reader.align_to_4();
        let length = self.reader.read_i32().map_err(truncated)?;
        let length = usize::try_from(length).map_err(|_| DecodeError::MalformedPolygon {
            record,
            message: format!("negative component count {length}"),
        })?;

        let population = if length > 0 {
            let raw = self.reader.read_i32().map_err(truncated)?;
            Some(
                u64::try_from(raw).map_err(|_| DecodeError::MalformedPolygon {
                    record,
                    message: format!("negative population {raw}"),
                })?,
            )
        } else {
            None
        };

        let components = self.reader.read_u16_array(length).map_err(truncated)?;
        self.reader.skip(1).map_err(truncated)?;

        let coords = coordinates_from_components(&components);
        if let Some(rect) = bounding_box(&coords) {
            self.bounds = Some(union_rect(self.bounds, rect));
        }

        let polygon = build_geometry(&coords, self.finder.as_ref());
        Ok((polygon, PlaceStats { population }))
    }

    fn read_series(&mut self, record: u32) -> Result<crate::series::DecodedSeries, DecodeError> {
        let line = self
            .reader
            .read_required_line()
            .map_err(|source| DecodeError::TruncatedRecord { record, source })?;
        decode_series(&line, self.series_limit)
            .map_err(|source| DecodeError::MalformedSeries { record, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::PoleOfInaccessibility;
    use crate::writer::{PolygonRecord, SnapshotWriter};

    fn assembler(bytes: &[u8]) -> Assembler<'_> {
        Assembler::new(
            ByteReader::new(bytes),
            Arc::new(PoleOfInaccessibility::default()),
        )
    }

    #[test]
    fn parses_record_lines() {
        assert_eq!(
            RecordLine::parse(">CA-California"),
            RecordLine::State {
                shortcode: "CA".to_string(),
                name: "California".to_string()
            }
        );
        assert_eq!(
            RecordLine::parse("Los Angeles"),
            RecordLine::County {
                name: "Los Angeles".to_string()
            }
        );
    }

    #[test]
    fn state_name_keeps_later_delimiters() {
        assert_eq!(
            RecordLine::parse(">XX-Name-With-Dash"),
            RecordLine::State {
                shortcode: "XX".to_string(),
                name: "Name-With-Dash".to_string()
            }
        );
    }

    #[test]
    fn county_inherits_latest_state() {
        let mut writer = SnapshotWriter::default();
        writer
            .write_state("WA", "Washington", &PolygonRecord::empty())
            .unwrap();
        writer
            .write_county("King", &PolygonRecord::empty(), &[1, 2], &[0, 1])
            .unwrap();
        let bytes = writer.into_bytes();

        let mut assembler = assembler(&bytes);
        let Some(Record::State(state)) = assembler.next_record().unwrap() else {
            panic!("expected a state record");
        };
        assert_eq!(state.id, 1);
        assert!(state.polygon.is_none());
        assert_eq!(state.stats.population, None);
        assert_eq!(
            assembler.state(),
            &RecordState::InState {
                name: "Washington".to_string()
            }
        );

        let Some(Record::County(record)) = assembler.next_record().unwrap() else {
            panic!("expected a county record");
        };
        assert_eq!(record.county.id, 2);
        assert_eq!(record.county.state, "Washington");
        assert_eq!(record.county.cases, vec![1, 2]);
        assert_eq!(record.county.deaths, vec![0, 1]);
        assert_eq!(record.max_cases, 2);
        assert_eq!(record.max_deaths, 1);

        assert!(assembler.next_record().unwrap().is_none());
        assert!(assembler.is_finished());
    }

    #[test]
    fn county_before_state_is_rejected() {
        let mut writer = SnapshotWriter::default();
        writer
            .write_county("Orphan", &PolygonRecord::empty(), &[1], &[0])
            .unwrap();
        let bytes = writer.into_bytes();

        let err = assembler(&bytes).next_record().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedRecordOrder { record: 1, ref county } if county == "Orphan"
        ));
    }

    #[test]
    fn polygon_block_carries_population_and_bounds() {
        let square = PolygonRecord::from_rings(40, &[vec![[0, 0], [0, 10], [10, 10], [10, 0]]]);
        let mut writer = SnapshotWriter::default();
        writer.write_state("CA", "California", &square).unwrap();
        let bytes = writer.into_bytes();

        let mut assembler = assembler(&bytes);
        let Some(Record::State(state)) = assembler.next_record().unwrap() else {
            panic!("expected a state record");
        };
        assert_eq!(state.stats.population, Some(40));
        let polygon = state.polygon.unwrap();
        assert_eq!(polygon.polygons.0.len(), 1);
        assert!((polygon.label.distance - 5.0).abs() < 1.0);

        let bounds = assembler.bounds().unwrap();
        assert!((bounds.width() - 10.0).abs() < f64::EPSILON);
        assert!(assembler.is_finished());
    }

    #[test]
    fn truncated_polygon_block_is_an_error() {
        let mut body = b">AA-Alpha\n".to_vec();
        body.extend_from_slice(&[b' ', b' ']);
        body.extend_from_slice(&3i32.to_le_bytes());

        let err = assembler(&body).next_record().unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedRecord { record: 1, .. }));
    }

    #[test]
    fn missing_series_line_is_truncation() {
        let mut writer = SnapshotWriter::default();
        writer
            .write_state("WA", "Washington", &PolygonRecord::empty())
            .unwrap();
        let mut bytes = writer.into_bytes();
        bytes.extend_from_slice(b"King\n");
        while bytes.len() % 4 != 0 {
            bytes.push(b' ');
        }
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.push(b'\n');

        let mut assembler = assembler(&bytes);
        assembler.next_record().unwrap();
        let err = assembler.next_record().unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedRecord { record: 2, .. }));
    }

    #[test]
    fn negative_length_is_malformed() {
        let mut body = b">AA-Alpha\n".to_vec();
        body.extend_from_slice(&[b' ', b' ']);
        body.extend_from_slice(&(-4i32).to_le_bytes());
        body.push(b'\n');

        let err = assembler(&body).next_record().unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPolygon { record: 1, .. }));
    }
}
