//! Snapshot encoder.
//!
//! Produces buffers in the layout the decoder reads: two header lines, then
//! state and county records, each with a 4-byte aligned polygon block. Used
//! to build snapshots from other sources and to construct test fixtures.

use chrono::{Datelike as _, NaiveDate};
use thiserror::Error;

use crate::assembler::{STATE_DELIMITER, STATE_SENTINEL};
use crate::polygon::is_clockwise;

/// Errors produced while encoding a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The polygon has more components than an `i32` length can describe.
    #[error("polygon has {components} coordinate components, more than a block can hold")]
    TooManyComponents {
        /// Number of `u16` components in the block.
        components: usize,
    },

    /// A population does not fit the block's `i32` field.
    #[error("population {population} does not fit in a polygon block")]
    PopulationTooLarge {
        /// The rejected population.
        population: u64,
    },

    /// A name would be misread when decoding.
    #[error("name {name:?} cannot be encoded: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it cannot be encoded.
        reason: &'static str,
    },
}

/// Coordinates and population for one record's polygon block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolygonRecord {
    pub population: u64,
    /// Interleaved `x, y` components of every ring, rings back to back.
    pub components: Vec<u16>,
}

impl PolygonRecord {
    /// A block without geometry. Its population is not encoded.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a block from outer rings only.
    ///
    /// Each ring is closed and wound clockwise so it decodes as an outer
    /// boundary.
    #[must_use]
    pub fn from_rings(population: u64, rings: &[Vec<[u16; 2]>]) -> Self {
        let mut record = Self {
            population,
            components: Vec::new(),
        };
        for ring in rings {
            record.push_ring(ring, true);
        }
        record
    }

    /// Builds a block for one polygon with holes.
    ///
    /// The outer ring is wound clockwise and holes counter-clockwise.
    #[must_use]
    pub fn from_polygon(population: u64, outer: &[[u16; 2]], holes: &[Vec<[u16; 2]>]) -> Self {
        let mut record = Self::from_rings(population, &[outer.to_vec()]);
        for hole in holes {
            record.push_ring(hole, false);
        }
        record
    }

    fn push_ring(&mut self, ring: &[[u16; 2]], outer: bool) {
        let Some(&first) = ring.first() else {
            return;
        };

        let mut ring = ring.to_vec();
        if ring.last() != Some(&first) {
            ring.push(first);
        }

        let coords: Vec<geo::Coord<f64>> = ring
            .iter()
            .map(|&[x, y]| geo::Coord {
                x: f64::from(x),
                y: f64::from(y),
            })
            .collect();
        if is_clockwise(&coords) != outer {
            ring.reverse();
        }

        self.components.extend(ring.iter().flatten());
    }
}

/// Accumulates an encoded snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    /// Starts a snapshot with its two header lines.
    #[must_use]
    pub fn new(last_updated: &str, first_date: NaiveDate) -> Self {
        let mut writer = Self::default();
        writer.write_line(last_updated);
        writer.write_line(&format!(
            "{}/{}/{}",
            first_date.month(),
            first_date.day(),
            first_date.year()
        ));
        writer
    }

    /// Appends a state header record.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] if the names or the polygon block cannot be
    /// encoded.
    pub fn write_state(
        &mut self,
        shortcode: &str,
        name: &str,
        polygon: &PolygonRecord,
    ) -> Result<(), WriteError> {
        if shortcode.contains(STATE_DELIMITER) {
            return Err(WriteError::InvalidName {
                name: shortcode.to_string(),
                reason: "shortcode contains the header delimiter",
            });
        }
        check_line(shortcode)?;
        check_line(name)?;

        self.write_line(&format!("{STATE_SENTINEL}{shortcode}{STATE_DELIMITER}{name}"));
        self.write_polygon(polygon)
    }

    /// Appends a county record belonging to the last written state.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] if the name or the polygon block cannot be
    /// encoded.
    pub fn write_county(
        &mut self,
        name: &str,
        polygon: &PolygonRecord,
        cases: &[u64],
        deaths: &[u64],
    ) -> Result<(), WriteError> {
        if name.starts_with(STATE_SENTINEL) {
            return Err(WriteError::InvalidName {
                name: name.to_string(),
                reason: "county name starts with the state sentinel",
            });
        }
        check_line(name)?;

        self.write_line(name);
        self.write_polygon(polygon)?;
        self.write_line(&encode_series(cases));
        self.write_line(&encode_series(deaths));
        Ok(())
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Writes one byte per character, as the reader reads them back.
    /// Characters past U+00FF become `?`; names are checked up front by
    /// [`check_line`].
    fn write_line(&mut self, line: &str) {
        self.buf
            .extend(line.chars().map(|ch| u8::try_from(ch).unwrap_or(b'?')));
        self.buf.push(b'\n');
    }

    fn write_polygon(&mut self, polygon: &PolygonRecord) -> Result<(), WriteError> {
        let length = i32::try_from(polygon.components.len()).map_err(|_| {
            WriteError::TooManyComponents {
                components: polygon.components.len(),
            }
        })?;

        while self.buf.len() % 4 != 0 {
            self.buf.push(b' ');
        }
        self.buf.extend_from_slice(&length.to_le_bytes());

        if length > 0 {
            let population = i32::try_from(polygon.population).map_err(|_| {
                WriteError::PopulationTooLarge {
                    population: polygon.population,
                }
            })?;
            self.buf.extend_from_slice(&population.to_le_bytes());
        }

        for component in &polygon.components {
            self.buf.extend_from_slice(&component.to_le_bytes());
        }
        self.buf.push(b'\n');
        Ok(())
    }
}

fn check_line(name: &str) -> Result<(), WriteError> {
    if name.contains('\n') {
        return Err(WriteError::InvalidName {
            name: name.to_string(),
            reason: "contains a newline",
        });
    }
    if name.chars().any(|ch| u8::try_from(ch).is_err()) {
        return Err(WriteError::InvalidName {
            name: name.to_string(),
            reason: "has characters outside Latin-1",
        });
    }
    Ok(())
}

/// Encodes a dense series as a run-length series line.
///
/// Values are grouped into `count,value` runs. From the first run where the
/// remaining runs would take more tokens than writing the values out, a `0`
/// terminator is emitted followed by the remaining values as literals.
#[must_use]
pub fn encode_series(values: &[u64]) -> String {
    let mut runs: Vec<u64> = Vec::new();
    for &value in values {
        match runs.as_mut_slice() {
            [.., count, last] if *last == value => *count += 1,
            _ => runs.extend([1, value]),
        }
    }

    let tokens = compress_runs(&runs);
    tokens
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn compress_runs(runs: &[u64]) -> Vec<u64> {
    for start in (0..runs.len()).step_by(2) {
        let remaining: u64 = runs[start..].iter().step_by(2).sum();
        let remaining_tokens = (runs.len() - start) as u64;

        if remaining + 1 < remaining_tokens {
            let mut tokens = runs[..start].to_vec();
            tokens.push(0);
            for pair in runs[start..].chunks_exact(2) {
                tokens.extend(std::iter::repeat_n(pair[1], usize::try_from(pair[0]).unwrap_or(0)));
            }
            return tokens;
        }
    }

    runs.to_vec()
}
