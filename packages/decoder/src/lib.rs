#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Single-pass decoder for binary case snapshots.
//!
//! A snapshot is two header lines followed by state and county records.
//! Each record carries a 4-byte aligned polygon block; county records add a
//! run-length cases line and deaths line. [`decode`] turns a buffer into a
//! [`Dataset`] with per-state and national rollups already computed.
//!
//! Any structural problem aborts the decode; no partial dataset is
//! returned.

pub mod assembler;
pub mod composer;
pub mod label;
pub mod polygon;
pub mod progress;
pub mod reader;
pub mod rollup;
pub mod series;
pub mod writer;

use covid_map_dataset_models::Dataset;
use thiserror::Error;

pub use composer::{DecodeOptions, Decoder};
pub use label::{InscribedCircle, PoleOfInaccessibility};
pub use progress::{NullProgress, ProgressCallback};
pub use reader::ReadError;
pub use series::SeriesError;
pub use writer::{PolygonRecord, SnapshotWriter, WriteError};

/// Errors that abort a snapshot decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The header lines are missing or unparseable.
    #[error("malformed snapshot header: {message}")]
    MalformedHeader {
        /// What was wrong with the header.
        message: String,
    },

    /// The buffer ended in the middle of a record.
    #[error("record {record} is truncated")]
    TruncatedRecord {
        /// Id the record would have been assigned.
        record: u32,
        /// The read that ran off the end.
        #[source]
        source: ReadError,
    },

    /// A county record appeared before any state header.
    #[error("record {record}: county {county:?} appears before any state")]
    MalformedRecordOrder {
        record: u32,
        /// Name of the orphaned county.
        county: String,
    },

    /// A series line could not be decoded.
    #[error("record {record} has a malformed series line")]
    MalformedSeries {
        record: u32,
        #[source]
        source: SeriesError,
    },

    /// A polygon block has a negative length or population.
    #[error("record {record} has a malformed polygon block: {message}")]
    MalformedPolygon { record: u32, message: String },

    /// A county series does not span the dataset's days.
    #[error("record {record} has {actual} days of data, expected {expected}")]
    SeriesLengthMismatch {
        record: u32,
        expected: usize,
        actual: usize,
    },
}

/// Decodes a snapshot with default options.
///
/// # Errors
///
/// Returns [`DecodeError`] if the snapshot is structurally invalid.
pub fn decode(bytes: &[u8]) -> Result<Dataset, DecodeError> {
    decode_with(bytes, DecodeOptions::default())
}

/// Decodes a snapshot with the given options.
///
/// # Errors
///
/// Returns [`DecodeError`] if the snapshot is structurally invalid.
pub fn decode_with(bytes: &[u8], options: DecodeOptions) -> Result<Dataset, DecodeError> {
    Decoder::new(bytes, options)?.finish()
}
