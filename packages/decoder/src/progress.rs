//! Progress reporting for snapshot decodes and encodes.
//!
//! The decoder calls [`ProgressCallback::set_total`] once with the buffer
//! length and [`ProgressCallback::set_position`] with the bytes consumed
//! after every record. The writer side advances by one per record with
//! [`ProgressCallback::inc`]. Terminal progress bars live in
//! `covid_map_cli_utils`.

use std::sync::Arc;

/// Receiver for decode/encode progress.
///
/// Shared as `Arc<dyn ProgressCallback>`, so implementations must be
/// `Send + Sync`. Only the byte/record counters are required; labels are
/// optional.
pub trait ProgressCallback: Send + Sync {
    /// Total units of work: buffer bytes when decoding, records when
    /// encoding.
    fn set_total(&self, total: u64);

    /// Absolute position, in the same units as [`Self::set_total`].
    fn set_position(&self, pos: u64);

    fn inc(&self, delta: u64);

    /// Name of the place currently being processed.
    fn set_message(&self, _msg: String) {}

    /// Called once when the work is done, with a one-line summary.
    fn finish(&self, _msg: String) {}
}

/// Ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
