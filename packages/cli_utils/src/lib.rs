#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for the `covid_map` binary: snapshot progress bars and
//! a logger that stays out of their way.

use std::sync::Arc;
use std::time::Duration;

use covid_map_decoder::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {prefix}";
const BYTES_TEMPLATE: &str =
    "  {prefix} {wide_bar:.cyan/dim} {binary_bytes}/{binary_total_bytes} {msg} [{eta}]";
const RECORDS_TEMPLATE: &str =
    "{prefix} {wide_bar:.green/dim} {pos}/{len} records {msg} [{elapsed_precise}]";

/// What a bar counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotWork {
    /// Bytes of a snapshot buffer being decoded.
    Decoding,
    /// State and county records being written.
    Encoding,
}

impl SnapshotWork {
    const fn template(self) -> &'static str {
        match self {
            Self::Decoding => BYTES_TEMPLATE,
            Self::Encoding => RECORDS_TEMPLATE,
        }
    }

    fn style(self) -> ProgressStyle {
        ProgressStyle::with_template(self.template())
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}

/// Snapshot progress drawn with `indicatif`.
///
/// The label passed at construction is the bar's prefix. The decoder and
/// encoder report the current state as the message.
pub struct IndicatifProgress {
    bar: ProgressBar,
    work: SnapshotWork,
}

impl IndicatifProgress {
    fn new(bar: ProgressBar, work: SnapshotWork, label: &str) -> Self {
        bar.set_prefix(label.to_string());
        Self { bar, work }
    }

    /// Decode progress. Spins until the decoder reports the buffer length.
    #[must_use]
    pub fn bytes_bar(multi: &MultiProgress, label: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Arc::new(Self::new(bar, SnapshotWork::Decoding, label))
    }

    /// Encode progress over `records` states and counties.
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, label: &str, records: u64) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(records));
        bar.set_style(SnapshotWork::Encoding.style());
        Arc::new(Self::new(bar, SnapshotWork::Encoding, label))
    }

    #[must_use]
    pub const fn work(&self) -> SnapshotWork {
        self.work
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.work.style());
    }

    fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        match self.work {
            // Decoding is followed by command output, so the bar goes away.
            SnapshotWork::Decoding => {
                self.bar.finish_and_clear();
                log::info!("{}: {msg}", self.bar.prefix());
            }
            SnapshotWork::Encoding => self.bar.finish_with_message(msg),
        }
    }
}

/// Installs the `RUST_LOG`-filtered logger behind `indicatif-log-bridge`
/// and returns the [`MultiProgress`] every bar must be added to.
///
/// Safe to call more than once; later calls keep the first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
