//! Display formatting for metric values.

/// Text shown for values that cannot be computed, such as a rate over a
/// zero population.
pub const NOT_AVAILABLE: &str = "N/A";

/// How a metric's values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// Whole counts with thousands separators.
    Count,
    /// Per-100k rates, rounded to the nearest whole number.
    Per100k,
    /// A ratio shown as a percentage with one decimal.
    Percent,
}

impl ValueFormat {
    #[must_use]
    pub fn format(self, value: f64) -> String {
        if !value.is_finite() {
            return NOT_AVAILABLE.to_string();
        }

        match self {
            Self::Count | Self::Per100k => group_digits(round_to_u64(value)),
            Self::Percent => format!("{:.1}%", value * 100.0),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_u64(value: f64) -> u64 {
    value.round().max(0.0) as u64
}

/// Formats an integer with `,` between groups of three digits.
#[must_use]
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
