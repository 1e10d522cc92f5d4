//! Colours and scale factors for map layers.

/// Colour as `[r, g, b, a]`.
pub type Rgba = [u8; 4];

/// Fill and line colour of regions with no value.
pub const TRANSPARENT: Rgba = [255, 255, 255, 0];

/// Outline of state regions.
pub const STATE_LINE: Rgba = [128, 128, 128, 255];

pub const MARKER_FILL: Rgba = [255, 0, 0, 51];
pub const MARKER_LINE: Rgba = [255, 0, 0, 204];

/// Lightest shade given to a region with any value at all.
const MIN_SHADE: f64 = 0.08;

/// Shade intensity in `[0.08, 1]`, or `None` when the region should be
/// transparent.
#[must_use]
pub fn shade(value: f64, max: f64) -> Option<f64> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    let ratio = if max > 0.0 { value / max } else { 1.0 };
    Some((ratio.powf(0.3) * 0.5).clamp(MIN_SHADE, 1.0))
}

/// Region fill: white fading to red as the shade grows.
#[must_use]
pub fn fill_color(value: f64, max: f64) -> Rgba {
    shade(value, max).map_or(TRANSPARENT, |shade| {
        let channel = to_channel(255.0 - shade * 255.0);
        [255, channel, channel, 255]
    })
}

/// Region outline, a grey slightly darker than the fill.
#[must_use]
pub fn line_color(value: f64, max: f64) -> Rgba {
    shade(value, max).map_or(TRANSPARENT, |shade| {
        let channel = to_channel(((255.0 - shade * 255.0) * 0.8).min(255.0));
        [channel, channel, channel, channel]
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// How much markers shrink relative to the initial zoom level. Never grows
/// past 1 when zooming out.
#[must_use]
pub fn zoom_scale(initial_zoom: f64, zoom: f64) -> f64 {
    (initial_zoom.exp2() / zoom.exp2()).min(1.0)
}

/// Circle scale after zoom compensation.
#[must_use]
pub fn effective_circle_scale(circle_scale: f64, zoom_scale: f64, retain_circle_size: bool) -> f64 {
    if retain_circle_size {
        circle_scale * zoom_scale
    } else {
        circle_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_missing_values_are_transparent() {
        assert_eq!(fill_color(0.0, 10.0), TRANSPARENT);
        assert_eq!(fill_color(f64::NAN, 10.0), TRANSPARENT);
        assert_eq!(line_color(0.0, 10.0), TRANSPARENT);
        assert!(shade(f64::INFINITY, 10.0).is_none());
    }

    #[test]
    fn maximum_value_is_half_shade() {
        let shade = shade(10.0, 10.0).unwrap();
        assert!((shade - 0.5).abs() < f64::EPSILON);
        assert_eq!(fill_color(10.0, 10.0), [255, 128, 128, 255]);
        assert_eq!(line_color(10.0, 10.0), [102, 102, 102, 102]);
    }

    #[test]
    fn small_values_get_minimum_shade() {
        let shade = shade(1.0, 1_000_000.0).unwrap();
        assert!((shade - MIN_SHADE).abs() < f64::EPSILON);
    }

    #[test]
    fn values_above_max_stay_in_range() {
        let shade = shade(1e9, 1.0).unwrap();
        assert!((shade - 1.0).abs() < f64::EPSILON);
        assert_eq!(fill_color(1e9, 1.0), [255, 0, 0, 255]);
    }

    #[test]
    fn zooming_in_shrinks_markers() {
        assert!((zoom_scale(0.0, 0.0) - 1.0).abs() < f64::EPSILON);
        assert!((zoom_scale(0.0, 2.0) - 0.25).abs() < f64::EPSILON);
        assert!((zoom_scale(0.0, -3.0) - 1.0).abs() < f64::EPSILON);

        assert!((effective_circle_scale(4000.0, 0.25, true) - 1000.0).abs() < f64::EPSILON);
        assert!((effective_circle_scale(4000.0, 0.25, false) - 4000.0).abs() < f64::EPSILON);
    }
}
