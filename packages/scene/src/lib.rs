#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map scene building for decoded snapshots.
//!
//! [`build_scene`] turns a dataset, a day and a metric into everything a
//! renderer draws: shaded county regions, state outlines, proportional
//! markers and weighted text labels. The scene is plain data and
//! serializes to JSON; drawing it is up to the caller.

pub mod index;
pub mod shading;

use covid_map_dataset_models::{County, Dataset, DateLabel, LabelPoint, State};
use covid_map_metrics::{Metric as _, MetricError, MetricKey};
use geo::Polygon;
use serde::Serialize;
use thiserror::Error;

pub use index::PlaceIndex;
use shading::Rgba;

/// Multiplier from `sqrt(value)` to text label weight.
const LABEL_WEIGHT: f64 = 400_000.0;

/// Markers smaller than this are not drawn.
const MIN_MARKER_RADIUS: f64 = 0.01;

/// Errors produced while building a scene.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// The metric could not be evaluated.
    #[error(transparent)]
    Metric(#[from] MetricError),

    /// A numeric display option is NaN or infinite.
    #[error("display option {name} must be finite, got {value}")]
    InvalidOption {
        /// Option name.
        name: &'static str,
        value: f64,
    },
}

/// Display toggles and view state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneOptions {
    /// Emit text labels at all.
    pub show_text_labels: bool,
    /// Emit shaded county regions.
    pub show_counties: bool,
    /// Shrink markers when zooming in so they keep their on-screen size.
    pub retain_circle_size: bool,
    /// Base marker scale.
    pub circle_scale: f64,
    /// Zoom level the map opened at.
    pub initial_zoom: f64,
    /// Current zoom level.
    pub zoom: f64,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            show_text_labels: true,
            show_counties: true,
            retain_circle_size: true,
            circle_scale: 4000.0,
            initial_zoom: 0.0,
            zoom: 0.0,
        }
    }
}

/// Rings of one polygon as `[x, y]` pairs, exterior first.
pub type Rings = Vec<Vec<[f64; 2]>>;

/// A shaded county polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyRegion {
    pub county_id: u32,
    pub name: String,
    pub state: String,
    pub value: f64,
    pub fill: Rgba,
    pub line: Rgba,
    pub rings: Rings,
}

/// A state polygon, drawn as an outline over the counties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRegion {
    pub state_id: u32,
    pub shortcode: String,
    pub name: String,
    pub line: Rgba,
    pub rings: Rings,
}

/// A proportional circle at a county's label point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub county_id: u32,
    pub position: [f64; 2],
    /// `sqrt(value)`, before [`Scene::radius_scale`] is applied.
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLabel {
    pub text: String,
    pub position: [f64; 2],
    /// Placement priority; heavier labels win collisions.
    pub weight: f64,
}

/// Extent of the data in the projected plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub min: [f64; 2],
    pub max: [f64; 2],
    pub center: [f64; 2],
    pub width: f64,
    pub height: f64,
}

/// Everything needed to draw one day of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub metric: MetricKey,
    pub day: usize,
    pub date: Option<DateLabel>,
    /// National value of the metric, formatted.
    pub total: String,
    /// Value that maps to the darkest county shade.
    pub max: f64,
    /// Multiplier from [`Marker::radius`] to drawn radius.
    pub radius_scale: f64,
    pub marker_fill: Rgba,
    pub marker_line: Rgba,
    pub viewport: Option<Viewport>,
    pub county_regions: Vec<CountyRegion>,
    pub state_regions: Vec<StateRegion>,
    pub markers: Vec<Marker>,
    pub labels: Vec<TextLabel>,
}

/// Builds the scene for `key` on `day`.
///
/// # Errors
///
/// * [`SceneError::Metric`] if `day` is past the end of the dataset
/// * [`SceneError::InvalidOption`] if a numeric option is not finite
pub fn build_scene(
    dataset: &Dataset,
    key: MetricKey,
    day: usize,
    options: &SceneOptions,
) -> Result<Scene, SceneError> {
    for (name, value) in [
        ("circle_scale", options.circle_scale),
        ("initial_zoom", options.initial_zoom),
        ("zoom", options.zoom),
    ] {
        if !value.is_finite() {
            return Err(SceneError::InvalidOption { name, value });
        }
    }

    let total = key.total(dataset, day)?;
    let max = shading_max(dataset, key);

    let counties = dataset
        .counties
        .iter()
        .filter(|county| county.polygon.is_some())
        .map(|county| {
            key.for_county(dataset, county, day)
                .map(|value| (county, value))
        })
        .collect::<Result<Vec<(&County, f64)>, MetricError>>()?;

    let county_regions = if options.show_counties {
        counties
            .iter()
            .flat_map(|&(county, value)| regions_for_county(county, value, max))
            .collect()
    } else {
        Vec::new()
    };

    let state_regions = dataset.states.iter().flat_map(regions_for_state).collect();

    let markers = counties
        .iter()
        .filter_map(|&(county, value)| {
            let label = county.polygon.as_ref()?.label;
            Some(Marker {
                county_id: county.id,
                position: label.position(),
                radius: marker_radius(value),
            })
        })
        .collect();

    let labels = if options.show_text_labels {
        text_labels(dataset, key, &counties)
    } else {
        Vec::new()
    };

    let zoom_scale = shading::zoom_scale(options.initial_zoom, options.zoom);
    let circle_scale =
        shading::effective_circle_scale(options.circle_scale, zoom_scale, options.retain_circle_size);

    let scene = Scene {
        metric: key,
        day,
        date: dataset.dates.get(day).cloned(),
        total: key.format(total),
        max,
        radius_scale: circle_scale / 100.0,
        marker_fill: shading::MARKER_FILL,
        marker_line: shading::MARKER_LINE,
        viewport: dataset.bounds.map(|bounds| {
            let center = bounds.center();
            Viewport {
                min: [bounds.min().x, bounds.min().y],
                max: [bounds.max().x, bounds.max().y],
                center: [center.x, center.y],
                width: bounds.width(),
                height: bounds.height(),
            }
        }),
        county_regions,
        state_regions,
        markers,
        labels,
    };

    log::debug!(
        "Scene for {key} day {day}: {} county regions, {} markers, {} labels",
        scene.county_regions.len(),
        scene.markers.len(),
        scene.labels.len()
    );

    Ok(scene)
}

/// Ceiling for county shading. Raw totals are shaded against the largest
/// single county rather than the national total.
#[allow(clippy::cast_precision_loss)]
fn shading_max(dataset: &Dataset, key: MetricKey) -> f64 {
    match key {
        MetricKey::Cases => dataset.max_county_cases as f64,
        MetricKey::Deaths => dataset.max_county_deaths as f64,
        _ => key.max_for(dataset),
    }
}

fn regions_for_county(county: &County, value: f64, max: f64) -> Vec<CountyRegion> {
    let Some(geometry) = &county.polygon else {
        return Vec::new();
    };

    geometry
        .polygons
        .iter()
        .map(|polygon| CountyRegion {
            county_id: county.id,
            name: county.name.clone(),
            state: county.state.clone(),
            value,
            fill: shading::fill_color(value, max),
            line: shading::line_color(value, max),
            rings: rings(polygon),
        })
        .collect()
}

fn regions_for_state(state: &State) -> Vec<StateRegion> {
    let Some(geometry) = &state.polygon else {
        return Vec::new();
    };

    geometry
        .polygons
        .iter()
        .map(|polygon| StateRegion {
            state_id: state.id,
            shortcode: state.shortcode.clone(),
            name: state.name.clone(),
            line: shading::STATE_LINE,
            rings: rings(polygon),
        })
        .collect()
}

fn marker_radius(value: f64) -> f64 {
    let radius = value.sqrt();
    if radius.is_finite() && radius >= MIN_MARKER_RADIUS {
        radius
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn text_labels(dataset: &Dataset, key: MetricKey, counties: &[(&County, f64)]) -> Vec<TextLabel> {
    let county_labels = counties
        .iter()
        .filter(|(_, value)| value.is_finite() && *value > 0.0)
        .filter_map(|&(county, value)| {
            let LabelPoint { x, y, .. } = county.polygon.as_ref()?.label;
            Some(TextLabel {
                text: format!("{} {}", county.name, key.format(value)),
                position: [x, y],
                weight: value.sqrt() * LABEL_WEIGHT,
            })
        });

    let state_weight = (dataset.max_county_cases as f64).sqrt() * LABEL_WEIGHT;
    let state_labels = dataset.states.iter().filter_map(|state| {
        Some(TextLabel {
            text: state.shortcode.clone(),
            position: state.polygon.as_ref()?.label.position(),
            weight: state_weight,
        })
    });

    county_labels.chain(state_labels).collect()
}

fn rings(polygon: &Polygon<f64>) -> Rings {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}
