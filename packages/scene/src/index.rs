//! R-tree hit testing for tooltips.
//!
//! Maps a point in the projected plane back to the county or state drawn
//! there.

use covid_map_dataset_models::{Dataset, Place, PlaceGeometry};
use geo::{Contains, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};

/// A place polygon stored in the R-tree with its position in the dataset.
struct PlaceEntry {
    index: usize,
    area: f64,
    envelope: AABB<[f64; 2]>,
    polygons: MultiPolygon<f64>,
}

impl RTreeObject for PlaceEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PlaceEntry {
    fn new(index: usize, geometry: &PlaceGeometry) -> Self {
        let (min, max) = (geometry.bbox.min(), geometry.bbox.max());
        Self {
            index,
            area: geometry.bbox.width() * geometry.bbox.height(),
            envelope: AABB::from_corners([min.x, min.y], [max.x, max.y]),
            polygons: geometry.polygons.clone(),
        }
    }
}

/// Point lookups over the counties and states of one dataset.
///
/// Results are indices into [`Dataset::counties`] and [`Dataset::states`]
/// of the dataset the index was built from.
pub struct PlaceIndex {
    counties: RTree<PlaceEntry>,
    states: RTree<PlaceEntry>,
}

impl PlaceIndex {
    /// Indexes every place that has geometry.
    #[must_use]
    pub fn build(dataset: &Dataset) -> Self {
        let counties: Vec<PlaceEntry> = dataset
            .counties
            .iter()
            .enumerate()
            .filter_map(|(index, county)| Some(PlaceEntry::new(index, county.polygon.as_ref()?)))
            .collect();
        let states: Vec<PlaceEntry> = dataset
            .states
            .iter()
            .enumerate()
            .filter_map(|(index, state)| Some(PlaceEntry::new(index, state.polygon.as_ref()?)))
            .collect();

        log::debug!(
            "Indexed {} county and {} state polygons",
            counties.len(),
            states.len()
        );

        Self {
            counties: RTree::bulk_load(counties),
            states: RTree::bulk_load(states),
        }
    }

    /// County containing `(x, y)`. Overlaps resolve to the county with the
    /// smallest bounding box.
    #[must_use]
    pub fn lookup_county(&self, x: f64, y: f64) -> Option<usize> {
        lookup(&self.counties, x, y)
    }

    /// State containing `(x, y)`.
    #[must_use]
    pub fn lookup_state(&self, x: f64, y: f64) -> Option<usize> {
        lookup(&self.states, x, y)
    }

    /// The place drawn at `(x, y)`: a county if one is hit, otherwise the
    /// state. `dataset` must be the one the index was built from.
    #[must_use]
    pub fn place_at(&self, dataset: &Dataset, x: f64, y: f64) -> Option<Place> {
        if let Some(county) = self.lookup_county(x, y).and_then(|i| dataset.counties.get(i)) {
            return Some(Place::County(county.clone()));
        }
        self.lookup_state(x, y)
            .and_then(|i| dataset.states.get(i))
            .map(|state| Place::State(state.clone()))
    }
}

fn lookup(tree: &RTree<PlaceEntry>, x: f64, y: f64) -> Option<usize> {
    let point = Point::new(x, y);
    let query_env = AABB::from_point([x, y]);

    tree.locate_in_envelope_intersecting(&query_env)
        .filter(|entry| entry.polygons.contains(&point))
        .min_by(|a, b| a.area.total_cmp(&b.area))
        .map(|entry| entry.index)
}
