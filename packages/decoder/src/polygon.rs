//! Ring reconstruction and grouping for snapshot polygon blocks.
//!
//! A polygon block is a flat run of coordinates. Rings are recovered by
//! watching for the ring's first coordinate to repeat, classified as outer
//! boundary or hole by winding, then grouped into polygons.

use covid_map_dataset_models::{LabelPoint, PlaceGeometry};
use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};

use crate::label::InscribedCircle;

/// Role of a ring inside a multi-polygon, derived from its winding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingKind {
    /// Clockwise (non-negative signed sum). Starts a new polygon.
    Outer,
    /// Counter-clockwise. Cuts into the polygon currently being built.
    Hole,
}

/// Pairs interleaved `x, y` components into coordinates.
///
/// A trailing unpaired component is ignored.
#[must_use]
pub fn coordinates_from_components(components: &[u16]) -> Vec<Coord<f64>> {
    if components.len() % 2 != 0 {
        log::warn!(
            "Polygon block has an odd component count ({}), dropping the last one",
            components.len()
        );
    }

    components
        .chunks_exact(2)
        .map(|pair| Coord {
            x: f64::from(pair[0]),
            y: f64::from(pair[1]),
        })
        .collect()
}

/// Splits a flat coordinate stream into rings.
///
/// A ring closes on the coordinate equal to its first one; that closing
/// coordinate stays in the ring. A trailing ring that never closes is kept.
#[must_use]
pub fn split_rings(coords: &[Coord<f64>]) -> Vec<Vec<Coord<f64>>> {
    let mut rings = Vec::new();
    let mut ring: Vec<Coord<f64>> = Vec::new();

    for &coord in coords {
        let closes = ring.first().is_some_and(|first| *first == coord);
        ring.push(coord);
        if closes {
            rings.push(std::mem::take(&mut ring));
        }
    }

    if !ring.is_empty() {
        rings.push(ring);
    }

    rings
}

/// Accumulates `(x2 - x1) * (y2 + y1)` over every edge, wrapping from the
/// last vertex back to the first.
#[must_use]
pub fn winding_sum(ring: &[Coord<f64>]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            (b.x - a.x) * (b.y + a.y)
        })
        .sum()
}

#[must_use]
pub fn is_clockwise(ring: &[Coord<f64>]) -> bool {
    winding_sum(ring) >= 0.0
}

#[must_use]
pub fn classify(ring: &[Coord<f64>]) -> RingKind {
    if is_clockwise(ring) {
        RingKind::Outer
    } else {
        RingKind::Hole
    }
}

/// Groups rings into polygons.
///
/// Every outer ring starts a new polygon; holes attach to the most recently
/// started one. A hole seen before any outer ring is promoted to an outer
/// ring since there is nothing to cut it from.
#[must_use]
pub fn group_rings(rings: Vec<Vec<Coord<f64>>>) -> Vec<Polygon<f64>> {
    let mut polygons = Vec::new();
    let mut open: Option<(LineString<f64>, Vec<LineString<f64>>)> = None;

    for ring in rings {
        let kind = classify(&ring);
        let ring = LineString::from(ring);

        match (kind, open.as_mut()) {
            (RingKind::Hole, Some((_, holes))) => holes.push(ring),
            (RingKind::Hole, None) => {
                log::debug!("Hole ring with no open polygon, treating it as outer");
                open = Some((ring, Vec::new()));
            }
            (RingKind::Outer, _) => {
                if let Some((exterior, holes)) = open.replace((ring, Vec::new())) {
                    polygons.push(Polygon::new(exterior, holes));
                }
            }
        }
    }

    if let Some((exterior, holes)) = open {
        polygons.push(Polygon::new(exterior, holes));
    }

    polygons
}

/// Bounding box of a coordinate run, `None` when it is empty.
#[must_use]
pub fn bounding_box(coords: &[Coord<f64>]) -> Option<Rect<f64>> {
    LineString::from(coords.to_vec()).bounding_rect()
}

/// Smallest rectangle covering both inputs.
#[must_use]
pub fn union_rect(acc: Option<Rect<f64>>, rect: Rect<f64>) -> Rect<f64> {
    acc.map_or(rect, |acc| {
        Rect::new(
            Coord {
                x: acc.min().x.min(rect.min().x),
                y: acc.min().y.min(rect.min().y),
            },
            Coord {
                x: acc.max().x.max(rect.max().x),
                y: acc.max().y.max(rect.max().y),
            },
        )
    })
}

/// Builds a place's geometry from its decoded coordinates.
///
/// Returns `None` when there are no coordinates (the snapshot's encoding for
/// "no boundary available") or when no polygon yields a label point.
#[must_use]
pub fn build_geometry(
    coords: &[Coord<f64>],
    finder: &dyn InscribedCircle,
) -> Option<PlaceGeometry> {
    let bbox = bounding_box(coords)?;
    let polygons = group_rings(split_rings(coords));

    let mut label: Option<LabelPoint> = None;
    for polygon in &polygons {
        let Some(candidate) = finder.inscribed_circle(polygon) else {
            continue;
        };
        if label.is_none_or(|best| candidate.distance > best.distance) {
            label = Some(candidate);
        }
    }

    Some(PlaceGeometry {
        polygons: MultiPolygon::new(polygons),
        bbox,
        label: label?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<Coord<f64>> {
        ring(&[
            (x, y),
            (x, y + size),
            (x + size, y + size),
            (x + size, y),
            (x, y),
        ])
    }

    struct FixedRadius;

    impl InscribedCircle for FixedRadius {
        fn inscribed_circle(&self, polygon: &Polygon<f64>) -> Option<LabelPoint> {
            let rect = polygon.bounding_rect()?;
            Some(LabelPoint {
                x: rect.center().x,
                y: rect.center().y,
                distance: rect.width() / 2.0,
            })
        }
    }

    #[test]
    fn square_in_this_order_is_clockwise() {
        assert!(is_clockwise(&square(0.0, 0.0, 10.0)));
        assert_eq!(classify(&square(0.0, 0.0, 10.0)), RingKind::Outer);
    }

    #[test]
    fn orientation_survives_rotation() {
        let base = ring(&[(0.0, 0.0), (0.0, 4.0), (3.0, 5.0), (6.0, 1.0)]);
        let expected = is_clockwise(&base);
        for shift in 1..base.len() {
            let mut rotated = base.clone();
            rotated.rotate_left(shift);
            assert_eq!(is_clockwise(&rotated), expected, "rotation by {shift}");
        }
    }

    #[test]
    fn orientation_flips_under_reversal() {
        let base = ring(&[(0.0, 0.0), (0.0, 4.0), (3.0, 5.0), (6.0, 1.0)]);
        let mut reversed = base.clone();
        reversed.reverse();
        assert_ne!(is_clockwise(&base), is_clockwise(&reversed));
        assert_eq!(classify(&reversed), RingKind::Hole);
    }

    #[test]
    fn degenerate_ring_counts_as_outer() {
        assert_eq!(classify(&ring(&[(1.0, 1.0), (1.0, 1.0)])), RingKind::Outer);
    }

    #[test]
    fn splits_on_repeated_first_coordinate() {
        let mut coords = square(0.0, 0.0, 2.0);
        coords.extend(square(5.0, 5.0, 1.0));
        let rings = split_rings(&coords);
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[1][0], Coord { x: 5.0, y: 5.0 });
    }

    #[test]
    fn unclosed_trailing_ring_is_kept() {
        let rings = split_rings(&ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]));
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 3);
        assert!(split_rings(&[]).is_empty());
    }

    #[test]
    fn holes_attach_to_latest_outer_ring() {
        let mut hole = square(2.0, 2.0, 2.0);
        hole.reverse();

        let rings = vec![
            square(0.0, 0.0, 10.0),
            hole.clone(),
            square(20.0, 20.0, 5.0),
            hole,
        ];
        let polygons = group_rings(rings);

        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert_eq!(polygons[1].interiors().len(), 1);
    }

    #[test]
    fn leading_hole_starts_a_polygon() {
        let mut hole = square(0.0, 0.0, 3.0);
        hole.reverse();
        let polygons = group_rings(vec![hole, square(10.0, 10.0, 1.0)]);
        assert_eq!(polygons.len(), 2);
        assert!(polygons[0].interiors().is_empty());
    }

    #[test]
    fn geometry_keeps_largest_label() {
        let mut coords = square(0.0, 0.0, 2.0);
        coords.extend(square(10.0, 10.0, 8.0));

        let geometry = build_geometry(&coords, &FixedRadius).unwrap();
        assert_eq!(geometry.polygons.0.len(), 2);
        assert!((geometry.label.x - 14.0).abs() < f64::EPSILON);
        assert!((geometry.label.distance - 4.0).abs() < f64::EPSILON);
        assert_eq!(geometry.bbox.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(geometry.bbox.max(), Coord { x: 18.0, y: 18.0 });
    }

    #[test]
    fn no_coordinates_means_no_geometry() {
        assert!(build_geometry(&[], &FixedRadius).is_none());
    }

    #[test]
    fn union_grows_both_corners() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let b = Rect::new(Coord { x: -2.0, y: 0.5 }, Coord { x: 0.5, y: 3.0 });
        let merged = union_rect(Some(a), b);
        assert_eq!(merged.min(), Coord { x: -2.0, y: 0.0 });
        assert_eq!(merged.max(), Coord { x: 1.0, y: 3.0 });
        assert_eq!(union_rect(None, b), b);
    }

    #[test]
    fn pairs_components() {
        let coords = coordinates_from_components(&[1, 2, 3, 4, 5]);
        assert_eq!(coords, ring(&[(1.0, 2.0), (3.0, 4.0)]));
    }
}
