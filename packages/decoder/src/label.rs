//! Label point selection for decoded polygons.
//!
//! The decoder only needs "a point deep inside this polygon and how deep it
//! is". That question is answered through [`InscribedCircle`] so callers can
//! plug in their own implementation; [`PoleOfInaccessibility`] is the
//! default.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use covid_map_dataset_models::LabelPoint;
use geo::{BoundingRect, Centroid, Contains, Coord, Distance, Euclidean, Point, Polygon};

/// Finds the centre and radius of the largest circle inscribed in a polygon.
pub trait InscribedCircle: Send + Sync {
    /// Returns `None` for polygons without area to search (empty exterior).
    fn inscribed_circle(&self, polygon: &Polygon<f64>) -> Option<LabelPoint>;
}

/// Quadtree search for the polygon point farthest from any boundary,
/// holes included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoleOfInaccessibility {
    /// Search stops refining a cell once it cannot beat the best distance
    /// by more than this.
    pub precision: f64,
}

impl Default for PoleOfInaccessibility {
    fn default() -> Self {
        Self { precision: 1.0 }
    }
}

impl InscribedCircle for PoleOfInaccessibility {
    fn inscribed_circle(&self, polygon: &Polygon<f64>) -> Option<LabelPoint> {
        let rect = polygon.bounding_rect()?;
        let min = rect.min();
        let cell_size = rect.width().min(rect.height());

        if cell_size <= 0.0 {
            return Some(LabelPoint {
                x: min.x,
                y: min.y,
                distance: 0.0,
            });
        }

        let precision = self.precision.max(f64::EPSILON);
        let half = cell_size / 2.0;
        let mut queue = BinaryHeap::new();

        let mut x = min.x;
        while x < rect.max().x {
            let mut y = min.y;
            while y < rect.max().y {
                queue.push(Cell::new(Coord { x: x + half, y: y + half }, half, polygon));
                y += cell_size;
            }
            x += cell_size;
        }

        let centroid = polygon
            .centroid()
            .map_or_else(|| rect.center(), Point::into);
        let mut best = Cell::new(centroid, 0.0, polygon);

        let center = Cell::new(rect.center(), 0.0, polygon);
        if center.distance > best.distance {
            best = center;
        }

        while let Some(cell) = queue.pop() {
            if cell.distance > best.distance {
                best = cell;
            }

            if cell.potential - best.distance <= precision {
                continue;
            }

            let h = cell.half / 2.0;
            for (dx, dy) in [(-h, -h), (h, -h), (-h, h), (h, h)] {
                let child = Coord {
                    x: cell.center.x + dx,
                    y: cell.center.y + dy,
                };
                queue.push(Cell::new(child, h, polygon));
            }
        }

        Some(LabelPoint {
            x: best.center.x,
            y: best.center.y,
            distance: best.distance.max(0.0),
        })
    }
}

/// Square search cell, ordered by the best distance any point inside it
/// could reach.
#[derive(Clone, Copy)]
struct Cell {
    center: Coord<f64>,
    half: f64,
    /// Signed distance from the centre to the boundary (negative outside).
    distance: f64,
    potential: f64,
}

impl Cell {
    fn new(center: Coord<f64>, half: f64, polygon: &Polygon<f64>) -> Self {
        let distance = signed_distance(center, polygon);
        Self {
            center,
            half,
            distance,
            potential: half.mul_add(std::f64::consts::SQRT_2, distance),
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.potential.total_cmp(&other.potential) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.potential.total_cmp(&other.potential)
    }
}

/// Distance from `point` to the nearest ring, negative outside the polygon.
fn signed_distance(point: Coord<f64>, polygon: &Polygon<f64>) -> f64 {
    let point = Point::from(point);
    let nearest = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| Euclidean.distance(&point, ring))
        .fold(f64::INFINITY, f64::min);

    if polygon.contains(&point) {
        nearest
    } else {
        -nearest
    }
}
