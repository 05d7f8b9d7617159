//! A spatial index for finding settlements near one another.
use crate::settlement::Settlement;
use crate::units::Distance;
use std::collections::HashMap;

/// Kilometres per degree of latitude
const KM_PER_DEGREE_LAT: f64 = 110.574;

/// Kilometres per degree of longitude at the equator
const KM_PER_DEGREE_LON: f64 = 111.320;

/// Settlement locations projected onto a plane and bucketed into square cells.
///
/// Coordinates are projected with an equirectangular projection centred on the mean latitude,
/// which is accurate enough over the extent of a single country.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    points: Vec<(f64, f64)>,
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialIndex {
    /// Build an index over settlements, with cells of the given size.
    ///
    /// Queries are most efficient for radii up to `cell_size`.
    pub fn new(settlements: &[Settlement], cell_size: Distance) -> Self {
        let mean_lat = if settlements.is_empty() {
            0.0
        } else {
            settlements.iter().map(|s| s.y).sum::<f64>() / settlements.len() as f64
        };
        let lon_scale = KM_PER_DEGREE_LON * mean_lat.to_radians().cos();
        let points = settlements
            .iter()
            .map(|s| (s.x * lon_scale, s.y * KM_PER_DEGREE_LAT))
            .collect();

        Self::from_points(points, cell_size)
    }

    /// Build an index over points already projected to km
    pub fn from_points(points: Vec<(f64, f64)>, cell_size: Distance) -> Self {
        let cell_size = cell_size.value().max(f64::EPSILON);
        let mut cells: HashMap<_, Vec<_>> = HashMap::new();
        for (idx, &point) in points.iter().enumerate() {
            cells.entry(cell_of(point, cell_size)).or_default().push(idx);
        }

        Self {
            points,
            cell_size,
            cells,
        }
    }

    /// Straight-line distance between two points
    pub fn distance(&self, a: usize, b: usize) -> Distance {
        let (ax, ay) = self.points[a];
        let (bx, by) = self.points[b];
        Distance((ax - bx).hypot(ay - by))
    }

    /// All other points within `radius` of point `idx`, with their distances, in index order
    pub fn within(&self, idx: usize, radius: Distance) -> Vec<(usize, Distance)> {
        let point = self.points[idx];
        let (cx, cy) = cell_of(point, self.cell_size);
        #[allow(clippy::cast_possible_truncation)]
        let reach = (radius.value() / self.cell_size).ceil() as i64;

        let mut found = Vec::new();
        for x in (cx - reach)..=(cx + reach) {
            for y in (cy - reach)..=(cy + reach) {
                let Some(members) = self.cells.get(&(x, y)) else {
                    continue;
                };
                for &other in members {
                    if other == idx {
                        continue;
                    }
                    let distance = self.distance(idx, other);
                    if distance <= radius {
                        found.push((other, distance));
                    }
                }
            }
        }
        found.sort_unstable_by_key(|(other, _)| *other);

        found
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of((x, y): (f64, f64), cell_size: f64) -> (i64, i64) {
    (
        (x / cell_size).floor() as i64,
        (y / cell_size).floor() as i64,
    )
}
