//! Flood mask vectorization
//!
//! Traces the boundary between flooded and dry cells along grid-cell edges
//! and assembles the rings into one dissolved `MultiPolygon`, so there is
//! no per-cell polygon and no union step.
//!
//! Every flooded cell contributes the edges it shares with dry (or
//! off-grid) neighbours, directed so the flooded side is on the right.
//! Walking those edges with a right-turn preference keeps diagonally
//! touching cells apart, i.e. regions are 4-connected. Walks that pass a
//! vertex twice are split into simple rings; counter-clockwise rings in
//! grid space are exteriors, the rest are holes.
//!
//! The flooded cell right of a ring's first edge belongs to the region the
//! ring bounds, so a one-pass region labelling pairs every hole with its
//! exterior without any point-in-polygon search.

use std::collections::{HashMap, VecDeque};

use geo::orient::{Direction, Orient};
use geo::{Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use ndarray::Array2;

use jolchobi_core::raster::Raster;
use jolchobi_core::Result;

use super::FloodRegion;

/// Grid steps `(d_row, d_col)` for E, S, W, N (clockwise on screen)
const STEPS: [(i64, i64); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const EAST: usize = 0;
const SOUTH: usize = 1;
const WEST: usize = 2;
const NORTH: usize = 3;

fn right(dir: usize) -> usize {
    (dir + 1) % 4
}

fn left(dir: usize) -> usize {
    (dir + 3) % 4
}

/// Directed boundary edges keyed by their start corner
struct BoundaryGraph {
    corner_cols: usize,
    /// Bit `d` set when an edge leaves the corner in direction `d`
    outgoing: Vec<u8>,
}

impl BoundaryGraph {
    fn from_mask(mask: &Array2<u8>) -> Self {
        let (rows, cols) = mask.dim();
        let corner_cols = cols + 1;
        let mut outgoing = vec![0u8; (rows + 1) * corner_cols];

        let flooded = |r: i64, c: i64| {
            r >= 0
                && c >= 0
                && (r as usize) < rows
                && (c as usize) < cols
                && mask[[r as usize, c as usize]] == 1
        };
        let mut add = |r: usize, c: usize, dir: usize| {
            outgoing[r * corner_cols + c] |= 1 << dir;
        };

        for ((r, c), &m) in mask.indexed_iter() {
            if m != 1 {
                continue;
            }
            let (ri, ci) = (r as i64, c as i64);
            if !flooded(ri - 1, ci) {
                add(r, c, EAST);
            }
            if !flooded(ri, ci + 1) {
                add(r, c + 1, SOUTH);
            }
            if !flooded(ri + 1, ci) {
                add(r + 1, c + 1, WEST);
            }
            if !flooded(ri, ci - 1) {
                add(r + 1, c, NORTH);
            }
        }

        Self {
            corner_cols,
            outgoing,
        }
    }

    fn corner(&self, id: usize) -> (i64, i64) {
        ((id / self.corner_cols) as i64, (id % self.corner_cols) as i64)
    }

    fn step(&self, id: usize, dir: usize) -> usize {
        let (r, c) = self.corner(id);
        let (dr, dc) = STEPS[dir];
        ((r + dr) as usize) * self.corner_cols + (c + dc) as usize
    }

    /// Outgoing direction taken after arriving at `id` heading `incoming`
    fn turn(&self, id: usize, incoming: usize) -> Option<usize> {
        let out = self.outgoing[id];
        [right(incoming), incoming, left(incoming)]
            .into_iter()
            .find(|&d| out & (1 << d) != 0)
    }

    /// Closed boundary walks as corner-id sequences (closing corner implied)
    fn walks(&self) -> Vec<Vec<usize>> {
        let mut used = vec![0u8; self.outgoing.len()];
        let mut walks = Vec::new();

        for start in 0..self.outgoing.len() {
            for start_dir in 0..4 {
                let bit = 1u8 << start_dir;
                if self.outgoing[start] & bit == 0 || used[start] & bit != 0 {
                    continue;
                }

                let mut walk = Vec::new();
                let (mut id, mut dir) = (start, start_dir);
                loop {
                    used[id] |= 1 << dir;
                    walk.push(id);
                    let next = self.step(id, dir);
                    match self.turn(next, dir) {
                        Some(d) if used[next] & (1 << d) == 0 => {
                            id = next;
                            dir = d;
                        }
                        _ => break,
                    }
                }
                walks.push(walk);
            }
        }
        walks
    }
}

/// Split a closed walk at repeated corners into simple rings
fn split_simple(walk: &[usize]) -> Vec<Vec<usize>> {
    let mut rings = Vec::new();
    let mut stack: Vec<usize> = Vec::with_capacity(walk.len());
    let mut position: HashMap<usize, usize> = HashMap::new();

    for &id in walk.iter().chain(walk.first()) {
        if let Some(&p) = position.get(&id) {
            let ring: Vec<usize> = stack.drain(p..).collect();
            for corner in &ring {
                position.remove(corner);
            }
            rings.push(ring);
        }
        position.insert(id, stack.len());
        stack.push(id);
    }
    rings
}

/// Ring corners in `(col, row)` order with collinear corners dropped
fn turning_points(graph: &BoundaryGraph, ring: &[usize]) -> Vec<(i64, i64)> {
    let pts: Vec<(i64, i64)> = ring
        .iter()
        .map(|&id| {
            let (r, c) = graph.corner(id);
            (c, r)
        })
        .collect();
    let n = pts.len();
    (0..n)
        .filter(|&i| {
            let (px, py) = pts[(i + n - 1) % n];
            let (x, y) = pts[i];
            let (nx, ny) = pts[(i + 1) % n];
            (x - px) * (ny - y) - (y - py) * (nx - x) != 0
        })
        .map(|i| pts[i])
        .collect()
}

/// Twice the signed shoelace area in grid space (row axis pointing down)
fn doubled_area(pts: &[(i64, i64)]) -> i64 {
    let n = pts.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = pts[i];
            let (x1, y1) = pts[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum()
}

/// Unit direction `(dx, dy)` of the ring's first edge
fn first_step(pts: &[(i64, i64)]) -> (i64, i64) {
    let (x0, y0) = pts[0];
    let (x1, y1) = pts[1 % pts.len()];
    ((x1 - x0).signum(), (y1 - y0).signum())
}

/// Centre of the dry cell left of the ring's first edge
fn hole_probe(pts: &[(i64, i64)]) -> Point<f64> {
    let (x0, y0) = pts[0];
    let (dx, dy) = first_step(pts);
    let mx = x0 as f64 + 0.5 * dx as f64;
    let my = y0 as f64 + 0.5 * dy as f64;
    Point::new(mx + 0.5 * dy as f64, my - 0.5 * dx as f64)
}

/// `(row, col)` of the flooded cell right of the ring's first edge
fn bounded_cell(pts: &[(i64, i64)]) -> (usize, usize) {
    let (x0, y0) = pts[0];
    let (dx, dy) = first_step(pts);
    // twice the cell-centre coordinates, so the arithmetic stays integral
    let cx2 = 2 * x0 + dx - dy;
    let cy2 = 2 * y0 + dy + dx;
    ((cy2 / 2) as usize, (cx2 / 2) as usize)
}

/// Label 4-connected flooded regions; dry cells get `None`
fn label_regions(mask: &Array2<u8>) -> Array2<Option<u32>> {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::from_elem((rows, cols), None);
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let mut next = 0u32;

    for ((r, c), &m) in mask.indexed_iter() {
        if m != 1 || labels[[r, c]].is_some() {
            continue;
        }
        labels[[r, c]] = Some(next);
        queue.push_back((r, c));
        while let Some((r, c)) = queue.pop_front() {
            let neighbours = [
                (r.wrapping_sub(1), c),
                (r + 1, c),
                (r, c.wrapping_sub(1)),
                (r, c + 1),
            ];
            for (nr, nc) in neighbours {
                if nr < rows && nc < cols && mask[[nr, nc]] == 1 && labels[[nr, nc]].is_none() {
                    labels[[nr, nc]] = Some(next);
                    queue.push_back((nr, nc));
                }
            }
        }
        next += 1;
    }
    labels
}

fn grid_ring(pts: &[(i64, i64)]) -> LineString<f64> {
    LineString::from(
        pts.iter()
            .map(|&(x, y)| (x as f64, y as f64))
            .collect::<Vec<_>>(),
    )
}

/// Trace `mask` (1 = flooded) into polygons in grid `(col, row)` space
pub(crate) fn grid_polygons(mask: &Array2<u8>) -> Vec<Polygon<f64>> {
    let graph = BoundaryGraph::from_mask(mask);

    let mut exteriors: Vec<(Vec<(i64, i64)>, i64)> = Vec::new();
    let mut holes: Vec<Vec<(i64, i64)>> = Vec::new();
    for walk in graph.walks() {
        for ring in split_simple(&walk) {
            let pts = turning_points(&graph, &ring);
            if pts.len() < 4 {
                continue;
            }
            let area = doubled_area(&pts);
            if area > 0 {
                exteriors.push((pts, area));
            } else {
                holes.push(pts);
            }
        }
    }

    let labels = label_regions(mask);
    let region_of = |pts: &[(i64, i64)]| labels.get(bounded_cell(pts)).copied().flatten();

    let mut by_region: HashMap<u32, Vec<usize>> = HashMap::new();
    for (i, (pts, _)) in exteriors.iter().enumerate() {
        if let Some(label) = region_of(pts.as_slice()) {
            by_region.entry(label).or_default().push(i);
        }
    }

    let shells: Vec<Polygon<f64>> = exteriors
        .iter()
        .map(|(pts, _)| Polygon::new(grid_ring(pts), vec![]))
        .collect();
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];

    for hole in holes {
        let candidates = region_of(hole.as_slice())
            .and_then(|label| by_region.get(&label))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let owner = match candidates {
            [only] => Some(*only),
            _ => {
                // a region with several exteriors never comes out of the
                // tracer; resolve it geometrically all the same
                let probe = hole_probe(&hole);
                candidates
                    .iter()
                    .copied()
                    .filter(|&i| shells[i].contains(&probe))
                    .min_by_key(|&i| exteriors[i].1)
            }
        };
        match owner {
            Some(i) => interiors[i].push(grid_ring(&hole)),
            None => tracing::warn!(probe = ?hole_probe(&hole), "boundary hole has no enclosing ring, dropped"),
        }
    }

    shells
        .into_iter()
        .zip(interiors)
        .map(|(shell, holes)| {
            let (exterior, _) = shell.into_inner();
            Polygon::new(exterior, holes)
        })
        .collect()
}

/// Vectorize the flooded cells of `mask` into one dissolved region in the
/// mask's world coordinates.
///
/// Cells equal to 1 are flooded; regions are 4-connected. An all-zero mask
/// gives an empty region, not an error.
///
/// # Errors
/// [`jolchobi_core::Error::MissingCrs`] / [`jolchobi_core::Error::UnclassifiedCrs`]
/// when the mask's reference system is unusable.
pub fn build_flood_polygons(mask: &Raster<u8>) -> Result<FloodRegion> {
    let crs = mask.require_crs()?.clone();
    let kind = crs.kind()?;
    let transform = *mask.transform();

    let to_world = |ring: &LineString<f64>| -> LineString<f64> {
        ring.coords()
            .map(|c| {
                let (x, y) = transform.corner_to_geo(c.x, c.y);
                Coord { x, y }
            })
            .collect()
    };

    let polygons: Vec<Polygon<f64>> = grid_polygons(mask.data())
        .iter()
        .map(|p| {
            Polygon::new(
                to_world(p.exterior()),
                p.interiors().iter().map(to_world).collect(),
            )
        })
        .collect();

    let geometry = MultiPolygon::new(polygons).orient(Direction::Default);
    tracing::debug!(polygons = geometry.0.len(), "flood region built");

    Ok(FloodRegion {
        geometry,
        crs,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Area;
    use jolchobi_core::{GeoTransform, CRS};
    use ndarray::array;

    fn region(mask: Array2<u8>, transform: GeoTransform) -> FloodRegion {
        let raster = Raster::from_array(mask)
            .with_transform(transform)
            .with_crs(CRS::wgs84());
        build_flood_polygons(&raster).unwrap()
    }

    fn unit(rows: usize) -> GeoTransform {
        GeoTransform::new(0.0, rows as f64, 1.0, -1.0)
    }

    #[test]
    fn test_single_cell() {
        let r = region(array![[0, 0, 0], [0, 1, 0], [0, 0, 0]], unit(3));
        assert_eq!(r.geometry.0.len(), 1);
        let poly = &r.geometry.0[0];
        assert_eq!(poly.exterior().0.len(), 5);
        assert!(poly.interiors().is_empty());
        assert_relative_eq!(poly.unsigned_area(), 1.0);
        assert!(poly.contains(&Point::new(1.5, 1.5)));
    }

    #[test]
    fn test_empty_mask() {
        let r = region(Array2::zeros((3, 3)), unit(3));
        assert!(r.is_empty());
    }

    #[test]
    fn test_block_is_dissolved() {
        let mut mask = Array2::zeros((5, 5));
        mask.slice_mut(ndarray::s![1..4, 1..4]).fill(1);
        let r = region(mask, unit(5));
        assert_eq!(r.geometry.0.len(), 1);
        // collinear corners removed: a plain square
        assert_eq!(r.geometry.0[0].exterior().0.len(), 5);
        assert_relative_eq!(r.geometry.unsigned_area(), 9.0);
    }

    #[test]
    fn test_hole() {
        let r = region(array![[1, 1, 1], [1, 0, 1], [1, 1, 1]], unit(3));
        assert_eq!(r.geometry.0.len(), 1);
        assert_eq!(r.geometry.0[0].interiors().len(), 1);
        assert_relative_eq!(r.geometry.unsigned_area(), 8.0);
        assert!(!r.geometry.contains(&Point::new(1.5, 1.5)));
        assert!(r.geometry.contains(&Point::new(0.5, 0.5)));
    }

    #[test]
    fn test_island_in_hole() {
        let mask = array![
            [1, 1, 1, 1, 1],
            [1, 0, 0, 0, 1],
            [1, 0, 1, 0, 1],
            [1, 0, 0, 0, 1],
            [1, 1, 1, 1, 1],
        ];
        let r = region(mask, unit(5));
        assert_eq!(r.geometry.0.len(), 2);
        let with_hole = r
            .geometry
            .0
            .iter()
            .filter(|p| p.interiors().len() == 1)
            .count();
        assert_eq!(with_hole, 1);
        assert_relative_eq!(r.geometry.unsigned_area(), 17.0);
        assert!(r.geometry.contains(&Point::new(2.5, 2.5)));
        assert!(!r.geometry.contains(&Point::new(1.5, 2.5)));
    }

    #[test]
    fn test_diagonal_cells_stay_apart() {
        let r = region(array![[1, 0], [0, 1]], unit(2));
        assert_eq!(r.geometry.0.len(), 2);
        assert_relative_eq!(r.geometry.unsigned_area(), 2.0);
    }

    #[test]
    fn test_hole_touching_corner() {
        // the enclosed dry cell (1, 1) meets the outside cell (2, 0) at a corner
        let mask = array![[1, 1, 1], [1, 0, 1], [0, 1, 1]];
        let r = region(mask, unit(3));
        assert_relative_eq!(r.geometry.unsigned_area(), 7.0);
        assert!(!r.geometry.contains(&Point::new(1.5, 1.5)));
        assert!(r.geometry.contains(&Point::new(1.5, 0.5)));
        assert!(!r.geometry.contains(&Point::new(0.5, 0.5)));
    }

    #[test]
    fn test_region_labels_are_4_connected() {
        let labels = label_regions(&array![[1, 0, 1], [1, 0, 0], [0, 1, 1]]);
        assert_eq!(labels[[0, 0]], labels[[1, 0]]);
        assert_ne!(labels[[0, 0]], labels[[0, 2]]);
        assert_ne!(labels[[1, 0]], labels[[2, 1]]);
        assert_eq!(labels[[2, 1]], labels[[2, 2]]);
        assert_eq!(labels[[0, 1]], None);
    }

    #[test]
    fn test_bounded_cell_lies_right_of_first_edge() {
        // east along the top of cell (2, 3), then south along its right side
        assert_eq!(bounded_cell(&[(3, 2), (4, 2), (4, 3)]), (2, 3));
        // west along the bottom of cell (2, 3)
        assert_eq!(bounded_cell(&[(4, 3), (3, 3), (3, 2)]), (2, 3));
        // north along the left side of cell (2, 3)
        assert_eq!(bounded_cell(&[(3, 3), (3, 2), (4, 2)]), (2, 3));
    }

    #[test]
    fn test_holes_stay_with_their_own_region() {
        let mask = array![
            [1, 1, 1, 0, 1, 1, 1],
            [1, 0, 1, 0, 1, 0, 1],
            [1, 1, 1, 0, 1, 1, 1],
        ];
        let polygons = grid_polygons(&mask);
        assert_eq!(polygons.len(), 2);
        for p in &polygons {
            assert_eq!(p.interiors().len(), 1);
            let shell = Polygon::new(p.exterior().clone(), vec![]);
            assert!(shell.contains(&p.interiors()[0]));
        }
    }

    #[test]
    fn test_sieve_keeps_every_hole() {
        // dry cells at every (odd, odd) position of a flooded 41x41 block
        let n = 41;
        let mask = Array2::from_shape_fn((n, n), |(r, c)| u8::from(r % 2 == 0 || c % 2 == 0));
        let polygons = grid_polygons(&mask);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].interiors().len(), 400);
        assert_relative_eq!(polygons[0].unsigned_area(), (n * n - 400) as f64);
    }

    #[test]
    fn test_world_coordinates_follow_transform() {
        let gt = GeoTransform::new(500_000.0, 2_800_000.0, 100.0, -100.0);
        let r = region(array![[1, 1]], gt);
        assert_relative_eq!(r.geometry.unsigned_area(), 20_000.0, epsilon = 1e-6);
        assert!(r.geometry.contains(&Point::new(500_150.0, 2_799_950.0)));
    }

    #[test]
    fn test_missing_crs() {
        let raster = Raster::from_array(array![[1u8]]);
        assert!(build_flood_polygons(&raster).is_err());
    }
}
