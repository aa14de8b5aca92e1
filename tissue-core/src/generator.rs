//! Starting tissues.

use crate::{
    error::{TissueError, TissueResult},
    mesh::Mesh,
    types::NodeId,
};
use glam::DVec2;
use std::collections::HashMap;

/// A grid of `nx × ny` square cells of side `size`, lower-left corner at
/// the origin.
///
/// Cell ids run row by row from the bottom: cell `(i, j)` has id
/// `j * nx + i`. Each cell's boundary starts at its lower-left node.
pub fn square_grid(nx: usize, ny: usize, size: f64, wall_stiffness: f64) -> TissueResult<Mesh> {
    let node = |i: usize, j: usize| j * (nx + 1) + i;
    let positions: Vec<DVec2> = (0..=ny)
        .flat_map(|j| (0..=nx).map(move |i| DVec2::new(i as f64, j as f64) * size))
        .collect();
    let polygons: Vec<Vec<NodeId>> = (0..ny)
        .flat_map(|j| {
            (0..nx).map(move |i| {
                vec![
                    node(i, j),
                    node(i + 1, j),
                    node(i + 1, j + 1),
                    node(i, j + 1),
                ]
            })
        })
        .collect();
    Mesh::from_polygons(&positions, &polygons, wall_stiffness)
}

/// Hexagonal cells within `rings` steps of a central one.
///
/// Hexagons are pointy-top with circumradius `radius`. The central cell
/// has id 0 and sits at the origin; the remaining cells follow ring by
/// ring. `rings = 1` gives seven cells.
pub fn hex_cluster(rings: u32, radius: f64, wall_stiffness: f64) -> TissueResult<Mesh> {
    // Corner keys reach 3 * rings + 2.
    let n = i32::try_from(rings)
        .ok()
        .filter(|&n| n <= (i32::MAX - 2) / 3)
        .ok_or_else(|| {
            TissueError::InvalidPolygon(format!(
                "{rings} hexagon rings do not fit the corner lattice"
            ))
        })?;
    let mut hexes: Vec<(i32, i32)> = (-n..=n)
        .flat_map(|q| (-n..=n).map(move |r| (q, r)))
        .filter(|&(q, r)| (q + r).abs() <= n)
        .collect();
    hexes.sort_by_key(|&(q, r)| (q.abs().max(r.abs()).max((q + r).abs()), r, q));

    // Corners on an integer lattice: x in steps of sqrt(3)/2 * radius,
    // y in steps of radius / 2. Shared corners get identical keys.
    const CORNERS: [(i32, i32); 6] = [(1, 1), (0, 2), (-1, 1), (-1, -1), (0, -2), (1, -1)];
    let x_step = 3f64.sqrt() / 2.0 * radius;
    let y_step = radius / 2.0;

    let mut index: HashMap<(i32, i32), NodeId> = HashMap::new();
    let mut positions = Vec::new();
    let mut polygons = Vec::with_capacity(hexes.len());
    for (q, r) in hexes {
        let (cx, cy) = (2 * q + r, 3 * r);
        let ring: Vec<NodeId> = CORNERS
            .iter()
            .map(|&(dx, dy)| {
                let key = (cx + dx, cy + dy);
                *index.entry(key).or_insert_with(|| {
                    positions.push(DVec2::new(key.0 as f64 * x_step, key.1 as f64 * y_step));
                    positions.len() - 1
                })
            })
            .collect();
        polygons.push(ring);
    }
    Mesh::from_polygons(&positions, &polygons, wall_stiffness)
}
