//! The registry that owns every node, wall and cell.
//!
//! Entities live in dense `Vec<Option<_>>` slots indexed by their id.
//! A retired entity leaves a `None` behind so its id is never handed out
//! again. Cells and walls refer to each other and to nodes only through
//! ids resolved here.

use crate::{
    cell::{BOUNDARY_MARKER_ID, BoundaryEntry, Cell, CellKind},
    error::{TissueError, TissueResult},
    geometry::{AxisInfo, Polygon},
    node::Node,
    types::{CellId, NodeId, WallId},
    wall::Wall,
};
use glam::DVec2;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

fn corrupt(msg: String) -> TissueError {
    TissueError::InvalidTopology(msg)
}

fn grow_slots<T: Clone>(slots: &mut Vec<Option<T>>, len: usize, kind: &str) -> TissueResult<()> {
    if slots.len() >= len {
        return Ok(());
    }
    slots
        .try_reserve_exact(len - slots.len())
        .map_err(|e| corrupt(format!("cannot hold {len} {kind} slots: {e}")))?;
    slots.resize(len, None);
    Ok(())
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    nodes: Vec<Option<Node>>,
    walls: Vec<Option<Wall>>,
    cells: Vec<Option<Cell>>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mesh from node positions and one node loop per cell.
    ///
    /// Shared edges become a single wall referencing both cells.
    /// Clockwise loops are reversed so that every cell ends up
    /// counter-clockwise. Cell ids follow the order of `polygons`.
    ///
    /// ### Errors
    /// [`TissueError::InvalidPolygon`] when a loop has fewer than three
    /// nodes, repeats a node, names an unknown node, has no area, crosses
    /// itself, or shares an edge in a way that cannot be a planar tissue
    /// (same direction twice, or more than two cells on one edge).
    pub fn from_polygons(
        positions: &[DVec2],
        polygons: &[Vec<NodeId>],
        wall_stiffness: f64,
    ) -> TissueResult<Self> {
        let mut mesh = Self::new();
        for &p in positions {
            mesh.alloc_node(p);
        }

        let mut edges: HashMap<(NodeId, NodeId), WallId> = HashMap::new();
        for (index, ring) in polygons.iter().enumerate() {
            if ring.len() < 3 {
                return Err(TissueError::InvalidPolygon(format!(
                    "polygon {index} has {} nodes",
                    ring.len()
                )));
            }
            let mut distinct = HashSet::with_capacity(ring.len());
            for &n in ring {
                if n >= positions.len() {
                    return Err(TissueError::InvalidPolygon(format!(
                        "polygon {index} references unknown node {n}"
                    )));
                }
                if !distinct.insert(n) {
                    return Err(TissueError::InvalidPolygon(format!(
                        "polygon {index} repeats node {n}"
                    )));
                }
            }

            let poly = Polygon::new(ring.iter().map(|&n| positions[n]).collect());
            let area = poly.signed_area();
            if !(area.abs() > f64::EPSILON) {
                return Err(TissueError::InvalidPolygon(format!(
                    "polygon {index} has no area"
                )));
            }
            if poly.self_intersects() {
                return Err(TissueError::InvalidPolygon(format!(
                    "polygon {index} crosses itself"
                )));
            }

            let mut ring = ring.clone();
            if area < 0.0 {
                ring.reverse();
            }

            let cell_id = mesh.cells.len();
            let n = ring.len();
            let mut cycle = Vec::with_capacity(n);
            for k in 0..n {
                let (a, b) = (ring[k], ring[(k + 1) % n]);
                let key = (a.min(b), a.max(b));
                let wall_id = match edges.get(&key) {
                    None => {
                        let len = positions[a].distance(positions[b]);
                        let w = mesh.alloc_wall(a, b, wall_stiffness, len);
                        mesh.wall_mut(w)?.c1 = Some(cell_id);
                        edges.insert(key, w);
                        w
                    }
                    Some(&w) => {
                        let wall = mesh.wall_mut(w)?;
                        if wall.n1 == b && wall.n2 == a && wall.c2.is_none() {
                            wall.c2 = Some(cell_id);
                            w
                        } else {
                            return Err(TissueError::InvalidPolygon(format!(
                                "edge {a}-{b} of polygon {index} cannot be shared"
                            )));
                        }
                    }
                };
                cycle.push(BoundaryEntry {
                    node: a,
                    wall: wall_id,
                });
            }
            mesh.alloc_cell(cycle, area.abs());
        }

        mesh.refresh_boundary_flags();
        mesh.validate()?;
        debug!(
            nodes = mesh.n_nodes(),
            walls = mesh.n_walls(),
            cells = mesh.n_cells(),
            "mesh built from polygons"
        );
        Ok(mesh)
    }

    // ---- allocation -------------------------------------------------

    pub(crate) fn alloc_node(&mut self, pos: DVec2) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(Node::new(id, pos)));
        id
    }

    pub(crate) fn alloc_wall(
        &mut self,
        n1: NodeId,
        n2: NodeId,
        stiffness: f64,
        natural_length: f64,
    ) -> WallId {
        let id = self.walls.len();
        self.walls
            .push(Some(Wall::new(id, n1, n2, stiffness, natural_length)));
        id
    }

    pub(crate) fn alloc_cell(&mut self, cycle: Vec<BoundaryEntry>, area: f64) -> CellId {
        let id = self.cells.len();
        self.cells.push(Some(Cell::new(id, cycle, area)));
        id
    }

    /// Puts an entity back at a fixed id; used when restoring snapshots.
    pub(crate) fn restore_node(&mut self, node: Node) {
        let id = node.id;
        if self.nodes.len() <= id {
            self.nodes.resize(id + 1, None);
        }
        self.nodes[id] = Some(node);
    }

    pub(crate) fn restore_wall(&mut self, wall: Wall) {
        let id = wall.id;
        if self.walls.len() <= id {
            self.walls.resize(id + 1, None);
        }
        self.walls[id] = Some(wall);
    }

    pub(crate) fn restore_cell(&mut self, cell: Cell) {
        let id = cell.id;
        if self.cells.len() <= id {
            self.cells.resize(id + 1, None);
        }
        self.cells[id] = Some(cell);
    }

    /// Lengths of the node, wall and cell slot vectors, retired slots included.
    pub(crate) fn slot_counts(&self) -> (usize, usize, usize) {
        (self.nodes.len(), self.walls.len(), self.cells.len())
    }

    /// Grows the slot vectors so the next allocated ids are at least the
    /// given counts.
    ///
    /// ### Errors
    /// [`TissueError::InvalidTopology`] when the slots cannot be allocated.
    pub(crate) fn reserve_slots(
        &mut self,
        nodes: usize,
        walls: usize,
        cells: usize,
    ) -> TissueResult<()> {
        grow_slots(&mut self.nodes, nodes, "node")?;
        grow_slots(&mut self.walls, walls, "wall")?;
        grow_slots(&mut self.cells, cells, "cell")
    }

    // ---- lookup -----------------------------------------------------

    pub fn node(&self, id: NodeId) -> TissueResult<&Node> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(TissueError::UnknownNode(id))
    }

    pub fn wall(&self, id: WallId) -> TissueResult<&Wall> {
        self.walls
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(TissueError::UnknownWall(id))
    }

    pub fn cell(&self, id: CellId) -> TissueResult<&Cell> {
        self.cells
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(TissueError::UnknownCell(id))
    }

    /// Mutable access to a cell's scalar state. The boundary stays
    /// read-only outside the mesh.
    pub fn cell_mut(&mut self, id: CellId) -> TissueResult<&mut Cell> {
        self.cells
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(TissueError::UnknownCell(id))
    }

    pub(crate) fn wall_mut(&mut self, id: WallId) -> TissueResult<&mut Wall> {
        self.walls
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(TissueError::UnknownWall(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> TissueResult<&mut Node> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(TissueError::UnknownNode(id))
    }

    /// Mutable access to two distinct cells at once.
    pub(crate) fn two_cells_mut(
        &mut self,
        a: CellId,
        b: CellId,
    ) -> TissueResult<(&mut Cell, &mut Cell)> {
        if a == b {
            return Err(corrupt(format!("cell {a} requested twice")));
        }
        let len = self.cells.len();
        if a >= len {
            return Err(TissueError::UnknownCell(a));
        }
        if b >= len {
            return Err(TissueError::UnknownCell(b));
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.cells.split_at_mut(hi);
        let lo_cell = head[lo].as_mut().ok_or(TissueError::UnknownCell(lo))?;
        let hi_cell = tail[0].as_mut().ok_or(TissueError::UnknownCell(hi))?;
        if a < b {
            Ok((lo_cell, hi_cell))
        } else {
            Ok((hi_cell, lo_cell))
        }
    }

    pub(crate) fn node_slots_mut(&mut self) -> &mut [Option<Node>] {
        &mut self.nodes
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().flatten()
    }

    pub fn walls(&self) -> impl Iterator<Item = &Wall> + '_ {
        self.walls.iter().flatten()
    }

    /// Live cells in id order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter().flatten()
    }

    /// Ids of the live cells, in increasing order.
    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells().map(|c| c.id).collect()
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes().count()
    }

    pub fn n_walls(&self) -> usize {
        self.walls().count()
    }

    pub fn n_cells(&self) -> usize {
        self.cells().count()
    }

    pub fn set_node_position(&mut self, id: NodeId, pos: DVec2) -> TissueResult<()> {
        self.node_mut(id)?.pos = pos;
        Ok(())
    }

    pub fn set_node_fixed(&mut self, id: NodeId, fixed: bool) -> TissueResult<()> {
        self.node_mut(id)?.fixed = fixed;
        Ok(())
    }

    // ---- cell geometry ------------------------------------------------

    fn polygon_of(&self, cell: &Cell) -> TissueResult<Polygon> {
        let points = cell
            .nodes()
            .map(|n| self.node(n).map(|node| node.pos))
            .collect::<TissueResult<Vec<_>>>()?;
        Ok(Polygon::new(points))
    }

    pub fn cell_polygon(&self, id: CellId) -> TissueResult<Polygon> {
        self.polygon_of(self.cell(id)?)
    }

    /// Current area of a cell from its node positions.
    ///
    /// ### Errors
    /// A non-positive area means the boundary lost its orientation,
    /// reported as [`TissueError::InvalidTopology`].
    pub fn cell_area(&self, id: CellId) -> TissueResult<f64> {
        let area = self.cell_polygon(id)?.signed_area();
        if area > 0.0 {
            Ok(area)
        } else {
            Err(corrupt(format!("cell {id} has non-positive area {area}")))
        }
    }

    pub fn cell_centroid(&self, id: CellId) -> TissueResult<DVec2> {
        Ok(self.cell_polygon(id)?.centroid())
    }

    pub fn cell_length(&self, id: CellId) -> TissueResult<AxisInfo> {
        Ok(self.cell_polygon(id)?.length())
    }

    pub fn self_intersects(&self, id: CellId) -> TissueResult<bool> {
        Ok(self.cell_polygon(id)?.self_intersects())
    }

    /// Whether the infinite line through `p1, p2` passes through the cell.
    pub fn intersects_with_line(&self, id: CellId, p1: DVec2, p2: DVec2) -> TissueResult<bool> {
        Ok(self.cell_polygon(id)?.intersects_line(p1, p2))
    }

    /// Whether the segment `p1 -> p2` touches the cell's outline.
    pub fn line_piece_intersects(&self, id: CellId, p1: DVec2, p2: DVec2) -> TissueResult<bool> {
        Ok(self.cell_polygon(id)?.line_piece_intersects(p1, p2))
    }

    /// Whether moving `node` to `new_pos` would make any cell around it
    /// cross itself.
    pub fn move_self_intersects(&self, node: NodeId, new_pos: DVec2) -> TissueResult<bool> {
        self.node(node)?;
        for cell in self.cells().filter(|c| c.nodes().any(|n| n == node)) {
            let mut poly = self.polygon_of(cell)?;
            for (p, n) in poly.points.iter_mut().zip(cell.nodes()) {
                if n == node {
                    *p = new_pos;
                }
            }
            if poly.self_intersects() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Recomputes the stored area of every live cell.
    pub fn refresh_areas(&mut self) -> TissueResult<()> {
        for id in self.cell_ids() {
            let area = self.cell_area(id)?;
            self.cell_mut(id)?.area = area;
        }
        Ok(())
    }

    pub fn mean_area(&self) -> f64 {
        let n = self.n_cells();
        if n == 0 {
            0.0
        } else {
            self.cells().map(|c| c.area).sum::<f64>() / n as f64
        }
    }

    pub fn total_area(&self) -> f64 {
        self.cells().map(|c| c.area).sum()
    }

    pub fn total_target_area(&self) -> f64 {
        self.cells().map(|c| c.target_area).sum()
    }

    // ---- adjacency ----------------------------------------------------

    /// Neighboring cells in boundary order.
    ///
    /// A neighbor shared through several consecutive walls is listed
    /// once. A neighbor reached again after some other neighbor (or a
    /// stretch of tissue edge) is listed again.
    pub fn neighbor_indices(&self, id: CellId) -> TissueResult<Vec<CellId>> {
        let cell = self.cell(id)?;
        let mut runs: Vec<Option<CellId>> = Vec::with_capacity(cell.n_nodes());
        for wall in cell.walls() {
            let side = self.wall(wall)?.other_cell(id);
            if runs.last() != Some(&side) {
                runs.push(side);
            }
        }
        if runs.len() > 1 && runs.first() == runs.last() {
            runs.pop();
        }
        Ok(runs.into_iter().flatten().collect())
    }

    /// A cell is at the boundary when one of its walls has no cell beyond it.
    pub fn at_boundary(&self, id: CellId) -> TissueResult<bool> {
        for wall in self.cell(id)?.walls() {
            if self.wall(wall)?.is_boundary() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn cells_of_node(&self, node: NodeId) -> Vec<CellId> {
        self.cells()
            .filter(|c| c.nodes().any(|n| n == node))
            .map(|c| c.id)
            .collect()
    }

    /// Re-derives every node's boundary flag from the walls.
    pub(crate) fn refresh_boundary_flags(&mut self) {
        let on_edge = self.boundary_node_mask();
        for node in self.nodes.iter_mut().flatten() {
            node.boundary = on_edge[node.id];
        }
    }

    fn boundary_node_mask(&self) -> Vec<bool> {
        let mut on_edge = vec![false; self.nodes.len()];
        for w in self.walls().filter(|w| w.is_boundary()) {
            for n in [w.n1, w.n2] {
                if let Some(flag) = on_edge.get_mut(n) {
                    *flag = true;
                }
            }
        }
        on_edge
    }

    // ---- tissue outline -------------------------------------------------

    /// Closed loops of tissue-edge walls, each in counter-clockwise order
    /// around the tissue (holes come out clockwise).
    pub fn boundary_loops(&self) -> TissueResult<Vec<Vec<BoundaryEntry>>> {
        let mut outgoing: HashMap<NodeId, Vec<(NodeId, WallId)>> = HashMap::new();
        let mut order = Vec::new();
        for w in self.walls().filter(|w| w.cell_count() == 1) {
            let owner = w.c1.or(w.c2);
            let (from, to) = owner
                .and_then(|c| w.oriented_for(c))
                .ok_or_else(|| corrupt(format!("wall {} lost its cell", w.id)))?;
            outgoing.entry(from).or_default().push((to, w.id));
            order.push((from, to, w.id));
        }

        let mut used: HashSet<WallId> = HashSet::new();
        let mut loops = Vec::new();
        for &(start, first_to, first_wall) in &order {
            if used.contains(&first_wall) {
                continue;
            }
            let mut entries = Vec::new();
            let (mut from, mut to, mut wall) = (start, first_to, first_wall);
            loop {
                used.insert(wall);
                entries.push(BoundaryEntry { node: from, wall });
                if to == start {
                    break;
                }
                let next = outgoing
                    .get(&to)
                    .and_then(|out| out.iter().find(|(_, w)| !used.contains(w)))
                    .copied()
                    .ok_or_else(|| corrupt(format!("tissue edge is open at node {to}")))?;
                from = to;
                (to, wall) = next;
            }
            loops.push(entries);
        }
        Ok(loops)
    }

    /// Outline of the tissue as a boundary-marker cell.
    ///
    /// Picks the loop enclosing the largest area. `None` when the mesh
    /// has no cells.
    pub fn boundary_polygon(&self) -> TissueResult<Option<Cell>> {
        let mut best: Option<(f64, Vec<BoundaryEntry>)> = None;
        for entries in self.boundary_loops()? {
            let points = entries
                .iter()
                .map(|e| self.node(e.node).map(|n| n.pos))
                .collect::<TissueResult<Vec<_>>>()?;
            let area = Polygon::new(points).signed_area();
            if best.as_ref().is_none_or(|(a, _)| area > *a) {
                best = Some((area, entries));
            }
        }
        Ok(best.map(|(area, cycle)| {
            let mut marker = Cell::new(BOUNDARY_MARKER_ID, cycle, area);
            marker.kind = CellKind::BoundaryMarker;
            marker
        }))
    }

    // ---- apoptosis --------------------------------------------------------

    /// Removes a cell from the tissue.
    ///
    /// Every wall the cell bounded loses its reference to it. Walls still
    /// bounding a neighbor become tissue edge for that neighbor; walls
    /// left with no cell at all are retired, as are nodes no live wall
    /// touches any more. The neighbors' boundaries are not changed.
    ///
    /// Returns the neighbors the cell had.
    pub fn apoptose(&mut self, id: CellId) -> TissueResult<Vec<CellId>> {
        let neighbors = self.neighbor_indices(id)?;
        let cell = self
            .cells
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(TissueError::UnknownCell(id))?;

        let mut retired_walls = 0;
        for entry in cell.boundary() {
            let wall = self.wall_mut(entry.wall)?;
            if !wall.replace_cell(id, None) {
                return Err(corrupt(format!(
                    "wall {} did not reference dying cell {id}",
                    entry.wall
                )));
            }
            if wall.cell_count() == 0 {
                self.walls[entry.wall] = None;
                retired_walls += 1;
            }
        }

        let mut retired_nodes = 0;
        for node in cell.nodes() {
            let still_used = self.walls().any(|w| w.has_node(node));
            if !still_used {
                self.nodes[node] = None;
                retired_nodes += 1;
            }
        }

        self.refresh_boundary_flags();
        let mut unique = neighbors.clone();
        unique.sort_unstable();
        unique.dedup();
        self.validate_cells(&unique)?;

        info!(
            cell = id,
            neighbors = unique.len(),
            retired_walls,
            retired_nodes,
            "cell apoptosed"
        );
        Ok(neighbors)
    }

    // ---- invariants -------------------------------------------------------

    /// Checks every invariant over the whole mesh.
    ///
    /// ### Errors
    /// [`TissueError::InvalidTopology`] describing the first violation.
    pub fn validate(&self) -> TissueResult<()> {
        for cell in self.cells() {
            self.check_cell(cell)?;
        }
        for wall in self.walls() {
            if wall.cell_count() == 0 {
                return Err(corrupt(format!("wall {} bounds no cell", wall.id)));
            }
            self.check_wall(wall)?;
        }
        let on_edge = self.boundary_node_mask();
        for node in self.nodes() {
            self.check_node_flag(node, &on_edge)?;
        }
        Ok(())
    }

    /// Checks the invariants touching the given cells: their boundaries,
    /// every wall on them, and the boundary flag of every node on them.
    pub fn validate_cells(&self, ids: &[CellId]) -> TissueResult<()> {
        let on_edge = self.boundary_node_mask();
        for &id in ids {
            let cell = self
                .cell(id)
                .map_err(|_| corrupt(format!("cell {id} is not live")))?;
            self.check_cell(cell)?;
            for entry in cell.boundary() {
                self.check_wall(self.wall(entry.wall)?)?;
                self.check_node_flag(self.node(entry.node)?, &on_edge)?;
            }
        }
        Ok(())
    }

    fn check_cell(&self, cell: &Cell) -> TissueResult<()> {
        let id = cell.id;
        let n = cell.n_nodes();
        if n < 3 {
            return Err(corrupt(format!("cell {id} has only {n} nodes")));
        }
        let mut seen = HashSet::with_capacity(n);
        for k in 0..n {
            let entry = cell.cycle[k];
            let next = cell.cycle[(k + 1) % n].node;
            if !seen.insert(entry.wall) {
                return Err(corrupt(format!(
                    "cell {id} lists wall {} twice",
                    entry.wall
                )));
            }
            self.node(entry.node)
                .map_err(|_| corrupt(format!("cell {id} references dead node {}", entry.node)))?;
            let wall = self
                .wall(entry.wall)
                .map_err(|_| corrupt(format!("cell {id} references dead wall {}", entry.wall)))?;
            if wall.oriented_for(id) != Some((entry.node, next)) {
                return Err(corrupt(format!(
                    "cell {id}: wall {} does not run {} -> {next} on this cell's side",
                    entry.wall, entry.node
                )));
            }
        }

        let poly = self.polygon_of(cell)?;
        let area = poly.signed_area();
        if !(area > 0.0) {
            return Err(corrupt(format!("cell {id} has non-positive area {area}")));
        }
        if cfg!(debug_assertions) && poly.self_intersects() {
            return Err(corrupt(format!("cell {id} self-intersects after commit")));
        }
        Ok(())
    }

    fn check_wall(&self, wall: &Wall) -> TissueResult<()> {
        if wall.c1.is_some() && wall.c1 == wall.c2 {
            return Err(corrupt(format!(
                "wall {} has the same cell on both sides",
                wall.id
            )));
        }
        for n in [wall.n1, wall.n2] {
            self.node(n)
                .map_err(|_| corrupt(format!("wall {} references dead node {n}", wall.id)))?;
        }
        for c in [wall.c1, wall.c2].into_iter().flatten() {
            let cell = self
                .cell(c)
                .map_err(|_| corrupt(format!("wall {} references dead cell {c}", wall.id)))?;
            let count = cell.walls().filter(|&w| w == wall.id).count();
            if count != 1 {
                return Err(corrupt(format!(
                    "wall {} appears {count} times in cell {c}",
                    wall.id
                )));
            }
        }
        Ok(())
    }

    fn check_node_flag(&self, node: &Node, on_edge: &[bool]) -> TissueResult<()> {
        let expected = on_edge.get(node.id).copied().unwrap_or(false);
        if node.boundary != expected {
            return Err(corrupt(format!(
                "node {} boundary flag is {}, walls say {expected}",
                node.id, node.boundary
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two unit squares side by side: cell 0 on the left, cell 1 on the right.
    fn two_squares() -> Mesh {
        let positions = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(2.0, 1.0),
        ];
        let polygons = vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]];
        Mesh::from_polygons(&positions, &polygons, 1.0).unwrap()
    }

    #[test]
    fn shared_edge_becomes_one_wall() {
        let mesh = two_squares();
        assert_eq!(mesh.n_cells(), 2);
        assert_eq!(mesh.n_nodes(), 6);
        assert_eq!(mesh.n_walls(), 7);

        let shared: Vec<_> = mesh.walls().filter(|w| w.cell_count() == 2).collect();
        assert_eq!(shared.len(), 1);
        assert!(shared[0].touches(0) && shared[0].touches(1));
    }

    #[test]
    fn clockwise_input_is_reoriented() {
        let positions = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 0.0),
        ];
        let mesh = Mesh::from_polygons(&positions, &[vec![0, 1, 2, 3]], 1.0).unwrap();
        assert_relative_eq!(mesh.cell_area(0).unwrap(), 1.0);
    }

    #[test]
    fn malformed_polygons_are_rejected() {
        let positions = vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0), DVec2::new(2.0, 0.0)];
        assert!(matches!(
            Mesh::from_polygons(&positions, &[vec![0, 1]], 1.0),
            Err(TissueError::InvalidPolygon(_))
        ));
        assert!(matches!(
            Mesh::from_polygons(&positions, &[vec![0, 1, 2]], 1.0),
            Err(TissueError::InvalidPolygon(_))
        ));
        assert!(matches!(
            Mesh::from_polygons(&positions, &[vec![0, 1, 7]], 1.0),
            Err(TissueError::InvalidPolygon(_))
        ));
    }

    #[test]
    fn overlapping_cells_cannot_share_an_edge_one_way() {
        let positions = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.5, 2.0),
        ];
        // Both triangles walk 0 -> 1 counter-clockwise.
        let result = Mesh::from_polygons(&positions, &[vec![0, 1, 2], vec![0, 1, 3]], 1.0);
        assert!(matches!(result, Err(TissueError::InvalidPolygon(_))));
    }

    #[test]
    fn boundary_flags_follow_walls() {
        let positions = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(2.0, 2.0),
            DVec2::new(0.0, 2.0),
            DVec2::new(1.0, 1.0),
        ];
        // Four triangles around a centre node.
        let polygons = vec![
            vec![0, 1, 4],
            vec![1, 2, 4],
            vec![2, 3, 4],
            vec![3, 0, 4],
        ];
        let mesh = Mesh::from_polygons(&positions, &polygons, 1.0).unwrap();
        assert!(!mesh.node(4).unwrap().boundary);
        for n in 0..4 {
            assert!(mesh.node(n).unwrap().boundary);
        }
        assert!(mesh.at_boundary(0).unwrap());
    }

    #[test]
    fn neighbor_indices_are_stable() {
        let mesh = two_squares();
        let first = mesh.neighbor_indices(0).unwrap();
        let second = mesh.neighbor_indices(0).unwrap();
        assert_eq!(first, vec![1]);
        assert_eq!(first, second);
    }

    #[test]
    fn apoptosis_turns_shared_walls_into_edge() {
        let mut mesh = two_squares();
        let walls_before = mesh.cell(0).unwrap().n_nodes();

        let neighbors = mesh.apoptose(1).unwrap();
        assert_eq!(neighbors, vec![0]);
        assert!(mesh.cell(1).is_err());
        assert_eq!(mesh.n_cells(), 1);

        // The survivor keeps its boundary and now sits alone.
        let survivor = mesh.cell(0).unwrap();
        assert_eq!(survivor.n_nodes(), walls_before);
        for w in survivor.walls() {
            let wall = mesh.wall(w).unwrap();
            assert_eq!(wall.cell_count(), 1);
            assert_eq!(wall.other_cell(0), None);
        }
        // Three outer walls of the dead cell had nobody left.
        assert_eq!(mesh.n_walls(), 4);
        assert_eq!(mesh.n_nodes(), 4);
        mesh.validate().unwrap();
        assert!(mesh.node(1).unwrap().boundary);
    }

    #[test]
    fn apoptosis_of_unknown_cell_fails() {
        let mut mesh = two_squares();
        assert!(matches!(mesh.apoptose(9), Err(TissueError::UnknownCell(9))));
    }

    #[test]
    fn boundary_polygon_traces_the_outline() {
        let mesh = two_squares();
        let outline = mesh.boundary_polygon().unwrap().unwrap();
        assert!(outline.is_boundary_marker());
        assert_eq!(outline.id, BOUNDARY_MARKER_ID);
        assert_eq!(outline.n_nodes(), 6);
        assert_relative_eq!(outline.area, 2.0);
        assert!(Mesh::new().boundary_polygon().unwrap().is_none());
    }

    #[test]
    fn moving_a_node_across_the_cell_is_detected() {
        let mesh = two_squares();
        // Dragging node 3 (top-left) past the shared edge folds cell 0.
        assert!(mesh.move_self_intersects(3, DVec2::new(2.0, 0.5)).unwrap());
        assert!(!mesh.move_self_intersects(3, DVec2::new(-0.1, 1.1)).unwrap());
    }

    #[test]
    fn refresh_areas_tracks_moved_nodes() {
        let mut mesh = two_squares();
        mesh.set_node_position(3, DVec2::new(0.0, 2.0)).unwrap();
        mesh.refresh_areas().unwrap();
        assert_relative_eq!(mesh.cell(0).unwrap().area, 1.5);
        assert_relative_eq!(mesh.mean_area(), 1.25);
    }

    #[test]
    fn corrupted_reference_is_reported() {
        let mut mesh = two_squares();
        let shared = mesh
            .walls()
            .find(|w| w.cell_count() == 2)
            .map(|w| w.id)
            .unwrap();
        mesh.wall_mut(shared).unwrap().c2 = None;
        assert!(matches!(
            mesh.validate(),
            Err(TissueError::InvalidTopology(_))
        ));
    }
}
