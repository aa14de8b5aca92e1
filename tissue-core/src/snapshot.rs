//! Plain-data picture of a mesh for serialization.
//!
//! Records carry ids explicitly, so a restored mesh resolves every
//! reference exactly as the source mesh did, and retired ids stay retired.

use crate::{
    cell::{BoundaryEntry, Cell, DivisionPolicy},
    error::{TissueError, TissueResult},
    mesh::Mesh,
    node::Node,
    types::{CellId, NodeId, WallId},
    wall::Wall,
};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub fixed: bool,
    pub boundary: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WallRecord {
    pub id: WallId,
    pub n1: NodeId,
    pub n2: NodeId,
    pub c1: Option<CellId>,
    pub c2: Option<CellId>,
    pub stiffness: f64,
    pub natural_length: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: CellId,
    /// Boundary nodes in counter-clockwise order.
    pub nodes: Vec<NodeId>,
    /// `walls[i]` runs from `nodes[i]` to `nodes[i + 1]`.
    pub walls: Vec<WallId>,
    pub cell_type: i32,
    pub area: f64,
    pub target_area: f64,
    pub base_area: f64,
    pub lambda_length: f64,
    /// Raw policy code.
    pub division_policy: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TissueSnapshot {
    /// Slot counts, retired slots included; the next ids to hand out.
    pub node_slots: usize,
    pub wall_slots: usize,
    pub cell_slots: usize,
    pub nodes: Vec<NodeRecord>,
    pub walls: Vec<WallRecord>,
    pub cells: Vec<CellRecord>,
}

impl Mesh {
    pub fn snapshot(&self) -> TissueSnapshot {
        let (node_slots, wall_slots, cell_slots) = self.slot_counts();
        TissueSnapshot {
            node_slots,
            wall_slots,
            cell_slots,
            nodes: self
                .nodes()
                .map(|n| NodeRecord {
                    id: n.id,
                    x: n.pos.x,
                    y: n.pos.y,
                    fixed: n.fixed,
                    boundary: n.boundary,
                })
                .collect(),
            walls: self
                .walls()
                .map(|w| WallRecord {
                    id: w.id,
                    n1: w.n1,
                    n2: w.n2,
                    c1: w.c1,
                    c2: w.c2,
                    stiffness: w.stiffness,
                    natural_length: w.natural_length,
                })
                .collect(),
            cells: self
                .cells()
                .map(|c| CellRecord {
                    id: c.id,
                    nodes: c.nodes().collect(),
                    walls: c.walls().collect(),
                    cell_type: c.cell_type,
                    area: c.area,
                    target_area: c.target_area,
                    base_area: c.base_area,
                    lambda_length: c.lambda_length,
                    division_policy: c.division_policy.code(),
                })
                .collect(),
        }
    }

    /// Rebuilds a mesh from a snapshot and checks every invariant.
    ///
    /// Node boundary flags are re-derived from the walls rather than
    /// trusted. Unknown policy codes are kept as
    /// [`DivisionPolicy::Unrecognized`].
    ///
    /// ### Errors
    /// [`TissueError::InvalidTopology`] on duplicate ids, ids outside the
    /// recorded slot counts, slot counts too large to allocate, mismatched
    /// cell records, or any invariant violation of the restored mesh.
    pub fn from_snapshot(snapshot: &TissueSnapshot) -> TissueResult<Self> {
        let ids = [
            ("node", snapshot.node_slots, snapshot.nodes.iter().map(|r| r.id).max()),
            ("wall", snapshot.wall_slots, snapshot.walls.iter().map(|r| r.id).max()),
            ("cell", snapshot.cell_slots, snapshot.cells.iter().map(|r| r.id).max()),
        ];
        for (kind, slots, highest) in ids {
            if let Some(id) = highest.filter(|&id| id >= slots) {
                return Err(TissueError::InvalidTopology(format!(
                    "snapshot {kind} {id} is outside its {slots} slots"
                )));
            }
        }

        let mut mesh = Mesh::new();
        mesh.reserve_slots(snapshot.node_slots, snapshot.wall_slots, snapshot.cell_slots)?;

        let mut seen = HashSet::new();
        for rec in &snapshot.nodes {
            if !seen.insert(rec.id) {
                return Err(duplicate("node", rec.id));
            }
            let pos = DVec2::new(rec.x, rec.y);
            mesh.restore_node(if rec.fixed {
                Node::new_fixed(rec.id, pos)
            } else {
                Node::new(rec.id, pos)
            });
        }

        seen.clear();
        for rec in &snapshot.walls {
            if !seen.insert(rec.id) {
                return Err(duplicate("wall", rec.id));
            }
            let mut wall = Wall::new(rec.id, rec.n1, rec.n2, rec.stiffness, rec.natural_length);
            wall.c1 = rec.c1;
            wall.c2 = rec.c2;
            mesh.restore_wall(wall);
        }

        seen.clear();
        for rec in &snapshot.cells {
            if !seen.insert(rec.id) {
                return Err(duplicate("cell", rec.id));
            }
            if rec.nodes.len() != rec.walls.len() {
                return Err(TissueError::InvalidTopology(format!(
                    "cell {} lists {} nodes but {} walls",
                    rec.id,
                    rec.nodes.len(),
                    rec.walls.len()
                )));
            }
            let cycle = rec
                .nodes
                .iter()
                .zip(&rec.walls)
                .map(|(&node, &wall)| BoundaryEntry { node, wall })
                .collect();
            let mut cell = Cell::new(rec.id, cycle, rec.area);
            cell.target_area = rec.target_area;
            cell.base_area = rec.base_area;
            cell.cell_type = rec.cell_type;
            cell.lambda_length = rec.lambda_length;
            cell.division_policy = DivisionPolicy::from_code(rec.division_policy);
            mesh.restore_cell(cell);
        }

        mesh.refresh_boundary_flags();
        mesh.validate()?;
        Ok(mesh)
    }
}

fn duplicate(kind: &str, id: usize) -> TissueError {
    TissueError::InvalidTopology(format!("snapshot lists {kind} {id} twice"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, generator::square_grid};

    #[test]
    fn restored_mesh_matches_source() {
        let mut mesh = square_grid(2, 2, 1.0, 1.0).unwrap();
        mesh.cell_mut(3).unwrap().cell_type = 4;
        mesh.cell_mut(3).unwrap().division_policy = DivisionPolicy::from_code(42);
        mesh.divide_over_axis(0, DVec2::Y, &Config::default()).unwrap();
        mesh.apoptose(1).unwrap();

        let snap = mesh.snapshot();
        let back = Mesh::from_snapshot(&snap).unwrap();
        assert_eq!(back.snapshot(), snap);
        assert_eq!(
            back.cell(3).unwrap().division_policy,
            DivisionPolicy::Unrecognized(42)
        );
        // Retired id 1 is not handed out again.
        assert!(back.cell(1).is_err());
        assert_eq!(back.slot_counts(), mesh.slot_counts());
    }

    #[test]
    fn snapshot_survives_json() {
        let mesh = square_grid(2, 1, 1.0, 1.0).unwrap();
        let json = serde_json::to_string(&mesh.snapshot()).unwrap();
        let snap: TissueSnapshot = serde_json::from_str(&json).unwrap();
        let back = Mesh::from_snapshot(&snap).unwrap();
        assert_eq!(back.n_cells(), 2);
        assert_eq!(back.neighbor_indices(0).unwrap(), vec![1]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut snap = square_grid(1, 1, 1.0, 1.0).unwrap().snapshot();
        let copy = snap.nodes[0].clone();
        snap.nodes.push(copy);
        assert!(matches!(
            Mesh::from_snapshot(&snap),
            Err(TissueError::InvalidTopology(_))
        ));
    }

    #[test]
    fn ids_outside_the_slots_are_rejected() {
        let source = square_grid(1, 1, 1.0, 1.0).unwrap().snapshot();

        let mut snap = source.clone();
        snap.nodes[0].id = usize::MAX;
        assert!(matches!(
            Mesh::from_snapshot(&snap),
            Err(TissueError::InvalidTopology(_))
        ));

        let mut snap = source.clone();
        snap.cells[0].id = snap.cell_slots;
        assert!(matches!(
            Mesh::from_snapshot(&snap),
            Err(TissueError::InvalidTopology(_))
        ));

        let mut snap = source;
        snap.wall_slots = usize::MAX;
        assert!(matches!(
            Mesh::from_snapshot(&snap),
            Err(TissueError::InvalidTopology(_))
        ));
    }

    #[test]
    fn broken_references_are_rejected() {
        let mut snap = square_grid(2, 1, 1.0, 1.0).unwrap().snapshot();
        // Point a wall at a cell that does not list it.
        let wall = snap
            .walls
            .iter_mut()
            .find(|w| w.c2.is_none())
            .unwrap();
        wall.c2 = Some(1);
        assert!(Mesh::from_snapshot(&snap).is_err());
    }
}
