//! Seams to the mechanical model.
//!
//! The tissue core never relaxes node positions itself and never
//! computes stresses. It asks a [`PositionOracle`] to move nodes and a
//! [`StressField`] for stress axes. The two small implementations here
//! are stand-ins for a real energy minimiser, useful for driving the
//! growth loop and for tests.

use crate::{
    mesh::Mesh,
    node::Node,
    types::{CellId, NodeId},
};
use glam::DVec2;

/// Principal mechanical stress direction per cell.
pub trait StressField {
    /// Unit (or at least non-zero) stress axis of `cell`, if known.
    fn principal_axis(&self, mesh: &Mesh, cell: CellId) -> Option<DVec2>;
}

/// The same stress direction everywhere.
#[derive(Clone, Copy, Debug)]
pub struct UniformStress {
    pub direction: DVec2,
}

impl StressField for UniformStress {
    fn principal_axis(&self, _mesh: &Mesh, _cell: CellId) -> Option<DVec2> {
        let d = self.direction.normalize_or_zero();
        (d != DVec2::ZERO).then_some(d)
    }
}

/// Tissue-wide growth pressure handed to a relaxation oracle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrowthDemand {
    pub total_area: f64,
    pub total_target_area: f64,
}

impl GrowthDemand {
    pub fn of(mesh: &Mesh) -> Self {
        Self {
            total_area: mesh.total_area(),
            total_target_area: mesh.total_target_area(),
        }
    }
}

/// Position-only access to the mesh's nodes.
///
/// Fixed nodes are readable but refuse to move. Nothing here can reach
/// walls or cells.
pub struct NodePositions<'a> {
    slots: &'a mut [Option<Node>],
}

impl<'a> NodePositions<'a> {
    pub fn new(mesh: &'a mut Mesh) -> Self {
        Self {
            slots: mesh.node_slots_mut(),
        }
    }

    /// Live nodes as `(id, position, fixed)`.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, DVec2, bool)> + '_ {
        self.slots.iter().flatten().map(|n| (n.id, n.pos, n.fixed))
    }

    pub fn get(&self, id: NodeId) -> Option<DVec2> {
        self.slots.get(id).and_then(Option::as_ref).map(|n| n.pos)
    }

    /// Moves a node. Returns `false` for fixed or unknown nodes.
    pub fn set(&mut self, id: NodeId, pos: DVec2) -> bool {
        match self.slots.get_mut(id).and_then(Option::as_mut) {
            Some(node) if !node.fixed => {
                node.pos = pos;
                true
            }
            _ => false,
        }
    }

    /// Mean position of all live nodes.
    pub fn centroid(&self) -> DVec2 {
        let (sum, count) = self
            .iter()
            .fold((DVec2::ZERO, 0usize), |(s, c), (_, p, _)| (s + p, c + 1));
        if count == 0 {
            DVec2::ZERO
        } else {
            sum / count as f64
        }
    }
}

/// Relaxes node positions after cells changed their target areas.
pub trait PositionOracle {
    fn relax(&mut self, demand: &GrowthDemand, nodes: &mut NodePositions<'_>);
}

/// Leaves every node where it is.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stationary;

impl PositionOracle for Stationary {
    fn relax(&mut self, _demand: &GrowthDemand, _nodes: &mut NodePositions<'_>) {}
}

/// Scales the whole tissue about its centroid toward the total target area.
///
/// The per-call change in linear scale is capped at `max_rate`.
#[derive(Clone, Copy, Debug)]
pub struct UniformExpansion {
    pub max_rate: f64,
}

impl Default for UniformExpansion {
    fn default() -> Self {
        Self { max_rate: 0.05 }
    }
}

impl PositionOracle for UniformExpansion {
    fn relax(&mut self, demand: &GrowthDemand, nodes: &mut NodePositions<'_>) {
        if !(demand.total_area > 0.0) || !(demand.total_target_area > 0.0) {
            return;
        }
        let scale = (demand.total_target_area / demand.total_area)
            .sqrt()
            .clamp(1.0 - self.max_rate, 1.0 + self.max_rate);
        let centre = nodes.centroid();
        let moves: Vec<(NodeId, DVec2)> = nodes
            .iter()
            .filter(|(_, _, fixed)| !fixed)
            .map(|(id, p, _)| (id, centre + (p - centre) * scale))
            .collect();
        for (id, p) in moves {
            nodes.set(id, p);
        }
    }
}
