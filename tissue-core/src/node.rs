use crate::types::NodeId;
use glam::DVec2;

/// A mesh vertex shared by every wall and cell that touches it.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub pos: DVec2,
    /// Excluded from relaxation.
    pub fixed: bool,
    /// Touched by a wall that has a cell on one side only.
    ///
    /// Maintained by the mesh after every topology change; see
    /// [`crate::mesh::Mesh::validate`].
    pub boundary: bool,
}

impl Node {
    pub fn new(id: NodeId, pos: DVec2) -> Self {
        Self {
            id,
            pos,
            fixed: false,
            boundary: false,
        }
    }

    pub fn new_fixed(id: NodeId, pos: DVec2) -> Self {
        Self {
            fixed: true,
            ..Self::new(id, pos)
        }
    }
}
