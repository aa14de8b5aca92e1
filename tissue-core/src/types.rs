use std::collections::BTreeSet;

/// Identifier for a node in a [`crate::mesh::Mesh`].
///
/// This is an index into the mesh's node registry. Ids are handed out
/// in increasing order and never reused while the mesh is alive, so an
/// id stays meaningful even after the node it named has been retired.
pub type NodeId = usize;

/// Identifier for a wall in a [`crate::mesh::Mesh`].
pub type WallId = usize;

/// Identifier for a cell in a [`crate::mesh::Mesh`].
///
/// A division keeps the parent's id for the first daughter and
/// allocates a fresh one for the second.
pub type CellId = usize;

/// Collection of nodes created along a division line.
///
/// Callers that cut the tissue with the same line across several
/// divisions pass one of these in to accumulate the new nodes.
pub type NodeSet = BTreeSet<NodeId>;
