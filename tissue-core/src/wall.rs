//! Oriented boundary segments between two nodes.
//!
//! A wall runs from `n1` to `n2`. The cell whose counter-clockwise
//! boundary walks the wall in that direction lies on its left and is
//! stored in `c1`; the cell that walks it from `n2` to `n1` lies on the
//! right and is stored in `c2`. `None` on a side means that side is the
//! outside of the tissue.

use crate::types::{CellId, NodeId, WallId};

#[derive(Clone, Debug, PartialEq)]
pub struct Wall {
    pub id: WallId,
    pub n1: NodeId,
    pub n2: NodeId,
    /// Cell on the left of `n1 -> n2`.
    pub c1: Option<CellId>,
    /// Cell on the right of `n1 -> n2`.
    pub c2: Option<CellId>,
    pub stiffness: f64,
    /// Elastic rest length.
    pub natural_length: f64,
}

impl Wall {
    pub fn new(id: WallId, n1: NodeId, n2: NodeId, stiffness: f64, natural_length: f64) -> Self {
        Self {
            id,
            n1,
            n2,
            c1: None,
            c2: None,
            stiffness,
            natural_length,
        }
    }

    /// Number of cells this wall separates (0, 1 or 2).
    #[inline]
    pub fn cell_count(&self) -> usize {
        usize::from(self.c1.is_some()) + usize::from(self.c2.is_some())
    }

    /// A wall with a cell on one side only lies on the tissue edge.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.cell_count() < 2
    }

    #[inline]
    pub fn touches(&self, cell: CellId) -> bool {
        self.c1 == Some(cell) || self.c2 == Some(cell)
    }

    /// Returns the cell on the other side from `cell`.
    ///
    /// `None` when `cell` is not adjacent to this wall, or when the far
    /// side is the tissue boundary.
    pub fn other_cell(&self, cell: CellId) -> Option<CellId> {
        if self.c1 == Some(cell) {
            self.c2
        } else if self.c2 == Some(cell) {
            self.c1
        } else {
            None
        }
    }

    /// Walking order of this wall for `cell`, as `(from, to)`.
    pub fn oriented_for(&self, cell: CellId) -> Option<(NodeId, NodeId)> {
        if self.c1 == Some(cell) {
            Some((self.n1, self.n2))
        } else if self.c2 == Some(cell) {
            Some((self.n2, self.n1))
        } else {
            None
        }
    }

    /// Replaces `old` with `new` in whichever side slot holds it.
    ///
    /// Returns `false` if `old` was not adjacent to this wall.
    pub fn replace_cell(&mut self, old: CellId, new: Option<CellId>) -> bool {
        if self.c1 == Some(old) {
            self.c1 = new;
            true
        } else if self.c2 == Some(old) {
            self.c2 = new;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn has_node(&self, node: NodeId) -> bool {
        self.n1 == node || self.n2 == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_wall() -> Wall {
        let mut w = Wall::new(0, 10, 11, 1.0, 1.0);
        w.c1 = Some(3);
        w.c2 = Some(7);
        w
    }

    #[test]
    fn other_cell_reads_the_far_side() {
        let w = shared_wall();
        assert_eq!(w.other_cell(3), Some(7));
        assert_eq!(w.other_cell(7), Some(3));
        assert_eq!(w.other_cell(99), None);
    }

    #[test]
    fn orientation_is_reversed_for_the_right_cell() {
        let w = shared_wall();
        assert_eq!(w.oriented_for(3), Some((10, 11)));
        assert_eq!(w.oriented_for(7), Some((11, 10)));
        assert_eq!(w.oriented_for(1), None);
    }

    #[test]
    fn replace_cell_updates_one_slot() {
        let mut w = shared_wall();
        assert!(w.replace_cell(7, None));
        assert_eq!(w.c2, None);
        assert_eq!(w.cell_count(), 1);
        assert!(w.is_boundary());
        assert!(!w.replace_cell(7, Some(1)));
    }
}
