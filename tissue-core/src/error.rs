//! Error types for tissue topology operations.

use crate::types::{CellId, NodeId, WallId};
use thiserror::Error;

/// Why a division line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateReason {
    /// The line crossed the boundary this many times instead of twice.
    CrossingCount(usize),
    /// A cut point fell on (or too close to) an existing node.
    ShortSegment,
    /// The requested axis or line had zero length.
    ZeroAxis,
    /// This boundary node lies on the cut between the two crossings.
    NodeOnCut(NodeId),
}

impl std::fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CrossingCount(n) => write!(f, "line crosses the boundary {n} times"),
            Self::ShortSegment => write!(f, "cut point too close to an existing node"),
            Self::ZeroAxis => write!(f, "division axis has zero length"),
            Self::NodeOnCut(n) => write!(f, "node {n} lies on the cut"),
        }
    }
}

/// Errors that can occur while building or mutating a tissue mesh.
#[derive(Debug, Error)]
pub enum TissueError {
    /// The division line does not cut the cell cleanly in two.
    ///
    /// Recoverable: the cell is left untouched.
    #[error("Cell {cell}: degenerate division ({reason})")]
    DegenerateDivision {
        /// Cell that was asked to divide.
        cell: CellId,
        /// What was wrong with the line.
        reason: DegenerateReason,
    },

    /// The cell does not meet the preconditions for division.
    #[error("Cell {cell} cannot divide: {reason}")]
    NotDivisible {
        /// Cell that was asked to divide.
        cell: CellId,
        /// Which precondition failed.
        reason: &'static str,
    },

    /// A mesh invariant no longer holds. Fatal for the current run.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A raw division policy code did not match any known policy.
    #[error("Unknown division policy code {0}")]
    UnknownDivisionPolicy(i32),

    /// Lookup of a cell that is retired or was never allocated.
    #[error("Unknown cell {0}")]
    UnknownCell(CellId),

    /// Lookup of a node that is retired or was never allocated.
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    /// Lookup of a wall that is retired or was never allocated.
    #[error("Unknown wall {0}")]
    UnknownWall(WallId),

    /// Construction input that cannot form a valid mesh.
    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    /// A cell outline crosses itself after its nodes were moved.
    #[error("Cell {0} self-intersects")]
    SelfIntersection(CellId),
}

impl TissueError {
    /// Returns `true` for errors after which the simulation may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DegenerateDivision { .. }
                | Self::NotDivisible { .. }
                | Self::UnknownDivisionPolicy(_)
        )
    }
}

/// Result type for tissue operations.
pub type TissueResult<T> = std::result::Result<T, TissueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TissueError::DegenerateDivision {
            cell: 4,
            reason: DegenerateReason::CrossingCount(1),
        };
        assert_eq!(
            format!("{err}"),
            "Cell 4: degenerate division (line crosses the boundary 1 times)"
        );

        let err = TissueError::UnknownDivisionPolicy(42);
        assert!(format!("{err}").contains("42"));
    }

    #[test]
    fn recoverable_split() {
        assert!(
            TissueError::DegenerateDivision {
                cell: 0,
                reason: DegenerateReason::ShortSegment
            }
            .is_recoverable()
        );
        assert!(TissueError::UnknownDivisionPolicy(9).is_recoverable());
        assert!(!TissueError::InvalidTopology("orphan".into()).is_recoverable());
        assert!(!TissueError::SelfIntersection(2).is_recoverable());
    }
}
