use crate::error::{TissueError, TissueResult};
use crate::types::{CellId, NodeId, WallId};

/// Id carried by the boundary polygon, which never enters the registry.
pub const BOUNDARY_MARKER_ID: CellId = CellId::MAX;

/// One step of a cell's boundary: a node and the wall leaving it.
///
/// Entry `i` holds node `i` and the wall from node `i` to node `i + 1`
/// (wrapping around), so the entries form a closed counter-clockwise loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryEntry {
    pub node: NodeId,
    pub wall: WallId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CellKind {
    #[default]
    Tissue,
    /// Outline of the whole tissue. Not counted, never divides.
    BoundaryMarker,
}

/// How a cell picks its division axis.
///
/// Raw integer codes follow the order of the variants, starting at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DivisionPolicy {
    NoDivision,
    /// Uniformly random orientation in `[0, pi)`.
    Random,
    /// Along the principal stress axis.
    MaxStressAxis,
    /// Perpendicular to the long axis.
    #[default]
    ShortAxis,
    LongAxis,
    /// Perpendicular to the principal stress axis.
    PerpStress,
    /// A code no policy is known for. Divides over the short axis.
    Unrecognized(i32),
}

impl DivisionPolicy {
    /// Decodes a raw policy code, keeping unknown codes as [`Self::Unrecognized`].
    pub fn from_code(code: i32) -> Self {
        Self::try_from_code(code).unwrap_or(Self::Unrecognized(code))
    }

    /// Decodes a raw policy code, rejecting unknown codes.
    pub fn try_from_code(code: i32) -> TissueResult<Self> {
        match code {
            0 => Ok(Self::NoDivision),
            1 => Ok(Self::Random),
            2 => Ok(Self::MaxStressAxis),
            3 => Ok(Self::ShortAxis),
            4 => Ok(Self::LongAxis),
            5 => Ok(Self::PerpStress),
            other => Err(TissueError::UnknownDivisionPolicy(other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::NoDivision => 0,
            Self::Random => 1,
            Self::MaxStressAxis => 2,
            Self::ShortAxis => 3,
            Self::LongAxis => 4,
            Self::PerpStress => 5,
            Self::Unrecognized(code) => code,
        }
    }
}

/// A polygonal cell.
///
/// The cell owns none of its nodes or walls; it only records, in
/// geometric order, which of the mesh's nodes and walls bound it. The
/// boundary can only be rewritten by the [`crate::mesh::Mesh`].
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub id: CellId,
    pub kind: CellKind,
    pub(crate) cycle: Vec<BoundaryEntry>,
    /// Area as of the last refresh; see [`crate::mesh::Mesh::refresh_areas`].
    pub area: f64,
    pub target_area: f64,
    /// Reference area growth and division thresholds are measured against.
    pub base_area: f64,
    /// Model-defined tag; never interpreted by the mesh.
    pub cell_type: i32,
    pub division_policy: DivisionPolicy,
    /// Per-cell modifier of the wall-length spring constant.
    pub lambda_length: f64,
}

impl Cell {
    pub(crate) fn new(id: CellId, cycle: Vec<BoundaryEntry>, area: f64) -> Self {
        Self {
            id,
            kind: CellKind::Tissue,
            cycle,
            area,
            target_area: area,
            base_area: area,
            cell_type: 0,
            division_policy: DivisionPolicy::default(),
            lambda_length: 1.0,
        }
    }

    /// The boundary in order, one entry per node.
    #[inline]
    pub fn boundary(&self) -> &[BoundaryEntry] {
        &self.cycle
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.cycle.iter().map(|e| e.node)
    }

    pub fn walls(&self) -> impl Iterator<Item = WallId> + '_ {
        self.cycle.iter().map(|e| e.wall)
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.cycle.len()
    }

    #[inline]
    pub fn is_boundary_marker(&self) -> bool {
        self.kind == CellKind::BoundaryMarker
    }

    #[inline]
    pub fn enlarge_target_area(&mut self, da: f64) {
        self.target_area += da;
    }

    /// Position of `wall` in the boundary, if it is part of it.
    pub(crate) fn slot_of_wall(&self, wall: WallId) -> Option<usize> {
        self.cycle.iter().position(|e| e.wall == wall)
    }
}
