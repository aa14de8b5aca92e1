//! The hook interface a cell model implements.
//!
//! Hooks never see the mesh. They get a [`CellHandle`] carrying the
//! cell's own scalar state plus read-only facts about its surroundings
//! gathered beforehand, so no hook can rewire topology while the mesh is
//! iterating. Division is requested through the handle and carried out
//! later by the division phase.

use crate::{
    cell::{Cell, DivisionPolicy},
    config::Config,
    division::ParentInfo,
    error::TissueResult,
    geometry::{AxisInfo, Polygon},
    mesh::Mesh,
    types::CellId,
};
use glam::DVec2;

/// A cell model: per-step housekeeping plus a post-division callback.
pub trait CellBehavior {
    /// Short identifier, used in logs and by the runner.
    fn model_id(&self) -> &str;

    /// Called once per step for every live cell, in ascending id order.
    fn cell_housekeeping(&mut self, cell: &mut CellHandle<'_>);

    /// Called once for each committed division, after both daughters
    /// have their boundaries and areas.
    fn on_divide(
        &mut self,
        _parent: &ParentInfo,
        _daughter1: &mut CellHandle<'_>,
        _daughter2: &mut CellHandle<'_>,
    ) {
    }
}

/// Surroundings of a cell, captured before its handle is handed out.
#[derive(Clone, Debug)]
pub struct CellView {
    neighbors: Vec<(CellId, i32)>,
    at_boundary: bool,
    polygon: Polygon,
}

impl CellView {
    /// Gathers the read-only facts a hook may ask about.
    pub fn capture(mesh: &Mesh, id: CellId) -> TissueResult<Self> {
        let neighbors = mesh
            .neighbor_indices(id)?
            .into_iter()
            .map(|n| mesh.cell(n).map(|c| (n, c.cell_type)))
            .collect::<TissueResult<Vec<_>>>()?;
        Ok(Self {
            neighbors,
            at_boundary: mesh.at_boundary(id)?,
            polygon: mesh.cell_polygon(id)?,
        })
    }
}

/// What a model hook may see and change of one cell.
pub struct CellHandle<'a> {
    cell: &'a mut Cell,
    view: CellView,
    cfg: &'a Config,
    divide_requested: bool,
}

impl<'a> CellHandle<'a> {
    pub fn new(cell: &'a mut Cell, view: CellView, cfg: &'a Config) -> Self {
        Self {
            cell,
            view,
            cfg,
            divide_requested: false,
        }
    }

    #[inline]
    pub fn index(&self) -> CellId {
        self.cell.id
    }

    /// Area as of the last refresh.
    #[inline]
    pub fn area(&self) -> f64 {
        self.cell.area
    }

    #[inline]
    pub fn target_area(&self) -> f64 {
        self.cell.target_area
    }

    #[inline]
    pub fn base_area(&self) -> f64 {
        self.cell.base_area
    }

    #[inline]
    pub fn cell_type(&self) -> i32 {
        self.cell.cell_type
    }

    pub fn set_cell_type(&mut self, cell_type: i32) {
        self.cell.cell_type = cell_type;
    }

    pub fn enlarge_target_area(&mut self, da: f64) {
        self.cell.enlarge_target_area(da);
    }

    pub fn division_policy(&self) -> DivisionPolicy {
        self.cell.division_policy
    }

    pub fn set_division_policy(&mut self, policy: DivisionPolicy) {
        self.cell.division_policy = policy;
    }

    pub fn lambda_length(&self) -> f64 {
        self.cell.lambda_length
    }

    pub fn set_lambda_length(&mut self, lambda: f64) {
        self.cell.lambda_length = lambda;
    }

    pub fn at_boundary(&self) -> bool {
        self.view.at_boundary
    }

    /// Neighbor ids in boundary order; see [`Mesh::neighbor_indices`].
    pub fn neighbor_indices(&self) -> impl Iterator<Item = CellId> + '_ {
        self.view.neighbors.iter().map(|&(id, _)| id)
    }

    /// `(id, cell_type)` of each neighbor, in boundary order.
    pub fn neighbors(&self) -> &[(CellId, i32)] {
        &self.view.neighbors
    }

    pub fn touches_type(&self, cell_type: i32) -> bool {
        self.view.neighbors.iter().any(|&(_, t)| t == cell_type)
    }

    pub fn touches_cell(&self, id: CellId) -> bool {
        self.view.neighbors.iter().any(|&(n, _)| n == id)
    }

    pub fn centroid(&self) -> DVec2 {
        self.view.polygon.centroid()
    }

    pub fn length(&self) -> AxisInfo {
        self.view.polygon.length()
    }

    /// Asks for this cell to divide. The division happens in the
    /// division phase, not here.
    pub fn divide(&mut self) {
        self.divide_requested = true;
    }

    pub fn division_requested(&self) -> bool {
        self.divide_requested
    }

    pub fn config(&self) -> &Config {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_squares() -> Mesh {
        let positions = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(2.0, 1.0),
        ];
        Mesh::from_polygons(&positions, &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]], 1.0).unwrap()
    }

    #[test]
    fn handle_reports_surroundings() {
        let mut mesh = two_squares();
        mesh.cell_mut(1).unwrap().cell_type = 7;
        let cfg = Config::default();
        let view = CellView::capture(&mesh, 0).unwrap();
        let cell = mesh.cell_mut(0).unwrap();
        let handle = CellHandle::new(cell, view, &cfg);

        assert_eq!(handle.index(), 0);
        assert!(handle.at_boundary());
        assert_eq!(handle.neighbors(), &[(1, 7)]);
        assert!(handle.touches_type(7));
        assert!(handle.touches_cell(1));
        assert!(!handle.touches_cell(0));
        assert_relative_eq!(handle.centroid().x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(handle.centroid().y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn handle_edits_scalar_state() {
        let mut mesh = two_squares();
        let cfg = Config::default();
        let view = CellView::capture(&mesh, 1).unwrap();
        {
            let mut handle = CellHandle::new(mesh.cell_mut(1).unwrap(), view, &cfg);
            handle.set_cell_type(3);
            handle.enlarge_target_area(0.5);
            handle.set_lambda_length(0.1);
            handle.set_division_policy(DivisionPolicy::LongAxis);
            assert!(!handle.division_requested());
            handle.divide();
            assert!(handle.division_requested());
        }
        let c = mesh.cell(1).unwrap();
        assert_eq!(c.cell_type, 3);
        assert_eq!(c.target_area, 1.5);
        assert_eq!(c.lambda_length, 0.1);
        assert_eq!(c.division_policy, DivisionPolicy::LongAxis);
        // Requesting a division does not touch the mesh.
        assert_eq!(mesh.n_cells(), 2);
    }
}
