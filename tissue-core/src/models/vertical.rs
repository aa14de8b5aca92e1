use crate::{
    behavior::{CellBehavior, CellHandle},
    cell::DivisionPolicy,
};

/// Growth with short-axis division everywhere.
///
/// Cells on the tissue edge get a stiffer wall-length spring than inner
/// cells, which keeps the outline smooth while the inside divides.
#[derive(Clone, Copy, Debug)]
pub struct VerticalDivisionModel {
    pub lambda_inner: f64,
    pub lambda_edge: f64,
}

impl Default for VerticalDivisionModel {
    fn default() -> Self {
        Self {
            lambda_inner: 0.1,
            lambda_edge: 0.5,
        }
    }
}

impl CellBehavior for VerticalDivisionModel {
    fn model_id(&self) -> &str {
        "vertical"
    }

    fn cell_housekeeping(&mut self, cell: &mut CellHandle<'_>) {
        cell.set_division_policy(DivisionPolicy::ShortAxis);
        let lambda = if cell.at_boundary() {
            self.lambda_edge
        } else {
            self.lambda_inner
        };
        cell.set_lambda_length(lambda);

        cell.enlarge_target_area(cell.config().cell_expansion_rate);
        if cell.area() > cell.config().rel_cell_div_threshold * cell.base_area() {
            cell.divide();
        }
    }
}
