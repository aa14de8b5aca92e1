//! Simulation phases of one growth step.
//!
//! The update loop looks like:
//! 1. [`relaxation_phase`] — a [`PositionOracle`] moves nodes toward the
//!    cells' target areas, then every cell's area is refreshed.
//! 2. [`housekeeping_phase`] — the cell model runs once per cell,
//!    adjusting target areas, types and policies, and queueing divisions.
//! 3. [`division_phase`] — queued divisions are carried out one at a
//!    time, each followed by the model's `on_divide` callback.
//!
//! Topology only ever changes in the division phase, so the first two
//! phases can iterate the mesh freely.

use crate::{
    behavior::{CellBehavior, CellHandle, CellView},
    config::Config,
    division::Division,
    error::{TissueError, TissueResult},
    mechanics::{GrowthDemand, NodePositions, PositionOracle, StressField},
    mesh::Mesh,
    types::CellId,
};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// FIFO of cells waiting to divide. A cell is queued at most once.
#[derive(Clone, Debug, Default)]
pub struct DivisionQueue {
    order: VecDeque<CellId>,
    queued: HashSet<CellId>,
}

impl DivisionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `cell` unless it is already waiting. Returns whether it was added.
    pub fn push(&mut self, cell: CellId) -> bool {
        if self.queued.insert(cell) {
            self.order.push_back(cell);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<CellId> {
        let cell = self.order.pop_front()?;
        self.queued.remove(&cell);
        Some(cell)
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.queued.contains(&cell)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// What the division phase did.
#[derive(Clone, Debug, Default)]
pub struct DivisionOutcome {
    pub divisions: Vec<Division>,
    /// Requests dropped because the division could not be carried out.
    pub skipped: usize,
}

/// Lets the position oracle move nodes, then refreshes cell areas.
///
/// ### Parameters
/// - `mesh` - The tissue; only node positions and cached areas change.
/// - `oracle` - Relaxation strategy. It sees positions only.
///
/// ### Errors
/// [`TissueError::SelfIntersection`] if a cell outline crosses itself
/// after relaxation, or [`TissueError::InvalidTopology`] if a cell's area
/// is no longer positive.
pub fn relaxation_phase(mesh: &mut Mesh, oracle: &mut dyn PositionOracle) -> TissueResult<()> {
    let demand = GrowthDemand::of(mesh);
    oracle.relax(&demand, &mut NodePositions::new(mesh));

    for id in mesh.cell_ids() {
        if mesh.self_intersects(id)? {
            return Err(TissueError::SelfIntersection(id));
        }
    }
    mesh.refresh_areas()
}

/// Runs the model's housekeeping hook on every live cell.
///
/// Cells are visited in ascending id order. Each hook gets a
/// [`CellHandle`] whose neighbor facts were captured just before the
/// call, so they reflect edits made by hooks that ran earlier in the same
/// pass. Cells that request division are appended to `queue`.
///
/// ### Parameters
/// - `mesh` - The tissue; only per-cell scalar state can change.
/// - `model` - The cell model whose hook runs.
/// - `cfg` - Global configuration, passed through to the hook.
/// - `queue` - Receives division requests.
pub fn housekeeping_phase<B: CellBehavior + ?Sized>(
    mesh: &mut Mesh,
    model: &mut B,
    cfg: &Config,
    queue: &mut DivisionQueue,
) -> TissueResult<()> {
    for id in mesh.cell_ids() {
        let view = CellView::capture(mesh, id)?;
        let mut handle = CellHandle::new(mesh.cell_mut(id)?, view, cfg);
        model.cell_housekeeping(&mut handle);
        if handle.division_requested() {
            queue.push(id);
        }
    }
    Ok(())
}

/// Carries out queued divisions in request order.
///
/// After each committed division the model's `on_divide` runs with both
/// daughters; if it asks either daughter to divide, that request joins the
/// back of the queue. At most `cfg.max_divisions_per_step` divisions run;
/// whatever is left stays queued for the next step.
///
/// Degenerate lines and cells that cannot divide are logged and skipped.
/// Requests for cells that no longer exist are dropped.
///
/// ### Parameters
/// - `mesh` - The tissue to divide cells of.
/// - `model` - Receives `on_divide` for every division.
/// - `cfg` - Division thresholds and limits.
/// - `queue` - Pending requests; drained up to the per-step cap.
/// - `rng` - Used by the random division policy.
/// - `stress` - Stress field for the stress-based policies, if any.
///
/// ### Errors
/// Returns the first non-recoverable error; the mesh is then no longer
/// trustworthy.
pub fn division_phase<B: CellBehavior + ?Sized, R: Rng>(
    mesh: &mut Mesh,
    model: &mut B,
    cfg: &Config,
    queue: &mut DivisionQueue,
    rng: &mut R,
    stress: Option<&dyn StressField>,
) -> TissueResult<DivisionOutcome> {
    let mut outcome = DivisionOutcome::default();
    while outcome.divisions.len() < cfg.max_divisions_per_step {
        let Some(id) = queue.pop() else { break };
        if mesh.cell(id).is_err() {
            debug!(cell = id, "division requested for a retired cell, dropping");
            continue;
        }

        match mesh.divide(id, rng, stress, cfg) {
            Ok(Some(division)) => {
                notify_division(mesh, model, cfg, &division, queue)?;
                outcome.divisions.push(division);
            }
            Ok(None) => {}
            Err(e) if e.is_recoverable() => {
                warn!(cell = id, "{e}; skipping division");
                outcome.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if !queue.is_empty() {
        warn!(
            pending = queue.len(),
            cap = cfg.max_divisions_per_step,
            "division cap reached, deferring remaining requests"
        );
    }
    Ok(outcome)
}

fn notify_division<B: CellBehavior + ?Sized>(
    mesh: &mut Mesh,
    model: &mut B,
    cfg: &Config,
    division: &Division,
    queue: &mut DivisionQueue,
) -> TissueResult<()> {
    let v1 = CellView::capture(mesh, division.daughter1)?;
    let v2 = CellView::capture(mesh, division.daughter2)?;
    let (c1, c2) = mesh.two_cells_mut(division.daughter1, division.daughter2)?;
    let mut d1 = CellHandle::new(c1, v1, cfg);
    let mut d2 = CellHandle::new(c2, v2, cfg);
    model.on_divide(&division.parent, &mut d1, &mut d2);

    let again = [
        (division.daughter1, d1.division_requested()),
        (division.daughter2, d2.division_requested()),
    ];
    for (id, requested) in again {
        if requested {
            queue.push(id);
        }
    }
    Ok(())
}
