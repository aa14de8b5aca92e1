//! Cell division: finding the cut, then rewiring the mesh around it.
//!
//! A division runs in two stages:
//! 1. **Plan** (read-only) — walk the cell's boundary once, find exactly
//!    two walls the division line crosses and where. Anything off
//!    (wrong crossing count, a cut on top of an existing node, a corner
//!    resting on the cut, a zero axis) is rejected here, before the mesh
//!    is touched.
//! 2. **Commit** — insert a node on each crossed wall (splitting the
//!    wall for both cells it separates), add the dividing wall, and
//!    share the parent's boundary out between the two daughters.
//!
//! Because every check happens during planning, a failed division leaves
//! no trace in the mesh.

use crate::{
    cell::{BoundaryEntry, DivisionPolicy},
    config::{Config, TargetAreaSplit},
    error::{DegenerateReason, TissueError, TissueResult},
    mechanics::StressField,
    mesh::Mesh,
    types::{CellId, NodeId, NodeSet, WallId},
};
use glam::DVec2;
use rand::Rng;
use std::f64::consts::PI;
use tracing::{debug, info, warn};

/// Angular step between retries of a division axis that hits nodes.
const AXIS_TURN: f64 = PI / 36.0;
const AXIS_TURNS: usize = 6;

fn hits_existing_nodes(e: &TissueError) -> bool {
    matches!(
        e,
        TissueError::DegenerateDivision {
            reason: DegenerateReason::ShortSegment
                | DegenerateReason::CrossingCount(_)
                | DegenerateReason::NodeOnCut(_),
            ..
        }
    )
}

/// State of a parent cell just before it divided.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParentInfo {
    pub index: CellId,
    pub centroid: DVec2,
    pub cell_type: i32,
    pub area: f64,
}

/// Outcome of a committed division.
#[derive(Clone, Debug, PartialEq)]
pub struct Division {
    pub parent: ParentInfo,
    /// Keeps the parent's id and its boundary starting node.
    pub daughter1: CellId,
    /// Freshly allocated.
    pub daughter2: CellId,
    /// Nodes inserted where the line crossed the boundary.
    pub new_nodes: [NodeId; 2],
    /// Wall between the two daughters.
    pub dividing_wall: WallId,
    /// Direction of the division line.
    pub axis: DVec2,
    /// Set when the cell's policy could not be honoured and the short
    /// axis was used instead.
    pub policy_fallback: Option<DivisionPolicy>,
}

/// Where the division line crosses one wall of the cell.
#[derive(Clone, Copy, Debug)]
struct Cut {
    wall: WallId,
    point: DVec2,
}

#[derive(Clone, Copy, Debug)]
struct DivisionPlan {
    cell: CellId,
    cuts: [Cut; 2],
    axis: DVec2,
}

impl Mesh {
    /// Divides a cell according to its [`DivisionPolicy`].
    ///
    /// The long axis is computed once and the concrete axis picked from
    /// it: perpendicular for `ShortAxis`, itself for `LongAxis`, a uniform
    /// orientation in `[0, pi)` for `Random`, the stress axis (or its
    /// perpendicular) for the stress policies. Stress policies without a
    /// `stress` field, and unrecognized policy codes, fall back to the
    /// short axis; the fallback is logged and recorded in
    /// [`Division::policy_fallback`].
    ///
    /// ### Returns
    /// `Ok(None)` for cells whose policy is `NoDivision`.
    pub fn divide<R: Rng>(
        &mut self,
        cell: CellId,
        rng: &mut R,
        stress: Option<&dyn StressField>,
        cfg: &Config,
    ) -> TissueResult<Option<Division>> {
        let policy = self.cell(cell)?.division_policy;
        let long_axis = self.cell_length(cell)?.long_axis;
        debug!(cell, ?policy, ?long_axis, "division requested");

        let (axis, fallback) = match policy {
            DivisionPolicy::NoDivision => {
                debug!(cell, "division policy is NoDivision, skipping");
                return Ok(None);
            }
            DivisionPolicy::Random => {
                let orientation = rng.random_range(0.0..PI);
                (
                    DVec2::new(orientation.sin(), orientation.cos()),
                    None,
                )
            }
            DivisionPolicy::ShortAxis => (long_axis.perp(), None),
            DivisionPolicy::LongAxis => (long_axis, None),
            DivisionPolicy::MaxStressAxis | DivisionPolicy::PerpStress => match stress
                .and_then(|s| s.principal_axis(&*self, cell))
            {
                Some(s) if policy == DivisionPolicy::PerpStress => (s.perp(), None),
                Some(s) => (s, None),
                None => {
                    warn!(cell, ?policy, "no stress axis available, dividing over short axis");
                    (long_axis.perp(), Some(policy))
                }
            },
            DivisionPolicy::Unrecognized(code) => {
                warn!(
                    cell,
                    "{}, dividing over short axis",
                    TissueError::UnknownDivisionPolicy(code)
                );
                (long_axis.perp(), Some(policy))
            }
        };

        let mut division = self.divide_over_turned_axis(cell, axis, cfg)?;
        division.policy_fallback = fallback;
        Ok(Some(division))
    }

    /// Divides over `axis`, turning it a few degrees either way when the
    /// line runs through existing nodes.
    ///
    /// Regular polygons have no preferred axis and their fallback axis can
    /// pass straight through two opposite corners. Each retry is planned
    /// from scratch, so failed attempts leave the mesh unchanged. When
    /// every attempt fails the first error is returned.
    fn divide_over_turned_axis(
        &mut self,
        cell: CellId,
        axis: DVec2,
        cfg: &Config,
    ) -> TissueResult<Division> {
        let first = match self.divide_over_axis(cell, axis, cfg) {
            Err(e) if hits_existing_nodes(&e) => e,
            other => return other,
        };
        for k in 1..=AXIS_TURNS {
            let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
            let angle = sign * AXIS_TURN * k.div_ceil(2) as f64;
            debug!(cell, angle, "retrying division over a turned axis");
            match self.divide_over_axis(cell, DVec2::from_angle(angle).rotate(axis), cfg) {
                Err(e) if hits_existing_nodes(&e) => continue,
                other => return other,
            }
        }
        Err(first)
    }

    /// Divides a cell over the line through its centroid along `axis`.
    pub fn divide_over_axis(
        &mut self,
        cell: CellId,
        axis: DVec2,
        cfg: &Config,
    ) -> TissueResult<Division> {
        if !(axis.length_squared() > 0.0) || !axis.is_finite() {
            return Err(TissueError::DegenerateDivision {
                cell,
                reason: DegenerateReason::ZeroAxis,
            });
        }
        let centroid = self.cell_centroid(cell)?;
        self.divide_over_given_line(cell, centroid, centroid + axis, false, None, cfg)
    }

    /// Divides a cell over the infinite line through `p1` and `p2`.
    ///
    /// With `wall_fixed` the two inserted nodes are pinned so the cut
    /// stays straight under relaxation. When `node_set` is given, the two
    /// inserted nodes are added to it.
    ///
    /// ### Errors
    /// - [`TissueError::DegenerateDivision`] when the line does not cross
    ///   the boundary at exactly two points away from existing nodes. The
    ///   mesh is left unchanged.
    /// - [`TissueError::NotDivisible`] for boundary markers and cells with
    ///   fewer than three nodes.
    /// - [`TissueError::InvalidTopology`] if the post-commit check fails.
    pub fn divide_over_given_line(
        &mut self,
        cell: CellId,
        p1: DVec2,
        p2: DVec2,
        wall_fixed: bool,
        node_set: Option<&mut NodeSet>,
        cfg: &Config,
    ) -> TissueResult<Division> {
        let plan = match self.plan_division(cell, p1, p2, cfg.min_cut_fraction) {
            Ok(plan) => plan,
            Err(e) => {
                debug!(cell, %e, "division aborted");
                return Err(e);
            }
        };
        let division = self.commit_division(plan, wall_fixed, cfg)?;
        if let Some(set) = node_set {
            set.extend(division.new_nodes);
        }
        Ok(division)
    }

    fn plan_division(
        &self,
        cell: CellId,
        p1: DVec2,
        p2: DVec2,
        min_cut_fraction: f64,
    ) -> TissueResult<DivisionPlan> {
        let c = self.cell(cell)?;
        if c.is_boundary_marker() {
            return Err(TissueError::NotDivisible {
                cell,
                reason: "boundary marker",
            });
        }
        if c.n_nodes() < 3 {
            return Err(TissueError::NotDivisible {
                cell,
                reason: "fewer than three nodes",
            });
        }
        let axis = p2 - p1;
        if !(axis.length_squared() > 0.0) || !axis.is_finite() {
            return Err(TissueError::DegenerateDivision {
                cell,
                reason: DegenerateReason::ZeroAxis,
            });
        }

        let entries = c.boundary();
        let n = entries.len();
        let mut cuts = Vec::with_capacity(2);
        for k in 0..n {
            let a = self.node(entries[k].node)?.pos;
            let b = self.node(entries[(k + 1) % n].node)?.pos;
            let Some(t) = crate::geometry::segment_line_crossing(a, b, p1, p2) else {
                continue;
            };
            if t < min_cut_fraction || t > 1.0 - min_cut_fraction {
                return Err(TissueError::DegenerateDivision {
                    cell,
                    reason: DegenerateReason::ShortSegment,
                });
            }
            cuts.push(Cut {
                wall: entries[k].wall,
                point: a.lerp(b, t),
            });
        }

        let &[first, second] = cuts.as_slice() else {
            return Err(TissueError::DegenerateDivision {
                cell,
                reason: DegenerateReason::CrossingCount(cuts.len()),
            });
        };

        // A reflex corner resting on the chord would pinch a daughter.
        let chord = second.point - first.point;
        let chord_len2 = chord.length_squared();
        let tolerance = min_cut_fraction * chord_len2;
        for entry in entries {
            let q = self.node(entry.node)?.pos;
            let along = chord.dot(q - first.point);
            let off = crate::geometry::line_side(first.point, second.point, q);
            if off.abs() <= tolerance && along > 0.0 && along < chord_len2 {
                return Err(TissueError::DegenerateDivision {
                    cell,
                    reason: DegenerateReason::NodeOnCut(entry.node),
                });
            }
        }

        Ok(DivisionPlan {
            cell,
            cuts: [first, second],
            axis,
        })
    }

    /// Inserts a node at `point` on `wall_id`, splitting the wall in two.
    ///
    /// The original wall keeps its id and now runs `n1 -> new`; the
    /// second half `new -> n2` gets a fresh id. Both halves keep the
    /// original's cells on the same sides, and every cell bounded by the
    /// wall gets the new node spliced into its boundary.
    fn split_wall(
        &mut self,
        wall_id: WallId,
        point: DVec2,
        fixed: bool,
    ) -> TissueResult<(NodeId, WallId)> {
        let wall = self.wall(wall_id)?.clone();
        let p1 = self.node(wall.n1)?.pos;
        let p2 = self.node(wall.n2)?.pos;
        let full = p1.distance(p2);
        let fraction = if full > 0.0 {
            p1.distance(point) / full
        } else {
            0.5
        };

        let node = self.alloc_node(point);
        {
            let n = self.node_mut(node)?;
            n.fixed = fixed;
            n.boundary = wall.is_boundary();
        }

        let second = self.alloc_wall(
            node,
            wall.n2,
            wall.stiffness,
            wall.natural_length * (1.0 - fraction),
        );
        {
            let w = self.wall_mut(second)?;
            w.c1 = wall.c1;
            w.c2 = wall.c2;
        }
        {
            let w = self.wall_mut(wall_id)?;
            w.n2 = node;
            w.natural_length = wall.natural_length * fraction;
        }

        // The left cell walks n1 -> n2: first half, new node, second half.
        if let Some(left) = wall.c1 {
            let cell = self.cell_mut(left)?;
            let slot = cell
                .slot_of_wall(wall_id)
                .ok_or_else(|| missing_wall(left, wall_id))?;
            cell.cycle.insert(
                slot + 1,
                BoundaryEntry {
                    node,
                    wall: second,
                },
            );
        }
        // The right cell walks n2 -> n1: second half, new node, first half.
        if let Some(right) = wall.c2 {
            let cell = self.cell_mut(right)?;
            let slot = cell
                .slot_of_wall(wall_id)
                .ok_or_else(|| missing_wall(right, wall_id))?;
            cell.cycle[slot].wall = second;
            cell.cycle.insert(
                slot + 1,
                BoundaryEntry {
                    node,
                    wall: wall_id,
                },
            );
        }

        Ok((node, second))
    }

    fn commit_division(
        &mut self,
        plan: DivisionPlan,
        wall_fixed: bool,
        cfg: &Config,
    ) -> TissueResult<Division> {
        let id = plan.cell;
        let parent_poly = self.cell_polygon(id)?;
        let parent = {
            let c = self.cell(id)?;
            ParentInfo {
                index: id,
                centroid: parent_poly.centroid(),
                cell_type: c.cell_type,
                area: parent_poly.signed_area(),
            }
        };
        let start_node = self
            .cell(id)?
            .boundary()
            .first()
            .map(|e| e.node)
            .ok_or_else(|| TissueError::InvalidTopology(format!("cell {id} is empty")))?;

        let (node_a, _) = self.split_wall(plan.cuts[0].wall, plan.cuts[0].point, wall_fixed)?;
        let (node_b, _) = self.split_wall(plan.cuts[1].wall, plan.cuts[1].point, wall_fixed)?;

        let cycle = self.cell(id)?.cycle.clone();
        let len = cycle.len();
        let position = |node: NodeId| {
            cycle.iter().position(|e| e.node == node).ok_or_else(|| {
                TissueError::InvalidTopology(format!("node {node} missing from cell {id}"))
            })
        };
        let ia = position(node_a)?;
        let ib = position(node_b)?;
        let i0 = position(start_node)?;

        // The arc holding the original start node stays with the parent id.
        let in_arc =
            |from: usize, to: usize, k: usize| (k + len - from) % len < (to + len - from) % len;
        let (s1, e1) = if in_arc(ia, ib, i0) { (ia, ib) } else { (ib, ia) };
        let arc = |from: usize, to: usize| -> Vec<BoundaryEntry> {
            let count = (to + len - from) % len;
            (0..count).map(|k| cycle[(from + k) % len]).collect()
        };

        // Daughter 1 walks its arc s1 .. e1 and closes with e1 -> s1.
        let node_s1 = cycle[s1].node;
        let node_e1 = cycle[e1].node;
        let span = self.node(node_e1)?.pos.distance(self.node(node_s1)?.pos);
        let dividing = self.alloc_wall(node_e1, node_s1, cfg.wall_stiffness, span);

        let mut cycle1 = arc(s1, e1);
        cycle1.push(BoundaryEntry {
            node: node_e1,
            wall: dividing,
        });
        if let Some(start) = cycle1.iter().position(|e| e.node == start_node) {
            cycle1.rotate_left(start);
        }
        let mut cycle2 = arc(e1, s1);
        cycle2.push(BoundaryEntry {
            node: node_s1,
            wall: dividing,
        });

        let daughter2 = {
            let template = self.cell(id)?.clone();
            let d2 = self.alloc_cell(cycle2.clone(), 0.0);
            let cell = self.cell_mut(d2)?;
            cell.cell_type = template.cell_type;
            cell.division_policy = template.division_policy;
            cell.lambda_length = template.lambda_length;
            cell.base_area = template.base_area;
            d2
        };
        self.cell_mut(id)?.cycle = cycle1;

        for entry in &cycle2 {
            if entry.wall == dividing {
                continue;
            }
            let wall = self.wall_mut(entry.wall)?;
            if !wall.replace_cell(id, Some(daughter2)) {
                return Err(missing_wall(id, entry.wall));
            }
        }
        {
            let w = self.wall_mut(dividing)?;
            w.c1 = Some(id);
            w.c2 = Some(daughter2);
        }

        let area1 = self.cell_area(id)?;
        let area2 = self.cell_area(daughter2)?;
        let parent_target = self.cell(id)?.target_area;
        let (target1, target2) = match cfg.target_area_split {
            TargetAreaSplit::Proportional => {
                let total = area1 + area2;
                (parent_target * area1 / total, parent_target * area2 / total)
            }
            TargetAreaSplit::ResetToArea => (area1, area2),
        };
        {
            let c = self.cell_mut(id)?;
            c.area = area1;
            c.target_area = target1;
        }
        {
            let c = self.cell_mut(daughter2)?;
            c.area = area2;
            c.target_area = target2;
        }

        if cfg.validate_after_commit {
            let mut touched = vec![id, daughter2];
            touched.extend(self.neighbor_indices(id)?);
            touched.extend(self.neighbor_indices(daughter2)?);
            touched.sort_unstable();
            touched.dedup();
            self.validate_cells(&touched)?;
        }

        info!(
            parent = id,
            daughter2,
            area1,
            area2,
            new_nodes = ?[node_a, node_b],
            "cell divided"
        );

        Ok(Division {
            parent,
            daughter1: id,
            daughter2,
            new_nodes: [node_a, node_b],
            dividing_wall: dividing,
            axis: plan.axis,
            policy_fallback: None,
        })
    }
}

fn missing_wall(cell: CellId, wall: WallId) -> TissueError {
    TissueError::InvalidTopology(format!("wall {wall} is not on the boundary of cell {cell}"))
}
