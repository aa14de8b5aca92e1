use serde::Deserialize;

/// How a parent's target area is shared between its daughters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAreaSplit {
    /// Each daughter gets the parent's target scaled by its share of the area.
    #[default]
    Proportional,
    /// Each daughter's target is reset to its own current area.
    ResetToArea,
}

/// Global configuration for growth and division.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target-area increment applied by growing cells each step.
    pub cell_expansion_rate: f64,
    /// Cells divide once `area > rel_cell_div_threshold * base_area`.
    pub rel_cell_div_threshold: f64,
    /// Stiffness given to newly created dividing walls.
    pub wall_stiffness: f64,
    pub target_area_split: TargetAreaSplit,
    /// Cuts closer than this fraction of a wall's length to either end
    /// are rejected as degenerate.
    pub min_cut_fraction: f64,
    /// Upper bound on committed divisions in one step, re-entrant
    /// requests included.
    pub max_divisions_per_step: usize,
    /// Re-check the local invariants after every commit.
    pub validate_after_commit: bool,
    pub rng_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cell_expansion_rate: 0.05,
            rel_cell_div_threshold: 2.0,
            wall_stiffness: 1.0,
            target_area_split: TargetAreaSplit::Proportional,
            min_cut_fraction: 1e-6,
            max_divisions_per_step: 256,
            validate_after_commit: true,
            rng_seed: 1,
        }
    }
}
