use crate::{
    behavior::{CellBehavior, CellHandle},
    division::ParentInfo,
    rules::{CellFacts, Predicate, RuleTable, TransitionTable},
    types::CellId,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Cell type of dividing cambium cells.
pub const CAMBIUM: i32 = 3;
/// Cell type of bark-side cells produced by division.
pub const BARK: i32 = 1;
/// Cell type of resting cells.
pub const RESTING: i32 = 0;

/// Area below which a resting cell keeps growing, relative to its base area.
const RESTING_GROWTH_LIMIT: f64 = 0.8;

/// Which daughter of a division.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Daughter {
    First,
    Second,
}

/// What the pair rules know about two fresh daughters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PairFacts {
    pub d1_bark: bool,
    pub d2_bark: bool,
    pub d1_marker: bool,
    pub d2_marker: bool,
}

/// Pattern over [`PairFacts`]; `None` fields match anything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PairTest {
    pub d1_bark: Option<bool>,
    pub d2_bark: Option<bool>,
    pub d1_marker: Option<bool>,
    pub d2_marker: Option<bool>,
}

impl Predicate<PairFacts> for PairTest {
    fn holds(&self, facts: &PairFacts) -> bool {
        let ok = |want: Option<bool>, have: bool| want.is_none_or(|w| w == have);
        ok(self.d1_bark, facts.d1_bark)
            && ok(self.d2_bark, facts.d2_bark)
            && ok(self.d1_marker, facts.d1_marker)
            && ok(self.d2_marker, facts.d2_marker)
    }
}

/// New types for both daughters and which one joins the bark set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairOutcome {
    pub d1_type: i32,
    pub d2_type: i32,
    pub bark: Option<Daughter>,
}

/// Secondary growth of a stem: a cambium ring dividing between bark and
/// wood.
///
/// Cambium cells grow and divide once they reach
/// `rel_cell_div_threshold` times their base area. After each division
/// the daughter next to the bark becomes bark and joins the bark set,
/// the other stays cambium; which is which is decided by
/// [`Self::pair_rules`]. The bark set lives in the model, so two runs
/// never share it.
#[derive(Clone, Debug)]
pub struct CambiumModel {
    pub bark_cells: BTreeSet<CellId>,
    /// Cell whose contact breaks ties when both daughters touch bark.
    pub marker_cell: CellId,
    pub pair_rules: RuleTable<PairTest, PairOutcome>,
    /// Optional per-cell type changes applied during housekeeping.
    pub transitions: TransitionTable,
}

impl Default for CambiumModel {
    fn default() -> Self {
        Self {
            bark_cells: [
                0, 15, 27, 28, 21, 20, 29, 16, 17, 18, 19, 24, 25, 23, 22, 26, 14, 1,
            ]
            .into_iter()
            .collect(),
            marker_cell: 30,
            pair_rules: Self::default_pair_rules(),
            transitions: TransitionTable::new(),
        }
    }
}

impl CambiumModel {
    pub fn new(bark_cells: impl IntoIterator<Item = CellId>, marker_cell: CellId) -> Self {
        Self {
            bark_cells: bark_cells.into_iter().collect(),
            marker_cell,
            ..Self::default()
        }
    }

    pub fn default_pair_rules() -> RuleTable<PairTest, PairOutcome> {
        let both_bark = PairTest {
            d1_bark: Some(true),
            d2_bark: Some(true),
            ..PairTest::default()
        };
        RuleTable::new()
            .with(
                PairTest {
                    d1_marker: Some(true),
                    ..both_bark
                },
                PairOutcome {
                    d1_type: CAMBIUM,
                    d2_type: BARK,
                    bark: Some(Daughter::Second),
                },
            )
            .with(
                PairTest {
                    d2_marker: Some(true),
                    ..both_bark
                },
                PairOutcome {
                    d1_type: BARK,
                    d2_type: CAMBIUM,
                    bark: Some(Daughter::First),
                },
            )
            .with(
                both_bark,
                PairOutcome {
                    d1_type: BARK,
                    d2_type: CAMBIUM,
                    bark: Some(Daughter::First),
                },
            )
            .with(
                PairTest {
                    d1_bark: Some(true),
                    ..PairTest::default()
                },
                PairOutcome {
                    d1_type: BARK,
                    d2_type: CAMBIUM,
                    bark: Some(Daughter::First),
                },
            )
            .with(
                PairTest {
                    d2_bark: Some(true),
                    ..PairTest::default()
                },
                PairOutcome {
                    d1_type: CAMBIUM,
                    d2_type: BARK,
                    bark: Some(Daughter::Second),
                },
            )
    }

    fn touches_bark(&self, cell: &CellHandle<'_>) -> bool {
        cell.neighbor_indices().any(|n| self.bark_cells.contains(&n))
    }
}

impl CellBehavior for CambiumModel {
    fn model_id(&self) -> &str {
        "cambium"
    }

    fn cell_housekeeping(&mut self, cell: &mut CellHandle<'_>) {
        let rate = cell.config().cell_expansion_rate;
        match cell.cell_type() {
            CAMBIUM => {
                cell.enlarge_target_area(rate);
                if cell.area() > cell.config().rel_cell_div_threshold * cell.base_area() {
                    cell.divide();
                }
            }
            RESTING if cell.area() < RESTING_GROWTH_LIMIT * cell.base_area() => {
                debug!(
                    cell = cell.index(),
                    area = cell.area(),
                    base_area = cell.base_area(),
                    "resting cell below growth limit, enlarging"
                );
                cell.enlarge_target_area(rate);
            }
            _ => {}
        }

        let facts = CellFacts {
            cell_type: cell.cell_type(),
            neighbors: cell.neighbors(),
        };
        if let Some(&next) = self.transitions.first_match(&facts) {
            if next != cell.cell_type() {
                debug!(cell = cell.index(), from = cell.cell_type(), to = next, "type transition");
                cell.set_cell_type(next);
            }
        }
    }

    fn on_divide(
        &mut self,
        parent: &ParentInfo,
        daughter1: &mut CellHandle<'_>,
        daughter2: &mut CellHandle<'_>,
    ) {
        let facts = PairFacts {
            d1_bark: self.touches_bark(daughter1),
            d2_bark: self.touches_bark(daughter2),
            d1_marker: daughter1.touches_cell(self.marker_cell),
            d2_marker: daughter2.touches_cell(self.marker_cell),
        };
        if facts.d1_bark && facts.d2_bark && facts.d1_marker && facts.d2_marker {
            warn!(
                parent = parent.index,
                marker = self.marker_cell,
                "both daughters touch bark and the marker cell"
            );
        }

        let Some(&outcome) = self.pair_rules.first_match(&facts) else {
            debug!(parent = parent.index, ?facts, "no pair rule matched, types inherited");
            return;
        };
        daughter1.set_cell_type(outcome.d1_type);
        daughter2.set_cell_type(outcome.d2_type);
        match outcome.bark {
            Some(Daughter::First) => {
                self.bark_cells.insert(daughter1.index());
            }
            Some(Daughter::Second) => {
                self.bark_cells.insert(daughter2.index());
            }
            None => {}
        }
        debug!(
            parent = parent.index,
            d1 = daughter1.index(),
            d1_type = outcome.d1_type,
            d2 = daughter2.index(),
            d2_type = outcome.d2_type,
            bark_cells = self.bark_cells.len(),
            "cambium division typed"
        );
    }
}
