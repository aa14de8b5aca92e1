//! Ordered rule tables for cell-fate decisions.
//!
//! A model's branching on neighbor types is written as data: a list of
//! `(predicate, outcome)` pairs tried in order, the first match winning.

use crate::types::CellId;
use std::collections::BTreeSet;

/// Something that can be tested against facts of type `F`.
pub trait Predicate<F: ?Sized> {
    fn holds(&self, facts: &F) -> bool;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rule<P, O> {
    pub when: P,
    pub then: O,
}

/// First-match-wins list of rules.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleTable<P, O> {
    rules: Vec<Rule<P, O>>,
}

impl<P, O> Default for RuleTable<P, O> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<P, O> RuleTable<P, O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::push`].
    pub fn with(mut self, when: P, then: O) -> Self {
        self.push(when, then);
        self
    }

    pub fn push(&mut self, when: P, then: O) {
        self.rules.push(Rule { when, then });
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Outcome of the first rule whose predicate holds.
    pub fn first_match<F: ?Sized>(&self, facts: &F) -> Option<&O>
    where
        P: Predicate<F>,
    {
        self.rules
            .iter()
            .find(|r| r.when.holds(facts))
            .map(|r| &r.then)
    }
}

/// Facts about one cell a transition rule may test.
#[derive(Clone, Copy, Debug)]
pub struct CellFacts<'a> {
    pub cell_type: i32,
    /// `(id, cell_type)` of each neighbor.
    pub neighbors: &'a [(CellId, i32)],
}

/// A test over a cell's neighbors.
#[derive(Clone, Debug, PartialEq)]
pub enum NeighborTest {
    Always,
    TouchesType(i32),
    TouchesAnyOf(BTreeSet<CellId>),
    TouchesCell(CellId),
    Not(Box<NeighborTest>),
    AllOf(Vec<NeighborTest>),
}

impl NeighborTest {
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn matches(&self, neighbors: &[(CellId, i32)]) -> bool {
        match self {
            Self::Always => true,
            Self::TouchesType(t) => neighbors.iter().any(|(_, nt)| nt == t),
            Self::TouchesAnyOf(set) => neighbors.iter().any(|(n, _)| set.contains(n)),
            Self::TouchesCell(id) => neighbors.iter().any(|(n, _)| n == id),
            Self::Not(inner) => !inner.matches(neighbors),
            Self::AllOf(all) => all.iter().all(|t| t.matches(neighbors)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    Any,
    Is(i32),
}

impl TypeFilter {
    pub fn accepts(self, cell_type: i32) -> bool {
        match self {
            Self::Any => true,
            Self::Is(t) => t == cell_type,
        }
    }
}

/// Matches a cell of a given type whose neighbors pass a test.
#[derive(Clone, Debug, PartialEq)]
pub struct CellTypeRule {
    pub from: TypeFilter,
    pub neighbors: NeighborTest,
}

impl Predicate<CellFacts<'_>> for CellTypeRule {
    fn holds(&self, facts: &CellFacts<'_>) -> bool {
        self.from.accepts(facts.cell_type) && self.neighbors.matches(facts.neighbors)
    }
}

/// Maps a cell to the type it should become.
pub type TransitionTable = RuleTable<CellTypeRule, i32>;
