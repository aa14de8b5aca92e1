//! Reference cell models.

mod cambium;
mod vertical;

pub use cambium::{
    BARK, CAMBIUM, CambiumModel, Daughter, PairFacts, PairOutcome, PairTest, RESTING,
};
pub use vertical::VerticalDivisionModel;
