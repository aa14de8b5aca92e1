//! Vertex-based 2-D plant tissue simulation library.
//!
//! A tissue is a planar mesh of polygonal cells sharing walls and nodes.
//! Cells grow, divide along a line through their interior, and die; a
//! pluggable cell model decides when.
//!
//! Main components:
//! - [`mesh`] — the registry owning nodes, walls and cells, with
//!   adjacency queries, apoptosis and invariant checks.
//! - [`division`] — cutting a cell in two along a line or axis.
//! - [`geometry`] — polygon area, centroid, axes and intersection tests.
//! - [`behavior`] — the hook interface cell models implement.
//! - [`models`] — reference cell models.
//! - [`rules`] — ordered rule tables for cell-fate decisions.
//! - [`mechanics`] — seams to position relaxation and stress fields.
//! - [`phases`] — the relaxation, housekeeping and division phases.
//! - [`tissue`] — a running tissue stepping through the phases.
//! - [`generator`] — starting tissues.
//! - [`snapshot`] — serializable picture of a mesh.
//! - [`config`] — global configuration.
//! - [`error`] — error type shared by all fallible operations.
//! - [`types`] — shared type aliases and IDs.

pub mod behavior;
pub mod cell;
pub mod config;
pub mod division;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod mechanics;
pub mod mesh;
pub mod models;
pub mod node;
pub mod phases;
pub mod rules;
pub mod snapshot;
pub mod tissue;
pub mod types;
pub mod wall;

pub use behavior::{CellBehavior, CellHandle};
pub use cell::{Cell, DivisionPolicy};
pub use config::Config;
pub use division::{Division, ParentInfo};
pub use error::{TissueError, TissueResult};
pub use mesh::Mesh;
pub use tissue::{StepReport, Tissue};
