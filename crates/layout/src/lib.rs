//! Layout engines for lineage graphs.
//!
//! Two independent engines work on string-keyed nodes:
//!
//! * [`ForceController`] runs a physics simulation with a settle, freeze and
//!   reorganize lifecycle.
//! * [`hierarchical::layout`] places nodes left to right in rank columns
//!   using the layered (dagre) algorithm, with a grouped grid fallback.

pub mod force;
pub mod grid;
pub mod hierarchical;
pub mod simulation;
pub mod types;

pub use force::{ForceBody, ForceController, FreezeState};
pub use grid::GroupedGrid;
pub use hierarchical::assign_columns;
pub use simulation::{Body, ForceConfig, Simulation};
pub use types::*;
