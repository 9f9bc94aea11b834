//! Exact allocation search.
//!
//! An [`AllocationModel`] lists, for each consumer, the slots to fill and the
//! candidate pieces per slot, together with set demands, attribute bounds and
//! turn-order links. [`BranchAndBoundSolver`] searches it jointly so that no
//! piece is used twice.

mod branch;
mod model;
mod types;

pub use branch::BranchAndBoundSolver;
pub use model::{AllocationModel, Candidate, ModelLink, ModelMember, ModelSlot};
pub use types::{AllocationSolver, SolverConfig, SolverSolution, SolverStatus};
