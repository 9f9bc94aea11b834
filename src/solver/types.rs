//! Solver interface.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::model::AllocationModel;
use crate::pool::PieceIdx;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    /// Search space exhausted; the solution is optimal.
    Optimal,
    /// A solution was found but optimality is not proven.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// Time limit reached before any solution was found.
    Timeout,
    /// Stopped (e.g. cancelled) before any solution was found.
    Unknown,
}

/// Solution from an [`AllocationSolver`].
#[derive(Debug, Clone)]
pub struct SolverSolution {
    pub status: SolverStatus,
    /// Summed objective of completed members.
    pub objective_value: Option<f64>,
    /// Chosen pieces per member, aligned with the model's slots. `None` for
    /// members left out.
    pub loadouts: Vec<Option<Vec<PieceIdx>>>,
    /// Whether the time limit cut the search short.
    pub timed_out: bool,
    pub nodes: u64,
    pub solve_time_ms: i64,
}

impl SolverSolution {
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            loadouts: Vec::new(),
            timed_out: false,
            nodes: 0,
            solve_time_ms: 0,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    pub fn completed(&self) -> usize {
        self.loadouts.iter().filter(|l| l.is_some()).count()
    }
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds.
    pub time_limit_ms: i64,
    /// Number of parallel workers.
    pub num_workers: usize,
    /// Stop after finding the first feasible solution.
    pub stop_after_first: bool,
    /// Checked at node boundaries.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            num_workers: 1,
            stop_after_first: false,
            cancel: None,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Trait for allocation solver implementations.
pub trait AllocationSolver {
    /// Solves the model and returns the best solution found.
    fn solve(&self, model: &AllocationModel<'_>, config: &SolverConfig) -> SolverSolution;
}
