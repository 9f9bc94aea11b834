//! Engine-side assignment types and the strategy interface.

use crate::error::{Result, Unsatisfied};
use crate::model::{AttributeSet, Position};
use crate::pool::{PieceIdx, Pool};
use crate::solver::SolverStatus;

use super::config::Strategy;
use super::context::RunContext;
use super::progress::RunControl;

/// One consumer's complete loadout as a strategy produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// In the consumer's position order.
    pub pieces: Vec<(Position, PieceIdx)>,
    pub attributes: AttributeSet,
    pub objective: f64,
}

/// Output of a strategy, indexed by roster declaration order.
///
/// Every consumer ends up with exactly one of an assignment or a failure.
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    pub assignments: Vec<Option<Assignment>>,
    pub failures: Vec<Option<Unsatisfied>>,
    /// Summed objective after each pass.
    pub history: Vec<f64>,
    pub solver_status: Option<SolverStatus>,
    pub cancelled: bool,
}

impl Allocation {
    pub fn new(consumers: usize) -> Self {
        Self {
            assignments: vec![None; consumers],
            failures: vec![None; consumers],
            ..Self::default()
        }
    }

    pub fn total_objective(&self) -> f64 {
        self.assignments.iter().flatten().map(|a| a.objective).sum()
    }

    pub fn completed(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_some()).count()
    }

    /// Lexicographic quality: completed consumers, then summed objective.
    pub fn key(&self) -> (usize, f64) {
        (self.completed(), self.total_objective())
    }

    pub(crate) fn is_better_than(&self, other: &Allocation) -> bool {
        let (c, o) = self.key();
        let (oc, oo) = other.key();
        c > oc || (c == oc && o > oo + 1e-9)
    }

    pub(crate) fn has_failure(&self) -> bool {
        self.failures.iter().any(|f| f.is_some())
    }
}

/// A strategy of the assignment engine.
///
/// Given the run context and exclusive access to the live pool, commit a
/// complete assignment for as many consumers as possible and diagnose the
/// rest. Pieces committed to the pool must match the returned assignments.
pub trait AssignmentStrategy: Send + Sync {
    fn kind(&self) -> Strategy;

    fn assign(&self, ctx: &RunContext<'_>, pool: &mut Pool, control: &RunControl) -> Result<Allocation>;
}
