//! Immutable run result.

use std::time::Duration;

use crate::engine::Strategy;
use crate::error::Unsatisfied;
use crate::model::{AttributeSet, ConsumerId, LeaderSkill, PieceId, Position};
use crate::solver::SolverStatus;

/// Final state of one consumer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumerReport {
    pub consumer: ConsumerId,
    pub name: String,
    /// In the consumer's position order; empty when incomplete.
    pub assignment: Vec<(Position, PieceId)>,
    /// Final attributes; `None` when incomplete.
    pub attributes: Option<AttributeSet>,
    pub objective: f64,
    /// Why the consumer is incomplete.
    pub failure: Option<Unsatisfied>,
}

impl ConsumerReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Aggregates of one team.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeamSummary {
    pub name: String,
    pub leader: Option<ConsumerId>,
    pub leader_skill: Option<LeaderSkill>,
    /// Attributes the leader skill adds, summed over the team.
    pub leader_bonus: AttributeSet,
    pub objective: f64,
}

/// Snapshot of one completed run. Fields are read-only.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizationResult {
    pub(crate) label: String,
    pub(crate) requested: Strategy,
    pub(crate) strategy: Strategy,
    pub(crate) consumers: Vec<ConsumerReport>,
    pub(crate) teams: Vec<TeamSummary>,
    pub(crate) objective: f64,
    pub(crate) history: Vec<f64>,
    pub(crate) solver_status: Option<SolverStatus>,
    pub(crate) elapsed: Duration,
    pub(crate) cancelled: bool,
}

impl OptimizationResult {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Strategy asked for in the configuration.
    pub fn requested_strategy(&self) -> Strategy {
        self.requested
    }

    /// Strategy that actually ran.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// One report per roster entry, in declaration order.
    pub fn consumers(&self) -> &[ConsumerReport] {
        &self.consumers
    }

    pub fn consumer(&self, id: ConsumerId) -> Option<&ConsumerReport> {
        self.consumers.iter().find(|c| c.consumer == id)
    }

    pub fn teams(&self) -> &[TeamSummary] {
        &self.teams
    }

    /// Summed objective of complete consumers.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn completed(&self) -> usize {
        self.consumers.iter().filter(|c| c.is_complete()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.consumers.iter().all(|c| c.is_complete())
    }

    /// Incomplete consumers with their diagnosis.
    pub fn failures(&self) -> impl Iterator<Item = (ConsumerId, &Unsatisfied)> + '_ {
        self.consumers
            .iter()
            .filter_map(|c| c.failure.as_ref().map(|f| (c.consumer, f)))
    }

    /// Summed objective after each pass.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn solver_status(&self) -> Option<SolverStatus> {
        self.solver_status
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
}
