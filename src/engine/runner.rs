//! Engine entry point.
//!
//! [`Engine`] runs the whole pipeline: pool preparation → feasibility →
//! ordering overlay → strategy → invariant check → result.

use std::collections::HashSet;
use std::time::Instant;

use crate::error::{AllocError, Result};
use crate::feasibility;
use crate::model::{Roster, Team};
use crate::ordering;
use crate::pool::Pool;
use crate::result::{OptimizationResult, ResultBuilder, RunSummary};
use crate::scoring::{Scorer, ScoringConfig};

use super::config::{EngineConfig, Strategy};
use super::context::RunContext;
use super::global::GlobalStrategy;
use super::greedy::GreedyStrategy;
use super::progress::{ProgressEvent, ProgressPhase, RunControl};
use super::refine::RefineStrategy;
use super::screen::ScreenStrategy;
use super::types::{Allocation, AssignmentStrategy};

/// Finished run: the result and the pool, with every assigned piece
/// committed to its consumer.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: OptimizationResult,
    pub pool: Pool,
}

/// Implementation of a strategy.
pub fn strategy_impl(strategy: Strategy) -> Box<dyn AssignmentStrategy> {
    match strategy {
        Strategy::Greedy => Box::new(GreedyStrategy),
        Strategy::Refine => Box::new(RefineStrategy),
        Strategy::Global => Box::new(GlobalStrategy),
        Strategy::Screened => Box::new(ScreenStrategy),
    }
}

/// Allocation engine.
///
/// # Usage
///
/// ```
/// use u_loadout::engine::{Engine, EngineConfig, QualityProfile};
/// use u_loadout::model::{
///     AttributeSet, Consumer, EligibilityRules, Element, EquipmentPiece, Roster, SetTag, Stat,
///     StatRoll, Substat,
/// };
/// use u_loadout::pool::Pool;
/// use u_loadout::scoring::ScoringConfig;
///
/// let pieces = (1..=6u8)
///     .map(|slot| {
///         EquipmentPiece::rune(slot as u64, slot, SetTag::Energy, StatRoll::stat(Stat::HpFlat, 100))
///             .with_secondary(Substat::stat(Stat::Spd, 5))
///     })
///     .collect();
/// let pool = Pool::new(pieces).unwrap();
/// let roster = Roster::new().with(
///     Consumer::new(1, "veromos", Element::Dark, AttributeSet::base(9_000, 600, 500, 100)),
///     EligibilityRules::default(),
/// );
///
/// let engine = Engine::new(
///     ScoringConfig::default(),
///     EngineConfig::from_profile(QualityProfile::Fast),
/// )
/// .unwrap();
/// let outcome = engine.run(&roster, &[], pool).unwrap();
/// assert!(outcome.result.is_complete());
/// assert_eq!(outcome.pool.available_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    scorer: Scorer,
    config: EngineConfig,
}

impl Engine {
    pub fn new(scoring: ScoringConfig, config: EngineConfig) -> Result<Self> {
        scoring.validate().map_err(AllocError::InvalidConfig)?;
        config.validate().map_err(AllocError::InvalidConfig)?;
        Ok(Self {
            scorer: Scorer::new(scoring),
            config,
        })
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run(&self, roster: &Roster, teams: &[Team], pool: Pool) -> Result<RunOutcome> {
        self.run_with_control(roster, teams, pool, &RunControl::default())
    }

    /// Runs with a cancellation flag and progress observer.
    ///
    /// The pool must not have committed pieces. Fails with
    /// [`AllocError::Infeasible`] before committing anything when the
    /// feasibility validator finds a shortfall.
    pub fn run_with_control(
        &self,
        roster: &Roster,
        teams: &[Team],
        mut pool: Pool,
        control: &RunControl,
    ) -> Result<RunOutcome> {
        let start = Instant::now();
        let config = &self.config;

        if pool.committed().next().is_some() {
            return Err(AllocError::InvalidConfig(
                "pool already has committed pieces".into(),
            ));
        }
        let excluded = pool.exclude(&config.excluded);
        let pruned = match config.top_per_set {
            Some(n) => {
                let keep: Vec<_> = roster
                    .entries()
                    .iter()
                    .flat_map(|e| e.rules.locked.iter().map(|&(_, id)| id))
                    .collect();
                pool.prune_top_per_set(n, &self.scorer, &keep)
            }
            None => 0,
        };

        let report = feasibility::validate(roster, teams, &pool);
        if !report.is_feasible() {
            tracing::warn!(shortfalls = report.len(), "input is infeasible");
            return Err(AllocError::Infeasible(report));
        }
        let resolved = ordering::resolve(roster, teams, &config.ticks)?;

        let requested = config.strategy;
        let strategy = requested.resolve(config.accelerated());
        if strategy != requested {
            tracing::warn!(
                requested = requested.name(),
                using = strategy.name(),
                "accelerator unavailable, falling back"
            );
        }
        tracing::info!(
            label = %config.label,
            strategy = strategy.name(),
            consumers = roster.len(),
            pieces = pool.available_count(),
            excluded,
            pruned,
            "run started"
        );

        let ctx = RunContext::new(&self.scorer, config, roster, teams, &resolved, &pool)?;
        let allocation = strategy_impl(strategy).assign(&ctx, &mut pool, control)?;
        check_invariants(&ctx, &pool, &allocation)?;

        let summary = RunSummary {
            label: config.label.clone(),
            requested,
            strategy,
            failures: allocation.failures.clone(),
            history: allocation.history.clone(),
            solver_status: allocation.solver_status,
            elapsed: start.elapsed(),
            cancelled: allocation.cancelled,
        };
        let result = ResultBuilder::new(&self.scorer, roster, teams, &resolved).build(&pool, summary)?;

        control.emit(ProgressEvent {
            phase: ProgressPhase::Finished,
            pass: result.history().len(),
            consumers_completed: result.completed(),
            consumers_total: roster.len(),
            best_objective: result.objective(),
        });
        tracing::info!(
            label = %config.label,
            strategy = strategy.name(),
            completed = result.completed(),
            objective = result.objective(),
            elapsed_ms = result.elapsed().as_millis() as u64,
            cancelled = result.cancelled(),
            "run finished"
        );
        Ok(RunOutcome { result, pool })
    }
}

/// Every consumer has exactly one of a loadout or a diagnosis, no piece is
/// used twice, and the pool agrees with the allocation.
fn check_invariants(ctx: &RunContext<'_>, pool: &Pool, allocation: &Allocation) -> Result<()> {
    let violation = |msg: String| Err(AllocError::InvariantViolation(msg));
    if allocation.assignments.len() != ctx.len() || allocation.failures.len() != ctx.len() {
        return violation("allocation does not cover the roster".into());
    }

    let mut seen = HashSet::new();
    for m in 0..ctx.len() {
        let id = ctx.consumer(m).id;
        match (&allocation.assignments[m], &allocation.failures[m]) {
            (Some(_), Some(_)) => return violation(format!("{} is both assigned and failed", id)),
            (None, None) => return violation(format!("{} has neither a loadout nor a diagnosis", id)),
            (None, Some(_)) => {}
            (Some(assignment), None) => {
                if assignment.pieces.len() != ctx.member(m).positions.len() {
                    return violation(format!("{} has an incomplete loadout", id));
                }
                for &(_, idx) in &assignment.pieces {
                    if !seen.insert(idx) {
                        return violation(format!("piece {} is assigned twice", ctx.piece(idx).id));
                    }
                    if pool.owner(idx) != Some(id) {
                        return violation(format!(
                            "piece {} is assigned to {} but not committed to it",
                            ctx.piece(idx).id,
                            id
                        ));
                    }
                }
            }
        }
    }
    if pool.committed().count() != seen.len() {
        return violation("pool holds commitments the allocation does not record".into());
    }
    Ok(())
}
