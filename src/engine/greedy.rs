//! Sequential greedy assignment.

use crate::error::{Result, Unsatisfied};
use crate::pool::Pool;
use crate::solver::{AllocationModel, AllocationSolver, BranchAndBoundSolver, SolverConfig};

use super::config::Strategy;
use super::context::{assigned_spd, RunContext};
use super::diagnose::diagnose;
use super::progress::{ProgressEvent, ProgressPhase, RunControl};
use super::types::{Allocation, Assignment, AssignmentStrategy};

/// Finds the first loadout for member `m` that satisfies every constraint,
/// trying candidates in descending gain per position.
pub(crate) fn fit_one(
    ctx: &RunContext<'_>,
    m: usize,
    pool: &Pool,
    assignments: &[Option<Assignment>],
    control: &RunControl,
) -> std::result::Result<Assignment, Unsatisfied> {
    let snapshot = pool.snapshot();
    let bounds = ctx.active_bounds(m, assigned_spd(assignments));
    let member = ctx.build_member(m, &snapshot, bounds.iter().map(|b| b.bound).collect());

    let mut model = AllocationModel::new(ctx.consumer(m).name.clone(), ctx.scorer(), &snapshot);
    model.add_member(member);
    let config = SolverConfig::default()
        .with_time_limit_ms(ctx.config().time_per_consumer.as_millis() as i64)
        .with_stop_after_first(true)
        .with_cancel(control.cancel_token());
    let solution = BranchAndBoundSolver.solve(&model, &config);

    match solution.loadouts.into_iter().next().flatten() {
        Some(pieces) => Ok(ctx.assignment(m, pieces)),
        None if control.is_cancelled() => Err(Unsatisfied::Cancelled),
        None => Err(diagnose(ctx, m, &snapshot, &bounds, solution.timed_out)),
    }
}

/// Serves `order` one consumer at a time, committing each loadout to `pool`.
pub(crate) fn greedy_pass(
    ctx: &RunContext<'_>,
    pool: &mut Pool,
    order: &[usize],
    control: &RunControl,
) -> Result<Allocation> {
    let mut allocation = Allocation::new(ctx.len());

    for (served, &m) in order.iter().enumerate() {
        if control.is_cancelled() {
            allocation.cancelled = true;
            for &rest in &order[served..] {
                allocation.failures[rest] = Some(Unsatisfied::Cancelled);
            }
            break;
        }
        if ctx.config().fail_fast && allocation.has_failure() {
            allocation.failures[m] = Some(Unsatisfied::Skipped);
            continue;
        }

        let consumer = ctx.consumer(m);
        match fit_one(ctx, m, pool, &allocation.assignments, control) {
            Ok(assignment) => {
                ctx.commit(pool, m, &assignment)?;
                tracing::debug!(consumer = %consumer.id, objective = assignment.objective, "assigned");
                allocation.assignments[m] = Some(assignment);
            }
            Err(reason) => {
                tracing::debug!(consumer = %consumer.id, %reason, "unsatisfied");
                allocation.cancelled |= reason == Unsatisfied::Cancelled;
                allocation.failures[m] = Some(reason);
            }
        }

        control.emit(ProgressEvent {
            phase: ProgressPhase::Greedy,
            pass: 1,
            consumers_completed: allocation.completed(),
            consumers_total: ctx.len(),
            best_objective: allocation.total_objective(),
        });
    }

    allocation.history.push(allocation.total_objective());
    Ok(allocation)
}

/// Single greedy pass in serving order.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyStrategy;

impl AssignmentStrategy for GreedyStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Greedy
    }

    fn assign(&self, ctx: &RunContext<'_>, pool: &mut Pool, control: &RunControl) -> Result<Allocation> {
        greedy_pass(ctx, pool, ctx.order(), control)
    }
}
