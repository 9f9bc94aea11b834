//! Joint assignment of every consumer in one model.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{Result, Unsatisfied};
use crate::pool::Pool;
use crate::solver::{
    AllocationModel, AllocationSolver, BranchAndBoundSolver, ModelLink, SolverConfig,
};

use super::config::Strategy;
use super::context::{assigned_spd, RunContext};
use super::diagnose::diagnose;
use super::greedy::greedy_pass;
use super::progress::{ProgressEvent, ProgressPhase, RunControl};
use super::types::{Allocation, AssignmentStrategy};

/// Time left for the joint solve once the warm start has spent `spent` of
/// the batch budget. Never below one millisecond, so the hint is still
/// checked and returned.
fn solver_budget(budget: Duration, spent: Duration) -> Duration {
    budget.saturating_sub(spent).max(Duration::from_millis(1))
}

/// Builds one [`AllocationModel`] over all consumers, warm-starts it with
/// a greedy allocation computed on a sandbox, and commits the solver's best
/// solution. Consumers the solution leaves out are diagnosed against the
/// remaining pool.
pub(crate) fn solve_global(ctx: &RunContext<'_>, pool: &mut Pool, control: &RunControl) -> Result<Allocation> {
    let snapshot = pool.snapshot();
    let order = ctx.order();
    let started = Instant::now();

    let mut sandbox = snapshot.sandbox();
    let warm = greedy_pass(ctx, &mut sandbox, order, &control.silent())?;

    let mut model = AllocationModel::new(ctx.config().label.clone(), ctx.scorer(), &snapshot)
        .with_incomplete(true);
    let mut seat: HashMap<usize, usize> = HashMap::with_capacity(order.len());
    for &m in order {
        let member = ctx.build_member(m, &snapshot, ctx.member(m).bounds.clone());
        seat.insert(m, model.add_member(member));
    }
    for link in ctx.links() {
        let faster = ctx.index_of(link.faster).and_then(|m| seat.get(&m).copied());
        let slower = ctx.index_of(link.slower).and_then(|m| seat.get(&m).copied());
        if let (Some(faster), Some(slower)) = (faster, slower) {
            model.add_link(ModelLink {
                faster,
                slower,
                link: *link,
            });
        }
    }
    let hint = order
        .iter()
        .map(|&m| {
            warm.assignments[m]
                .as_ref()
                .map(|a| a.pieces.iter().map(|&(_, i)| i).collect())
        })
        .collect();
    let model = model.with_hint(hint);

    let budget = ctx.config().batch_budget(order.len());
    let solve_budget = solver_budget(budget, started.elapsed());
    let config = SolverConfig::default()
        .with_time_limit_ms(solve_budget.as_millis() as i64)
        .with_workers(ctx.config().workers)
        .with_cancel(control.cancel_token());
    let solution = BranchAndBoundSolver.solve(&model, &config);
    tracing::debug!(
        status = ?solution.status,
        nodes = solution.nodes,
        ms = solution.solve_time_ms,
        "joint model solved"
    );
    if solution.timed_out {
        tracing::warn!(budget_ms = budget.as_millis() as u64, "joint model hit its time budget");
    }

    let mut allocation = Allocation::new(ctx.len());
    allocation.solver_status = Some(solution.status);
    if solution.is_solution_found() {
        for (k, &m) in order.iter().enumerate() {
            if let Some(pieces) = solution.loadouts.get(k).cloned().flatten() {
                let assignment = ctx.assignment(m, pieces);
                ctx.commit(pool, m, &assignment)?;
                allocation.assignments[m] = Some(assignment);
            }
        }
    }

    allocation.cancelled = control.is_cancelled();
    let remaining = pool.snapshot();
    for &m in order {
        if allocation.assignments[m].is_some() {
            continue;
        }
        let reason = if allocation.cancelled {
            Unsatisfied::Cancelled
        } else if solution.timed_out {
            Unsatisfied::BudgetExhausted
        } else {
            let bounds = ctx.active_bounds(m, assigned_spd(&allocation.assignments));
            diagnose(ctx, m, &remaining, &bounds, false)
        };
        tracing::debug!(consumer = %ctx.consumer(m).id, %reason, "unsatisfied");
        allocation.failures[m] = Some(reason);
    }

    let total = allocation.total_objective();
    allocation.history.push(total);
    control.emit(ProgressEvent {
        phase: ProgressPhase::Global,
        pass: 1,
        consumers_completed: allocation.completed(),
        consumers_total: ctx.len(),
        best_objective: total,
    });
    Ok(allocation)
}

/// Joint branch-and-bound over every consumer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalStrategy;

impl AssignmentStrategy for GlobalStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Global
    }

    fn assign(&self, ctx: &RunContext<'_>, pool: &mut Pool, control: &RunControl) -> Result<Allocation> {
        solve_global(ctx, pool, control)
    }
}
