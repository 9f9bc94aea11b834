//! Screening front-end: many serving orders scored in parallel, the best
//! few refined, the winner adopted.
//!
//! Each variant is a permutation of the consumers. Its greedy allocation is
//! simulated on a private sandbox of the pool snapshot, so the live pool is
//! untouched until the winner is committed.

use std::collections::HashSet;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::pool::{Pool, PoolSnapshot};

use super::config::Strategy;
use super::context::RunContext;
use super::greedy::greedy_pass;
use super::progress::{ProgressEvent, ProgressPhase, RunControl};
use super::refine::refine;
use super::types::{Allocation, AssignmentStrategy};

#[derive(Debug, Clone)]
struct Variant {
    order: Vec<usize>,
    completed: usize,
    objective: f64,
}

impl Variant {
    fn cmp_quality(&self, other: &Self) -> std::cmp::Ordering {
        other
            .completed
            .cmp(&self.completed)
            .then(other.objective.total_cmp(&self.objective))
            .then_with(|| self.order.cmp(&other.order))
    }
}

/// Serving orders for one cycle. The first cycle starts with the priority
/// order and its reverse; the rest are shuffles, or swap mutations of
/// current elites once there are some.
fn variants(base: &[usize], elites: &[Variant], batch: usize, first: bool, rng: &mut StdRng) -> Vec<Vec<usize>> {
    let mut out: Vec<Vec<usize>> = Vec::with_capacity(batch);
    if first {
        out.push(base.to_vec());
        out.push(base.iter().rev().copied().collect());
    }
    let n = base.len();
    while out.len() < batch {
        let mut order = if !elites.is_empty() && rng.random_bool(0.5) {
            elites[rng.random_range(0..elites.len())].order.clone()
        } else {
            let mut o = base.to_vec();
            o.shuffle(rng);
            o
        };
        if n > 1 {
            let i = rng.random_range(0..n);
            let j = rng.random_range(0..n);
            order.swap(i, j);
        }
        out.push(order);
    }
    let mut seen = HashSet::with_capacity(out.len());
    out.retain(|o| seen.insert(o.clone()));
    out.truncate(batch);
    out
}

/// Simulated quality of one serving order, or `None` once `deadline` has
/// passed before the simulation could start.
fn simulate(
    ctx: &RunContext<'_>,
    snapshot: &PoolSnapshot,
    order: Vec<usize>,
    control: &RunControl,
    deadline: Instant,
) -> Result<Option<Variant>> {
    if Instant::now() >= deadline {
        return Ok(None);
    }
    let mut sandbox = snapshot.sandbox();
    let allocation = greedy_pass(ctx, &mut sandbox, &order, control)?;
    Ok(Some(Variant {
        order,
        completed: allocation.completed(),
        objective: allocation.total_objective(),
    }))
}

#[cfg(feature = "parallel")]
fn simulate_all(
    ctx: &RunContext<'_>,
    snapshot: &PoolSnapshot,
    orders: Vec<Vec<usize>>,
    control: &RunControl,
    deadline: Instant,
) -> Result<Vec<Variant>> {
    let scored: Vec<Option<Variant>> = orders
        .into_par_iter()
        .map(|order| simulate(ctx, snapshot, order, control, deadline))
        .collect::<Result<_>>()?;
    Ok(scored.into_iter().flatten().collect())
}

#[cfg(not(feature = "parallel"))]
fn simulate_all(
    ctx: &RunContext<'_>,
    snapshot: &PoolSnapshot,
    orders: Vec<Vec<usize>>,
    control: &RunControl,
    deadline: Instant,
) -> Result<Vec<Variant>> {
    let mut scored = Vec::with_capacity(orders.len());
    for order in orders {
        match simulate(ctx, snapshot, order, control, deadline)? {
            Some(variant) => scored.push(variant),
            None => break,
        }
    }
    Ok(scored)
}

fn refine_finalist(
    ctx: &RunContext<'_>,
    snapshot: &PoolSnapshot,
    order: &[usize],
    control: &RunControl,
    deadline: Instant,
) -> Result<Allocation> {
    let mut sandbox = snapshot.sandbox();
    let mut allocation = greedy_pass(ctx, &mut sandbox, order, control)?;
    refine(ctx, &mut sandbox, &mut allocation, control, deadline)?;
    Ok(allocation)
}

pub(crate) fn screen(ctx: &RunContext<'_>, pool: &mut Pool, control: &RunControl) -> Result<Allocation> {
    let settings = &ctx.config().screening;
    let snapshot = pool.snapshot();
    let batch = settings.batch_size(ctx.len());
    let keep = settings.survivors(batch);
    let deadline = Instant::now() + ctx.config().batch_budget(ctx.len());
    let quiet = control.silent();
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut elites: Vec<Variant> = Vec::new();

    for cycle in 0..settings.cycles {
        if control.is_cancelled() || Instant::now() >= deadline {
            break;
        }
        let orders = variants(ctx.order(), &elites, batch, cycle == 0, &mut rng);
        let scored = simulate_all(ctx, &snapshot, orders, &quiet, deadline)?;
        elites.extend(scored);
        elites.sort_by(Variant::cmp_quality);
        elites.dedup_by(|a, b| a.order == b.order);
        elites.truncate(keep);

        if let Some(best) = elites.first() {
            tracing::debug!(cycle, batch, kept = elites.len(), best = best.objective, "screening cycle");
            control.emit(ProgressEvent {
                phase: ProgressPhase::Screening,
                pass: cycle + 1,
                consumers_completed: best.completed,
                consumers_total: ctx.len(),
                best_objective: best.objective,
            });
        }
    }

    let mut winner: Option<Allocation> = None;
    for elite in &elites {
        if winner.is_some() && (control.is_cancelled() || Instant::now() >= deadline) {
            break;
        }
        let candidate = refine_finalist(ctx, &snapshot, &elite.order, &quiet, deadline)?;
        if winner.as_ref().is_none_or(|w| candidate.is_better_than(w)) {
            winner = Some(candidate);
        }
    }

    let Some(mut allocation) = winner else {
        return greedy_pass(ctx, pool, ctx.order(), control);
    };
    for (m, assignment) in allocation.assignments.iter().enumerate() {
        if let Some(assignment) = assignment {
            ctx.commit(pool, m, assignment)?;
        }
    }
    allocation.cancelled |= control.is_cancelled();
    control.emit(ProgressEvent {
        phase: ProgressPhase::Refine,
        pass: allocation.history.len(),
        consumers_completed: allocation.completed(),
        consumers_total: ctx.len(),
        best_objective: allocation.total_objective(),
    });
    Ok(allocation)
}

/// Parallel screening of serving orders followed by refinement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenStrategy;

impl AssignmentStrategy for ScreenStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Screened
    }

    fn assign(&self, ctx: &RunContext<'_>, pool: &mut Pool, control: &RunControl) -> Result<Allocation> {
        screen(ctx, pool, control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cycle_starts_with_priority_order_and_reverse() {
        let mut rng = StdRng::seed_from_u64(7);
        let orders = variants(&[0, 1, 2, 3], &[], 16, true, &mut rng);
        assert_eq!(orders[0], vec![0, 1, 2, 3]);
        assert_eq!(orders[1], vec![3, 2, 1, 0]);
        assert!(orders.len() <= 16);
        let unique: HashSet<_> = orders.iter().collect();
        assert_eq!(unique.len(), orders.len());
        for o in &orders {
            let mut sorted = o.clone();
            sorted.sort();
            assert_eq!(sorted, vec![0, 1, 2, 3], "every variant is a permutation");
        }
    }

    #[test]
    fn test_variants_are_reproducible() {
        let a = variants(&[0, 1, 2, 3, 4], &[], 32, true, &mut StdRng::seed_from_u64(1));
        let b = variants(&[0, 1, 2, 3, 4], &[], 32, true, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_quality_order_prefers_completion() {
        let full = Variant { order: vec![1, 0], completed: 2, objective: 10.0 };
        let rich = Variant { order: vec![0, 1], completed: 1, objective: 99.0 };
        let mut v = vec![rich, full];
        v.sort_by(Variant::cmp_quality);
        assert_eq!(v[0].completed, 2);
    }
}
