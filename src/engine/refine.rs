//! Local-search refinement of a committed allocation.
//!
//! Each pass visits the complete consumers in serving order and, per
//! position, applies the best strictly improving move:
//!
//! - **replace**: swap the committed piece for an available pool piece
//! - **swap**: exchange same-position pieces with another consumer
//!
//! A move is only taken when every constraint of every affected consumer
//! still holds, so the summed objective never decreases.

use std::time::Instant;

use crate::error::Result;
use crate::model::Attribute;
use crate::pool::{PieceIdx, Pool};

use super::config::Strategy;
use super::context::{assigned_spd, RunContext};
use super::greedy::greedy_pass;
use super::progress::{ProgressEvent, ProgressPhase, RunControl};
use super::types::{Allocation, Assignment, AssignmentStrategy};

const EPS: f64 = 1e-9;

enum Move {
    Replace {
        m: usize,
        slot: usize,
        next: Assignment,
    },
    Swap {
        m: usize,
        slot: usize,
        other: usize,
        other_slot: usize,
        mine: Assignment,
        theirs: Assignment,
    },
}

fn with_piece(assignment: &Assignment, slot: usize, piece: PieceIdx) -> Vec<PieceIdx> {
    let mut pieces: Vec<PieceIdx> = assignment.pieces.iter().map(|&(_, i)| i).collect();
    pieces[slot] = piece;
    pieces
}

/// Best strictly improving move for member `m` at `slot` during `pass`,
/// with its gain. Swap partners whose pass budget is spent are left alone.
fn best_move(
    ctx: &RunContext<'_>,
    pool: &Pool,
    allocation: &Allocation,
    m: usize,
    slot: usize,
    pass: usize,
) -> Option<(f64, Move)> {
    let current = allocation.assignments[m].as_ref()?;
    let held = current.pieces[slot].1;
    let position = current.pieces[slot].0;
    let spd_of = assigned_spd(&allocation.assignments);
    let bounds = ctx.active_bounds(m, &spd_of);
    let mut best: Option<(f64, Move)> = None;
    let beats = |gain: f64, best: &Option<(f64, Move)>| {
        gain > EPS && best.as_ref().is_none_or(|(g, _)| gain > *g + EPS)
    };

    for cand in ctx.candidates(m, slot) {
        if !pool.is_available(cand.piece) {
            continue;
        }
        let pieces = with_piece(current, slot, cand.piece);
        let (attrs, objective) = ctx.evaluate(m, &pieces);
        let gain = objective - current.objective;
        if beats(gain, &best) && ctx.satisfies(m, &pieces, &attrs, &bounds) {
            let next = ctx.assignment(m, pieces);
            best = Some((gain, Move::Replace { m, slot, next }));
        }
    }

    for (other, theirs) in allocation.assignments.iter().enumerate() {
        let Some(theirs) = theirs
            .as_ref()
            .filter(|_| other != m && ctx.member(other).passes as usize >= pass)
        else {
            continue;
        };
        let Some(other_slot) = theirs.pieces.iter().position(|&(p, _)| p == position) else {
            continue;
        };
        let offered = theirs.pieces[other_slot].1;
        if !ctx.is_candidate(m, slot, offered) || !ctx.is_candidate(other, other_slot, held) {
            continue;
        }
        let mine_pieces = with_piece(current, slot, offered);
        let their_pieces = with_piece(theirs, other_slot, held);
        let (mine_attrs, mine_obj) = ctx.evaluate(m, &mine_pieces);
        let (their_attrs, their_obj) = ctx.evaluate(other, &their_pieces);
        let gain = mine_obj + their_obj - current.objective - theirs.objective;
        if !beats(gain, &best) {
            continue;
        }
        let mine_spd = mine_attrs[Attribute::Spd];
        let their_spd = their_attrs[Attribute::Spd];
        let mine_bounds = ctx.active_bounds(m, |p| if p == other { Some(their_spd) } else { spd_of(p) });
        let their_bounds = ctx.active_bounds(other, |p| if p == m { Some(mine_spd) } else { spd_of(p) });
        if ctx.satisfies(m, &mine_pieces, &mine_attrs, &mine_bounds)
            && ctx.satisfies(other, &their_pieces, &their_attrs, &their_bounds)
        {
            best = Some((
                gain,
                Move::Swap {
                    m,
                    slot,
                    other,
                    other_slot,
                    mine: ctx.assignment(m, mine_pieces),
                    theirs: ctx.assignment(other, their_pieces),
                },
            ));
        }
    }
    best
}

fn apply(ctx: &RunContext<'_>, pool: &mut Pool, allocation: &mut Allocation, mv: Move) -> Result<()> {
    match mv {
        Move::Replace { m, slot, next } => {
            let id = ctx.consumer(m).id;
            let previous = allocation.assignments[m].as_ref().map(|a| a.pieces[slot].1);
            if let Some(previous) = previous {
                pool.release(previous, id)?;
            }
            pool.commit(next.pieces[slot].1, id)?;
            allocation.assignments[m] = Some(next);
        }
        Move::Swap {
            m,
            slot,
            other,
            other_slot,
            mine,
            theirs,
        } => {
            let id = ctx.consumer(m).id;
            let other_id = ctx.consumer(other).id;
            let given = theirs.pieces[other_slot].1;
            let taken = mine.pieces[slot].1;
            pool.release(given, id)?;
            pool.release(taken, other_id)?;
            pool.commit(taken, id)?;
            pool.commit(given, other_id)?;
            allocation.assignments[m] = Some(mine);
            allocation.assignments[other] = Some(theirs);
        }
    }
    Ok(())
}

/// Runs passes `2..=passes` over `allocation`, recording the summed
/// objective after each. Stops early after a pass without accepted moves,
/// at `deadline`, or on cancellation.
pub(crate) fn refine(
    ctx: &RunContext<'_>,
    pool: &mut Pool,
    allocation: &mut Allocation,
    control: &RunControl,
    deadline: Instant,
) -> Result<()> {
    let passes = ctx.config().passes as usize;

    for pass in 2..=passes {
        if control.is_cancelled() {
            allocation.cancelled = true;
            break;
        }
        if Instant::now() >= deadline {
            tracing::warn!(pass, "refinement budget exhausted");
            break;
        }

        let mut accepted = 0usize;
        for &m in ctx.order() {
            if (ctx.member(m).passes as usize) < pass || allocation.assignments[m].is_none() {
                continue;
            }
            for slot in 0..ctx.member(m).positions.len() {
                if let Some((_, mv)) = best_move(ctx, pool, allocation, m, slot, pass) {
                    apply(ctx, pool, allocation, mv)?;
                    accepted += 1;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        let total = allocation.total_objective();
        allocation.history.push(total);
        tracing::debug!(pass, accepted, total, "refinement pass");
        control.emit(ProgressEvent {
            phase: ProgressPhase::Refine,
            pass,
            consumers_completed: allocation.completed(),
            consumers_total: ctx.len(),
            best_objective: total,
        });
        if accepted == 0 {
            break;
        }
    }
    Ok(())
}

/// Greedy pass followed by refinement passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefineStrategy;

impl AssignmentStrategy for RefineStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Refine
    }

    fn assign(&self, ctx: &RunContext<'_>, pool: &mut Pool, control: &RunControl) -> Result<Allocation> {
        let deadline = Instant::now() + ctx.config().batch_budget(ctx.len());
        let mut allocation = greedy_pass(ctx, pool, ctx.order(), control)?;
        refine(ctx, pool, &mut allocation, control, deadline)?;
        Ok(allocation)
    }
}
