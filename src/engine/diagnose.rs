//! Names the constraint that keeps a consumer incomplete.

use crate::error::Unsatisfied;
use crate::model::{Attribute, SetTag};
use crate::pool::PoolSnapshot;

use super::context::{ActiveBound, RunContext};

/// Checks, in order: every position has an available candidate, some set
/// demand can still be supplied, every bound is reachable on its own. When
/// all hold the combination itself failed.
pub(crate) fn diagnose(
    ctx: &RunContext<'_>,
    m: usize,
    snapshot: &PoolSnapshot,
    bounds: &[ActiveBound],
    timed_out: bool,
) -> Unsatisfied {
    let member = ctx.member(m);
    let rules = ctx.rules(m);

    for (s, &position) in member.positions.iter().enumerate() {
        let open = ctx
            .candidates(m, s)
            .iter()
            .any(|c| snapshot.is_available(c.piece));
        if open {
            continue;
        }
        if let Some(piece) = rules.locked_piece(position) {
            return Unsatisfied::LockedUnavailable { position, piece };
        }
        if let Some(allowed) = rules.allowed_primaries(position) {
            let any_at_position = snapshot
                .available()
                .any(|i| snapshot.piece(i).position == position);
            if any_at_position {
                return Unsatisfied::PrimaryUnavailable {
                    position,
                    allowed: allowed.to_vec(),
                };
            }
        }
        return Unsatisfied::EmptyPosition { position };
    }

    // Slots that can still supply each tag.
    let supply = |tag: SetTag| -> usize {
        (0..member.positions.len())
            .filter(|&s| {
                ctx.candidates(m, s)
                    .iter()
                    .any(|c| snapshot.is_available(c.piece) && ctx.piece(c.piece).set == Some(tag))
            })
            .count()
    };
    if !member.demands.is_empty() {
        let mut first_gap = None;
        let feasible = member.demands.iter().any(|demand| {
            let gap = demand
                .pieces
                .iter()
                .find(|&&(tag, need)| supply(tag) < need as usize)
                .copied();
            if first_gap.is_none() {
                first_gap = gap;
            }
            gap.is_none()
        });
        if let (false, Some((tag, required))) = (feasible, first_gap) {
            return Unsatisfied::SetUnavailable {
                tag,
                required,
                available: supply(tag).min(u8::MAX as usize) as u8,
            };
        }
    }

    let scorer = ctx.scorer();
    let consumer = ctx.consumer(m);
    let start = scorer.final_attributes(consumer, &[], member.leader.as_ref());
    let rune_slots = member.positions.iter().filter(|p| p.is_rune()).count();

    for active in bounds {
        let attribute = active.bound.attribute;
        let a = attribute.index();
        let (lo, hi) = active.bound.final_limits(&consumer.base);
        let mut best = start[attribute] as f64 + set_headroom(ctx, m, attribute, rune_slots);
        let mut lowest = start[attribute] as f64;
        for s in 0..member.positions.len() {
            let deltas = ctx
                .candidates(m, s)
                .iter()
                .filter(|c| snapshot.is_available(c.piece))
                .map(|c| c.delta[a]);
            let (max, min) = deltas.fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), d| {
                (hi.max(d), lo.min(d))
            });
            best += max;
            lowest += min;
        }
        let best = best.floor() as i64;
        let lowest = lowest.ceil() as i64;

        if let Some(required) = lo.filter(|&required| best < required) {
            return match active.partner {
                Some(other) => Unsatisfied::OrderingUnreachable {
                    other,
                    faster: true,
                    limit: required,
                },
                None => Unsatisfied::FloorUnreachable {
                    attribute,
                    required,
                    best,
                },
            };
        }
        if let Some(limit) = hi.filter(|&limit| lowest > limit) {
            return match active.partner {
                Some(other) => Unsatisfied::OrderingUnreachable {
                    other,
                    faster: false,
                    limit,
                },
                None => Unsatisfied::CeilingExceeded {
                    attribute,
                    limit,
                    lowest,
                },
            };
        }
    }

    if timed_out {
        Unsatisfied::BudgetExhausted
    } else {
        Unsatisfied::CombinationNotFound
    }
}

/// Largest gain set bonuses could add to `attribute`.
fn set_headroom(ctx: &RunContext<'_>, m: usize, attribute: Attribute, rune_slots: usize) -> f64 {
    let scorer = ctx.scorer();
    let base = &ctx.consumer(m).base;
    scorer
        .config()
        .sets
        .bonuses
        .iter()
        .map(|&(tag, _)| {
            let activations = rune_slots / tag.size().pieces() as usize;
            scorer.set_delta(base, tag)[attribute.index()].max(0.0) * activations as f64
        })
        .fold(0.0, f64::max)
}
