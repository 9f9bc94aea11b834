//! Per-run view shared by every strategy.
//!
//! [`RunContext`] resolves each roster entry once (leader skill, objective
//! profile, required positions, set demands, authored plus derived bounds)
//! and precomputes the eligible candidates of every (consumer, position)
//! pair, so strategies only differ in how they search.

use std::collections::HashMap;

use crate::error::{AllocError, Result};
use crate::model::{
    set_counts, Attribute, AttributeBound, AttributeSet, Consumer, ConsumerId, EligibilityRules,
    EquipmentPiece, LeaderSkill, Position, Roster, SetDemand, Team,
};
use crate::ordering::{OrderingLink, ResolvedRules};
use crate::pool::{PieceIdx, Pool, PoolSnapshot};
use crate::scoring::{ObjectiveProfile, Scorer};
use crate::solver::{Candidate, ModelMember, ModelSlot};

use super::config::EngineConfig;
use super::types::Assignment;

/// Resolved view of one roster entry.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub team: Option<usize>,
    pub leader: Option<LeaderSkill>,
    pub profile: ObjectiveProfile,
    pub positions: Vec<Position>,
    pub demands: Vec<SetDemand>,
    /// Authored bounds followed by absolute derived ones.
    pub bounds: Vec<AttributeBound>,
    pub links: Vec<OrderingLink>,
    pub passes: u8,
}

/// A bound in force for one evaluation. `partner` is set when the bound
/// materializes a turn-order link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveBound {
    pub bound: AttributeBound,
    pub partner: Option<ConsumerId>,
}

pub struct RunContext<'r> {
    scorer: &'r Scorer,
    config: &'r EngineConfig,
    roster: &'r Roster,
    pieces: PoolSnapshot,
    members: Vec<MemberInfo>,
    by_id: HashMap<ConsumerId, usize>,
    order: Vec<usize>,
    links: Vec<OrderingLink>,
    /// `[member][slot]`, descending gain.
    candidates: Vec<Vec<Vec<Candidate>>>,
    /// `[member][slot]`, sorted for lookup.
    eligible: Vec<Vec<Vec<PieceIdx>>>,
}

impl<'r> RunContext<'r> {
    pub fn new(
        scorer: &'r Scorer,
        config: &'r EngineConfig,
        roster: &'r Roster,
        teams: &[Team],
        resolved: &ResolvedRules,
        pool: &Pool,
    ) -> Result<Self> {
        let entries = roster.entries();
        let by_id: HashMap<ConsumerId, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.consumer.id, i))
            .collect();

        let mut reserved: HashMap<PieceIdx, usize> = HashMap::new();
        for (m, entry) in entries.iter().enumerate() {
            for (_, id) in &entry.rules.locked {
                let idx = pool.lookup(*id).ok_or_else(|| {
                    AllocError::InvalidConfig(format!(
                        "{} pins piece {} which is not in the pool",
                        entry.consumer.id, id
                    ))
                })?;
                reserved.entry(idx).or_insert(m);
            }
        }

        let efficiency: Vec<f64> = pool.pieces().iter().map(|p| scorer.efficiency(p)).collect();
        let default_weights = &scorer.config().objective;
        let mut members = Vec::with_capacity(entries.len());
        let mut candidates = Vec::with_capacity(entries.len());
        let mut eligible = Vec::with_capacity(entries.len());

        for (m, entry) in entries.iter().enumerate() {
            let id = entry.consumer.id;
            let derived = resolved.derived(id);
            let profile = resolved.objective_profile(entry, default_weights);
            let positions = entry.rules.positions();
            let mut bounds = entry.rules.bounds.clone();
            bounds.extend(derived.bounds.iter().copied());

            let mut member_candidates = Vec::with_capacity(positions.len());
            let mut member_eligible = Vec::with_capacity(positions.len());
            for &position in &positions {
                let locked = entry
                    .rules
                    .locked_piece(position)
                    .and_then(|piece| pool.lookup(piece));
                let allowed = entry.rules.allowed_primaries(position);
                let mut list: Vec<Candidate> = pool
                    .indices()
                    .filter(|&idx| {
                        let piece = pool.piece(idx);
                        if piece.position != position {
                            return false;
                        }
                        match locked {
                            Some(l) => idx == l,
                            None => {
                                reserved.get(&idx).is_none_or(|&owner| owner == m)
                                    && allowed.is_none_or(|a| {
                                        piece.primary_stat().is_some_and(|s| a.contains(&s))
                                    })
                            }
                        }
                    })
                    .map(|idx| {
                        let piece = pool.piece(idx);
                        Candidate {
                            piece: idx,
                            gain: scorer.piece_gain(
                                &profile,
                                &entry.consumer.base,
                                efficiency[idx.index()],
                                piece,
                            ),
                            delta: scorer.piece_delta(&entry.consumer.base, piece),
                        }
                    })
                    .collect();
                list.sort_by(|a, b| b.gain.total_cmp(&a.gain).then(a.piece.cmp(&b.piece)));
                let mut ids: Vec<PieceIdx> = list.iter().map(|c| c.piece).collect();
                ids.sort();
                member_candidates.push(list);
                member_eligible.push(ids);
            }

            members.push(MemberInfo {
                team: roster.team_of(teams, id),
                leader: roster.leader_skill_for(teams, id),
                profile,
                positions,
                demands: entry.rules.set_demands(),
                bounds,
                links: derived.links.clone(),
                passes: entry.rules.passes,
            });
            candidates.push(member_candidates);
            eligible.push(member_eligible);
        }

        let order = serving_order(roster, teams, resolved, &by_id);

        Ok(Self {
            scorer,
            config,
            roster,
            pieces: pool.snapshot(),
            members,
            by_id,
            order,
            links: resolved.links().to_vec(),
            candidates,
            eligible,
        })
    }

    pub fn scorer(&self) -> &'r Scorer {
        self.scorer
    }

    pub fn config(&self) -> &'r EngineConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Serving order: roster indices by priority, declaration order, and
    /// turn sequence within ordered teams.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn member(&self, m: usize) -> &MemberInfo {
        &self.members[m]
    }

    pub fn consumer(&self, m: usize) -> &'r Consumer {
        &self.roster.entries()[m].consumer
    }

    pub fn rules(&self, m: usize) -> &'r EligibilityRules {
        &self.roster.entries()[m].rules
    }

    pub fn index_of(&self, id: ConsumerId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn links(&self) -> &[OrderingLink] {
        &self.links
    }

    pub fn piece(&self, idx: PieceIdx) -> &EquipmentPiece {
        self.pieces.piece(idx)
    }

    pub fn candidates(&self, m: usize, slot: usize) -> &[Candidate] {
        &self.candidates[m][slot]
    }

    pub fn is_candidate(&self, m: usize, slot: usize, idx: PieceIdx) -> bool {
        self.eligible[m][slot].binary_search(&idx).is_ok()
    }

    /// Final attributes and objective of member `m` wearing `pieces`.
    pub fn evaluate(&self, m: usize, pieces: &[PieceIdx]) -> (AttributeSet, f64) {
        let consumer = self.consumer(m);
        let member = &self.members[m];
        let refs: Vec<&EquipmentPiece> = pieces.iter().map(|&i| self.piece(i)).collect();
        let attrs = self
            .scorer
            .final_attributes(consumer, &refs, member.leader.as_ref());
        let objective = self.scorer.objective(&member.profile, consumer, &refs, &attrs);
        (attrs, objective)
    }

    /// Bounds of member `m`, with every turn-order link whose partner's SPD
    /// `spd_of` knows turned into a plain SPD bound.
    pub fn active_bounds(&self, m: usize, spd_of: impl Fn(usize) -> Option<i64>) -> Vec<ActiveBound> {
        let member = &self.members[m];
        let id = self.consumer(m).id;
        let mut out: Vec<ActiveBound> = member
            .bounds
            .iter()
            .map(|&bound| ActiveBound { bound, partner: None })
            .collect();
        for link in &member.links {
            let Some(partner) = link.partner(id) else {
                continue;
            };
            let Some(p) = self.index_of(partner) else {
                continue;
            };
            if let Some(bound) = spd_of(p).and_then(|spd| link.bound_for(id, spd)) {
                out.push(ActiveBound {
                    bound,
                    partner: Some(partner),
                });
            }
        }
        out
    }

    /// Set demands and every bound hold for `pieces`.
    pub fn satisfies(
        &self,
        m: usize,
        pieces: &[PieceIdx],
        attrs: &AttributeSet,
        bounds: &[ActiveBound],
    ) -> bool {
        let member = &self.members[m];
        if !member.demands.is_empty() {
            let refs: Vec<&EquipmentPiece> = pieces.iter().map(|&i| self.piece(i)).collect();
            let counts = set_counts(&refs);
            if !member.demands.iter().any(|d| d.is_met_by(&counts)) {
                return false;
            }
        }
        let base = &self.consumer(m).base;
        bounds.iter().all(|b| b.bound.is_satisfied(attrs, base))
    }

    pub fn assignment(&self, m: usize, pieces: Vec<PieceIdx>) -> Assignment {
        let (attributes, objective) = self.evaluate(m, &pieces);
        Assignment {
            pieces: self.members[m].positions.iter().copied().zip(pieces).collect(),
            attributes,
            objective,
        }
    }

    /// Solver view of member `m` over the pieces available in `snapshot`.
    pub fn build_member(
        &self,
        m: usize,
        snapshot: &PoolSnapshot,
        bounds: Vec<AttributeBound>,
    ) -> ModelMember<'r> {
        let member = &self.members[m];
        let slots = member
            .positions
            .iter()
            .enumerate()
            .map(|(s, &position)| ModelSlot {
                position,
                candidates: self.candidates[m][s]
                    .iter()
                    .filter(|c| snapshot.is_available(c.piece))
                    .copied()
                    .collect(),
            })
            .collect();
        ModelMember {
            consumer: self.consumer(m),
            leader: member.leader,
            profile: member.profile,
            slots,
            set_demands: member.demands.clone(),
            bounds,
        }
    }

    pub fn commit(&self, pool: &mut Pool, m: usize, assignment: &Assignment) -> Result<()> {
        let id = self.consumer(m).id;
        for &(_, idx) in &assignment.pieces {
            pool.commit(idx, id)?;
        }
        Ok(())
    }
}

/// SPD of every assigned member, for [`RunContext::active_bounds`].
pub(crate) fn assigned_spd(assignments: &[Option<Assignment>]) -> impl Fn(usize) -> Option<i64> + '_ {
    move |p| assignments[p].as_ref().map(|a| a.attributes[Attribute::Spd])
}

fn serving_order(
    roster: &Roster,
    teams: &[Team],
    resolved: &ResolvedRules,
    by_id: &HashMap<ConsumerId, usize>,
) -> Vec<usize> {
    let entries = roster.entries();
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&m| (entries[m].rules.priority, m));

    for t in 0..teams.len() {
        let sequence: Vec<usize> = resolved
            .turn_sequence(t)
            .iter()
            .filter_map(|id| by_id.get(id).copied())
            .collect();
        if sequence.len() < 2 {
            continue;
        }
        let seats: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(_, m)| sequence.contains(m))
            .map(|(seat, _)| seat)
            .collect();
        for (seat, m) in seats.into_iter().zip(sequence) {
            order[seat] = m;
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, PieceId, SetTag, Stat, StatRoll, Substat};
    use crate::ordering::{resolve, TickTable};

    fn unit(id: u64, spd: i64) -> Consumer {
        Consumer::new(id, format!("u{}", id), Element::Wind, AttributeSet::base(10_000, 700, 600, spd))
    }

    fn pool() -> Pool {
        let mut pieces = Vec::new();
        for slot in 1..=6u8 {
            for k in 0..2u64 {
                let primary = if k == 0 { Stat::HpFlat } else { Stat::Spd };
                pieces.push(
                    EquipmentPiece::rune(slot as u64 * 10 + k, slot, SetTag::Energy, StatRoll::stat(primary, 20))
                        .with_secondary(Substat::stat(Stat::Spd, 4 + k as i32)),
                );
            }
        }
        Pool::new(pieces).unwrap()
    }

    #[test]
    fn test_serving_order_respects_priority_then_turn_sequence() {
        let roster = Roster::new()
            .with(unit(1, 100), EligibilityRules::default().with_priority(5))
            .with(unit(2, 100), EligibilityRules::default().with_priority(1))
            .with(unit(3, 100), EligibilityRules::default().with_priority(3))
            .with(unit(4, 100), EligibilityRules::default().with_priority(3));
        // Turn order 4 before 2; they occupy seats 0 and 2.
        let teams = vec![Team::new("t", vec![ConsumerId(4), ConsumerId(2)]).with_turn_order(true)];
        let resolved = resolve(&roster, &teams, &TickTable::normal()).unwrap();
        let scorer = Scorer::default();
        let config = EngineConfig::default();
        let pool = pool();
        let ctx = RunContext::new(&scorer, &config, &roster, &teams, &resolved, &pool).unwrap();
        assert_eq!(ctx.order(), &[3, 2, 1, 0]);
    }

    #[test]
    fn test_candidates_follow_filters_and_locks() {
        let roster = Roster::new()
            .with(
                unit(1, 100),
                EligibilityRules::default().with_primary(Position::Rune(2), vec![Stat::Spd]),
            )
            .with(
                unit(2, 100),
                EligibilityRules::default().with_locked(Position::Rune(3), PieceId(31)),
            );
        let resolved = resolve(&roster, &[], &TickTable::normal()).unwrap();
        let scorer = Scorer::default();
        let config = EngineConfig::default();
        let pool = pool();
        let ctx = RunContext::new(&scorer, &config, &roster, &[], &resolved, &pool).unwrap();

        let ids = |m: usize, s: usize| -> Vec<u64> {
            ctx.candidates(m, s).iter().map(|c| ctx.piece(c.piece).id.0).collect()
        };
        assert_eq!(ids(0, 1), vec![21]);
        assert_eq!(ids(0, 2), vec![30], "piece 31 is reserved for unit 2");
        assert_eq!(ids(1, 2), vec![31]);
        assert_eq!(ids(1, 0), vec![11, 10], "higher gain first");
        let p31 = pool.lookup(PieceId(31)).unwrap();
        assert!(ctx.is_candidate(1, 2, p31));
        assert!(!ctx.is_candidate(0, 2, p31));
    }

    #[test]
    fn test_active_bounds_materialize_links() {
        let roster = Roster::new()
            .with(unit(1, 100), EligibilityRules::default())
            .with(unit(2, 100), EligibilityRules::default().with_bound(AttributeBound::at_least(Attribute::Hp, 1)));
        let teams = vec![Team::new("t", vec![ConsumerId(1), ConsumerId(2)]).with_turn_order(true)];
        let resolved = resolve(&roster, &teams, &TickTable::normal()).unwrap();
        let scorer = Scorer::default();
        let config = EngineConfig::default();
        let pool = pool();
        let ctx = RunContext::new(&scorer, &config, &roster, &teams, &resolved, &pool).unwrap();

        assert_eq!(ctx.active_bounds(1, |_| None).len(), 1);
        let bounds = ctx.active_bounds(1, |p| (p == 0).then_some(150));
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[1].partner, Some(ConsumerId(1)));
        assert_eq!(bounds[1].bound, AttributeBound::at_most(Attribute::Spd, 149));
    }
}
