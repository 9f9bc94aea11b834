//! Builds [`OptimizationResult`]s from committed pool state.

use std::collections::HashMap;
use std::time::Duration;

use crate::engine::Strategy;
use crate::error::{AllocError, Result, Unsatisfied};
use crate::model::{AttributeSet, ConsumerId, EquipmentPiece, Roster, Team};
use crate::ordering::ResolvedRules;
use crate::pool::{PieceIdx, Pool};
use crate::scoring::Scorer;
use crate::solver::SolverStatus;

use super::types::{ConsumerReport, OptimizationResult, TeamSummary};

/// Run facts that do not come from the pool.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub label: String,
    pub requested: Strategy,
    pub strategy: Strategy,
    /// Per roster entry.
    pub failures: Vec<Option<Unsatisfied>>,
    pub history: Vec<f64>,
    pub solver_status: Option<SolverStatus>,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Recomputes every figure from the pieces the pool says each consumer owns.
///
/// Nothing a strategy cached is reused, so two strategies that commit the
/// same pieces produce identical figures.
pub struct ResultBuilder<'a> {
    scorer: &'a Scorer,
    roster: &'a Roster,
    teams: &'a [Team],
    resolved: &'a ResolvedRules,
}

impl<'a> ResultBuilder<'a> {
    pub fn new(scorer: &'a Scorer, roster: &'a Roster, teams: &'a [Team], resolved: &'a ResolvedRules) -> Self {
        Self {
            scorer,
            roster,
            teams,
            resolved,
        }
    }

    pub fn build(&self, pool: &Pool, summary: RunSummary) -> Result<OptimizationResult> {
        let mut owned: HashMap<ConsumerId, Vec<PieceIdx>> = HashMap::new();
        for (idx, owner) in pool.committed() {
            owned.entry(owner).or_default().push(idx);
        }

        let default_weights = &self.scorer.config().objective;
        let mut consumers = Vec::with_capacity(self.roster.len());
        for (m, entry) in self.roster.entries().iter().enumerate() {
            let consumer = &entry.consumer;
            let held = owned.remove(&consumer.id).unwrap_or_default();
            let failure = summary.failures.get(m).cloned().flatten();

            if held.is_empty() {
                let failure = failure.ok_or_else(|| {
                    AllocError::InvariantViolation(format!(
                        "{} has neither a loadout nor a diagnosis",
                        consumer.id
                    ))
                })?;
                consumers.push(ConsumerReport {
                    consumer: consumer.id,
                    name: consumer.name.clone(),
                    assignment: Vec::new(),
                    attributes: None,
                    objective: 0.0,
                    failure: Some(failure),
                });
                continue;
            }

            let positions = entry.rules.positions();
            let mut ordered: Vec<&EquipmentPiece> = Vec::with_capacity(positions.len());
            for &position in &positions {
                let mut at = held.iter().filter(|&&i| pool.piece(i).position == position);
                match (at.next(), at.next()) {
                    (Some(&i), None) => ordered.push(pool.piece(i)),
                    _ => {
                        return Err(AllocError::InvariantViolation(format!(
                            "{} does not hold exactly one piece for {}",
                            consumer.id, position
                        )))
                    }
                }
            }
            if ordered.len() != held.len() {
                return Err(AllocError::InvariantViolation(format!(
                    "{} holds pieces outside its positions",
                    consumer.id
                )));
            }

            let leader = self.roster.leader_skill_for(self.teams, consumer.id);
            let profile = self.resolved.objective_profile(entry, default_weights);
            let attributes = self.scorer.final_attributes(consumer, &ordered, leader.as_ref());
            let objective = self.scorer.objective(&profile, consumer, &ordered, &attributes);
            consumers.push(ConsumerReport {
                consumer: consumer.id,
                name: consumer.name.clone(),
                assignment: positions.iter().copied().zip(ordered.iter().map(|p| p.id)).collect(),
                attributes: Some(attributes),
                objective,
                failure: None,
            });
        }
        if let Some(stray) = owned.keys().next() {
            return Err(AllocError::InvariantViolation(format!(
                "pieces are committed to {}, which is not in the roster",
                stray
            )));
        }

        let teams = self.summarize_teams(pool, &consumers);
        let objective = consumers.iter().map(|c| c.objective).sum();

        Ok(OptimizationResult {
            label: summary.label,
            requested: summary.requested,
            strategy: summary.strategy,
            consumers,
            teams,
            objective,
            history: summary.history,
            solver_status: summary.solver_status,
            elapsed: summary.elapsed,
            cancelled: summary.cancelled,
        })
    }

    fn summarize_teams(&self, pool: &Pool, consumers: &[ConsumerReport]) -> Vec<TeamSummary> {
        self.teams
            .iter()
            .map(|team| {
                let leader = team.leader();
                let leader_skill = leader
                    .and_then(|id| self.roster.get(id))
                    .and_then(|e| e.consumer.leader);
                let mut leader_bonus = AttributeSet::default();
                let mut objective = 0.0;
                for &id in &team.members {
                    let (Some(entry), Some(report)) =
                        (self.roster.get(id), consumers.iter().find(|c| c.consumer == id))
                    else {
                        continue;
                    };
                    objective += report.objective;
                    let pieces: Vec<&EquipmentPiece> = report
                        .assignment
                        .iter()
                        .filter_map(|(_, pid)| pool.lookup(*pid).map(|i| pool.piece(i)))
                        .collect();
                    let skill = self.roster.leader_skill_for(self.teams, id);
                    let with = self.scorer.final_attributes(&entry.consumer, &pieces, skill.as_ref());
                    let without = self.scorer.final_attributes(&entry.consumer, &pieces, None);
                    leader_bonus += with - without;
                }
                TeamSummary {
                    name: team.name.clone(),
                    leader,
                    leader_skill,
                    leader_bonus,
                    objective,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Attribute, Consumer, EligibilityRules, Element, LeaderSkill, PieceId, SetTag, Stat, StatRoll, Substat,
    };
    use crate::ordering::{self, TickTable};
    use crate::scoring::ScoringConfig;

    fn pool() -> Pool {
        let pieces = (1..=12u64)
            .map(|id| {
                let slot = ((id - 1) % 6 + 1) as u8;
                EquipmentPiece::rune(id, slot, SetTag::Energy, StatRoll::stat(Stat::HpFlat, 100))
                    .with_secondary(Substat::stat(Stat::Spd, 5))
            })
            .collect();
        Pool::new(pieces).unwrap()
    }

    fn roster() -> Roster {
        let leader = Consumer::new(1, "lead", Element::Fire, AttributeSet::base(10_000, 700, 600, 100))
            .with_leader(LeaderSkill::new(Attribute::Hp, 30));
        let wing = Consumer::new(2, "wing", Element::Wind, AttributeSet::base(10_000, 700, 600, 100));
        Roster::new()
            .with(leader, EligibilityRules::default())
            .with(wing, EligibilityRules::default())
    }

    fn summary(failures: Vec<Option<Unsatisfied>>) -> RunSummary {
        RunSummary {
            label: "t".into(),
            requested: Strategy::Greedy,
            strategy: Strategy::Greedy,
            failures,
            history: vec![0.0],
            solver_status: None,
            elapsed: Duration::ZERO,
            cancelled: false,
        }
    }

    fn commit(pool: &mut Pool, ids: impl IntoIterator<Item = u64>, owner: u64) {
        for id in ids {
            let idx = pool.lookup(PieceId(id)).unwrap();
            pool.commit(idx, ConsumerId(owner)).unwrap();
        }
    }

    #[test]
    fn test_figures_come_from_committed_pieces() {
        let (scorer, roster) = (Scorer::new(ScoringConfig::default()), roster());
        let teams = vec![Team::new("duo", vec![ConsumerId(1), ConsumerId(2)])];
        let resolved = ordering::resolve(&roster, &teams, &TickTable::default()).unwrap();
        let mut pool = pool();
        commit(&mut pool, 1..=6, 1);
        commit(&mut pool, 7..=12, 2);

        let result = ResultBuilder::new(&scorer, &roster, &teams, &resolved)
            .build(&pool, summary(vec![None, None]))
            .unwrap();

        assert!(result.is_complete());
        let lead = result.consumer(ConsumerId(1)).unwrap();
        assert_eq!(
            lead.assignment.iter().map(|(_, p)| p.0).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
        assert_eq!(lead.attributes.unwrap()[Attribute::Spd], 130);
        let sum: f64 = result.consumers().iter().map(|c| c.objective).sum();
        assert_eq!(result.objective(), sum);

        let team = &result.teams()[0];
        assert_eq!(team.leader, Some(ConsumerId(1)));
        assert_eq!(team.leader_bonus[Attribute::Hp], 6_000);
        assert_eq!(team.objective, sum);
    }

    #[test]
    fn test_incomplete_consumer_needs_a_diagnosis() {
        let (scorer, roster) = (Scorer::new(ScoringConfig::default()), roster());
        let resolved = ordering::resolve(&roster, &[], &TickTable::default()).unwrap();
        let mut pool = pool();
        commit(&mut pool, 1..=6, 1);
        let builder = ResultBuilder::new(&scorer, &roster, &[], &resolved);

        assert!(matches!(
            builder.build(&pool, summary(vec![None, None])),
            Err(AllocError::InvariantViolation(_))
        ));
        let result = builder
            .build(&pool, summary(vec![None, Some(Unsatisfied::CombinationNotFound)]))
            .unwrap();
        let wing = result.consumer(ConsumerId(2)).unwrap();
        assert!(wing.assignment.is_empty() && wing.attributes.is_none());
        assert_eq!(result.completed(), 1);
    }

    #[test]
    fn test_partial_loadout_is_an_invariant_violation() {
        let (scorer, roster) = (Scorer::new(ScoringConfig::default()), roster());
        let resolved = ordering::resolve(&roster, &[], &TickTable::default()).unwrap();
        let mut pool = pool();
        commit(&mut pool, 1..=5, 1);
        let failures = vec![None, Some(Unsatisfied::Skipped)];
        assert!(matches!(
            ResultBuilder::new(&scorer, &roster, &[], &resolved).build(&pool, summary(failures)),
            Err(AllocError::InvariantViolation(_))
        ));
    }
}
