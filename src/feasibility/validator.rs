//! Pre-flight checks run before anything is committed.

use std::collections::{BTreeMap, HashMap};

use crate::model::{
    ConsumerId, Position, Roster, RosterEntry, SetDemand, SetTag, Team, MAX_TEAM_SIZE,
};
use crate::pool::{PieceIdx, Pool};

use super::types::{FeasibilityReport, Shortfall};

/// Checks that the roster, teams and pool admit an allocation.
///
/// Checks run in this order and every violation is collected:
///
/// 1. team structure: duplicate consumers, unknown members, team size
/// 2. rule shape and addressable positions, including pinned pieces
/// 3. per-consumer and aggregate set supply
/// 4. primary-stat filters
pub fn validate(roster: &Roster, teams: &[Team], pool: &Pool) -> FeasibilityReport {
    let mut report = FeasibilityReport::default();

    // 1. Team structure
    let mut occurrences: BTreeMap<ConsumerId, usize> = BTreeMap::new();
    for team in teams {
        if team.members.len() > MAX_TEAM_SIZE {
            report.push(Shortfall::OversizedTeam {
                team: team.name.clone(),
                size: team.members.len(),
            });
        }
        for &id in &team.members {
            *occurrences.entry(id).or_default() += 1;
            if roster.get(id).is_none() {
                report.push(Shortfall::UnknownTeamMember {
                    team: team.name.clone(),
                    consumer: id,
                });
            }
        }
    }
    for (&consumer, &n) in &occurrences {
        if n > 1 {
            report.push(Shortfall::DuplicateConsumer {
                consumer,
                occurrences: n,
            });
        }
    }
    let mut declared: BTreeMap<ConsumerId, usize> = BTreeMap::new();
    for entry in roster.entries() {
        *declared.entry(entry.consumer.id).or_default() += 1;
    }
    for (&consumer, &n) in &declared {
        if n > 1 && occurrences.get(&consumer).copied().unwrap_or(0) <= 1 {
            report.push(Shortfall::DuplicateConsumer {
                consumer,
                occurrences: n,
            });
        }
    }

    // 2. Rules and positions
    let reserved = reserved_pieces(roster, pool, &mut report);
    for entry in roster.entries() {
        let id = entry.consumer.id;
        if let Err(reason) = entry.rules.validate() {
            report.push(Shortfall::InvalidRules {
                consumer: id,
                reason,
            });
        }
        let extra = entry
            .rules
            .primaries
            .iter()
            .map(|f| f.position)
            .chain(entry.rules.locked.iter().map(|(p, _)| *p));
        for position in extra {
            if !position.is_addressable() {
                report.push(Shortfall::UnaddressablePosition {
                    consumer: id,
                    position,
                });
            }
        }
        for position in entry.rules.positions() {
            if !position.is_addressable() {
                report.push(Shortfall::UnaddressablePosition {
                    consumer: id,
                    position,
                });
            } else if let Some(piece) = entry.rules.locked_piece(position) {
                let ok = pool.lookup(piece).is_some_and(|idx| {
                    pool.is_available(idx) && pool.piece(idx).position == position
                });
                if !ok {
                    report.push(Shortfall::LockedMissing {
                        consumer: id,
                        position,
                        piece,
                    });
                }
            } else if usable(pool, &reserved, id, position).next().is_none() {
                report.push(Shortfall::EmptyPosition {
                    consumer: id,
                    position,
                });
            }
        }
    }

    // 3. Set supply
    let mut mandatory: BTreeMap<SetTag, (usize, Vec<ConsumerId>)> = BTreeMap::new();
    for entry in roster.entries() {
        let id = entry.consumer.id;
        let sets = &entry.rules.sets;
        for slot in sets.size_violations() {
            report.push(Shortfall::MixedSetSizes { consumer: id, slot });
        }
        if sets.is_unconstrained() {
            continue;
        }
        let demands = sets.demands();
        if demands.is_empty() {
            report.push(Shortfall::SetsOverflow { consumer: id });
            continue;
        }

        let supply = slot_supply(pool, &reserved, entry);
        let mut first_gap = None;
        let satisfiable = demands.iter().any(|demand| match demand_gap(demand, &supply) {
            None => true,
            Some(gap) => {
                first_gap.get_or_insert(gap);
                false
            }
        });
        if !satisfiable {
            if let Some((tag, required, available)) = first_gap {
                report.push(Shortfall::SetUnavailable {
                    consumer: id,
                    tag,
                    required,
                    available,
                });
            }
        }

        for tag in SetTag::ALL {
            let need = demands.iter().map(|d| d.required(tag)).min().unwrap_or(0);
            if need > 0 {
                let slot = mandatory.entry(tag).or_default();
                slot.0 += need as usize;
                slot.1.push(id);
            }
        }
    }
    for (tag, (required, consumers)) in mandatory {
        let available = pool
            .available()
            .filter(|&i| pool.piece(i).set == Some(tag))
            .count();
        if consumers.len() > 1 && available < required {
            report.push(Shortfall::SetShortage {
                tag,
                required,
                available,
                consumers,
            });
        }
    }

    // 4. Primary filters
    for entry in roster.entries() {
        let id = entry.consumer.id;
        for position in entry.rules.positions() {
            let Some(allowed) = entry.rules.allowed_primaries(position) else {
                continue;
            };
            if entry.rules.locked_piece(position).is_some() {
                continue;
            }
            let mut at_position = usable(pool, &reserved, id, position).peekable();
            if at_position.peek().is_none() {
                continue;
            }
            let matched = at_position
                .any(|i| pool.piece(i).primary_stat().is_some_and(|s| allowed.contains(&s)));
            if !matched {
                report.push(Shortfall::PrimaryUnavailable {
                    consumer: id,
                    position,
                    allowed: allowed.to_vec(),
                });
            }
        }
    }

    report
}

/// Pieces pinned by some consumer. Conflicting pins are reported.
fn reserved_pieces(
    roster: &Roster,
    pool: &Pool,
    report: &mut FeasibilityReport,
) -> HashMap<PieceIdx, ConsumerId> {
    let mut claims: BTreeMap<PieceIdx, Vec<ConsumerId>> = BTreeMap::new();
    for entry in roster.entries() {
        for (_, piece) in &entry.rules.locked {
            if let Some(idx) = pool.lookup(*piece) {
                claims.entry(idx).or_default().push(entry.consumer.id);
            }
        }
    }
    let mut reserved = HashMap::new();
    for (idx, consumers) in claims {
        if consumers.len() > 1 {
            report.push(Shortfall::LockedConflict {
                piece: pool.piece(idx).id,
                consumers: consumers.clone(),
            });
        }
        reserved.insert(idx, consumers[0]);
    }
    reserved
}

/// Available pieces a consumer may use at a position, ignoring primaries.
fn usable<'a>(
    pool: &'a Pool,
    reserved: &'a HashMap<PieceIdx, ConsumerId>,
    consumer: ConsumerId,
    position: Position,
) -> impl Iterator<Item = PieceIdx> + 'a {
    pool.available_at(position)
        .filter(move |i| reserved.get(i).is_none_or(|&owner| owner == consumer))
}

/// For every rune slot of the consumer, which set tags it can be filled with.
fn slot_supply(
    pool: &Pool,
    reserved: &HashMap<PieceIdx, ConsumerId>,
    entry: &RosterEntry,
) -> Vec<Vec<SetTag>> {
    let id = entry.consumer.id;
    entry
        .rules
        .positions()
        .into_iter()
        .filter(|p| p.is_rune())
        .map(|position| {
            let allowed = entry.rules.allowed_primaries(position);
            let mut tags: Vec<SetTag> = match entry.rules.locked_piece(position) {
                Some(piece) => pool
                    .lookup(piece)
                    .and_then(|i| pool.piece(i).set)
                    .into_iter()
                    .collect(),
                None => usable(pool, reserved, id, position)
                    .map(|i| pool.piece(i))
                    .filter(|p| {
                        allowed.is_none_or(|a| p.primary_stat().is_some_and(|s| a.contains(&s)))
                    })
                    .filter_map(|p| p.set)
                    .collect(),
            };
            tags.sort();
            tags.dedup();
            tags
        })
        .collect()
}

/// First tag of `demand` that not enough distinct slots can supply:
/// `(tag, required, slots available)`.
fn demand_gap(demand: &SetDemand, supply: &[Vec<SetTag>]) -> Option<(SetTag, u8, u8)> {
    for &(tag, required) in &demand.pieces {
        let available = supply.iter().filter(|tags| tags.contains(&tag)).count() as u8;
        if available < required {
            return Some((tag, required, available));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AttributeSet, Consumer, EligibilityRules, Element, EquipmentPiece, PieceId, SetChoices,
        Stat, StatRoll,
    };

    fn unit(id: u64) -> Consumer {
        Consumer::new(id, format!("u{}", id), Element::Water, AttributeSet::base(10_000, 700, 600, 100))
    }

    fn full_set(first_id: u64, set: SetTag) -> Vec<EquipmentPiece> {
        (1..=6u8)
            .map(|slot| EquipmentPiece::rune(first_id + slot as u64, slot, set, StatRoll::stat(Stat::HpPct, 63)))
            .collect()
    }

    #[test]
    fn test_feasible_input_has_no_shortfalls() {
        let pool = Pool::new(full_set(0, SetTag::Swift)).unwrap();
        let roster = Roster::new().with(unit(1), EligibilityRules::default().with_sets(SetChoices::single(SetTag::Swift)));
        let teams = vec![Team::new("solo", vec![ConsumerId(1)])];
        let report = validate(&roster, &teams, &pool);
        assert!(report.is_feasible(), "unexpected: {}", report);
    }

    #[test]
    fn test_missing_four_piece_set_names_the_tag() {
        let pool = Pool::new(full_set(0, SetTag::Energy)).unwrap();
        let roster = Roster::new().with(unit(1), EligibilityRules::default().with_sets(SetChoices::single(SetTag::Violent)));
        let report = validate(&roster, &[], &pool);
        assert_eq!(
            report.shortfalls,
            vec![Shortfall::SetUnavailable {
                consumer: ConsumerId(1),
                tag: SetTag::Violent,
                required: 4,
                available: 0,
            }]
        );
    }

    #[test]
    fn test_duplicate_consumer_across_teams() {
        let pool = Pool::new(full_set(0, SetTag::Energy)).unwrap();
        let roster = Roster::new().with(unit(1), EligibilityRules::default());
        let teams = vec![
            Team::new("a", vec![ConsumerId(1)]),
            Team::new("b", vec![ConsumerId(1)]),
        ];
        let report = validate(&roster, &teams, &pool);
        assert_eq!(
            report.shortfalls,
            vec![Shortfall::DuplicateConsumer {
                consumer: ConsumerId(1),
                occurrences: 2,
            }]
        );
    }

    #[test]
    fn test_empty_position_and_primary_filter() {
        let mut pieces = full_set(0, SetTag::Energy);
        pieces.retain(|p| p.position != Position::Rune(6));
        let pool = Pool::new(pieces).unwrap();
        let rules = EligibilityRules::default().with_primary(Position::Rune(2), vec![Stat::Spd]);
        let roster = Roster::new().with(unit(1), rules);
        let report = validate(&roster, &[], &pool);
        assert_eq!(report.len(), 2, "got {}", report);
        assert!(matches!(
            report.shortfalls[0],
            Shortfall::EmptyPosition { position: Position::Rune(6), .. }
        ));
        assert!(matches!(
            report.shortfalls[1],
            Shortfall::PrimaryUnavailable { position: Position::Rune(2), .. }
        ));
    }

    #[test]
    fn test_aggregate_set_shortage() {
        let pool = Pool::new(full_set(0, SetTag::Swift)).unwrap();
        let rules = EligibilityRules::default().with_sets(SetChoices::single(SetTag::Swift));
        let roster = Roster::new().with(unit(1), rules.clone()).with(unit(2), rules);
        let report = validate(&roster, &[], &pool);
        assert!(report.shortfalls.iter().any(|s| matches!(
            s,
            Shortfall::SetShortage { tag: SetTag::Swift, required: 8, available: 6, .. }
        )), "got {}", report);
    }

    #[test]
    fn test_mixed_sizes_and_overflow() {
        let pool = Pool::new(full_set(0, SetTag::Swift)).unwrap();
        let rules = EligibilityRules::default().with_sets(SetChoices::new(
            vec![SetTag::Swift],
            vec![SetTag::Violent],
            Vec::new(),
        ));
        let roster = Roster::new().with(unit(1), rules);
        let report = validate(&roster, &[], &pool);
        assert_eq!(report.shortfalls, vec![Shortfall::SetsOverflow { consumer: ConsumerId(1) }]);
    }

    #[test]
    fn test_locked_piece_checks() {
        let pool = Pool::new(full_set(0, SetTag::Swift)).unwrap();
        let roster = Roster::new()
            .with(unit(1), EligibilityRules::default().with_locked(Position::Rune(1), PieceId(1)))
            .with(unit(2), EligibilityRules::default().with_locked(Position::Rune(2), PieceId(1)));
        let report = validate(&roster, &[], &pool);
        assert!(report.shortfalls.iter().any(|s| matches!(s, Shortfall::LockedConflict { .. })));
        assert!(report.shortfalls.iter().any(|s| matches!(
            s,
            Shortfall::LockedMissing { consumer: ConsumerId(2), position: Position::Rune(2), .. }
        )));
    }
}
