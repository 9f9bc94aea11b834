//! Turns team turn order and speed ticks into per-consumer bounds.

use std::collections::BTreeMap;

use crate::error::{AllocError, Result};
use crate::model::{Attribute, AttributeBound, ConsumerId, Roster, RosterEntry, Team};
use crate::scoring::{ObjectiveProfile, ObjectiveWeights};

use super::ticks::TickTable;

/// Strict turn-order relation between two members of one team:
/// `spd(faster) + faster_offset > spd(slower) + slower_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderingLink {
    pub team: usize,
    pub faster: ConsumerId,
    pub slower: ConsumerId,
    pub faster_offset: i64,
    pub slower_offset: i64,
}

impl OrderingLink {
    pub fn holds(&self, faster_spd: i64, slower_spd: i64) -> bool {
        faster_spd + self.faster_offset > slower_spd + self.slower_offset
    }

    /// Highest SPD the slower member may reach given the faster one's SPD.
    pub fn slower_ceiling(&self, faster_spd: i64) -> i64 {
        faster_spd + self.faster_offset - self.slower_offset - 1
    }

    /// Lowest SPD the faster member may have given the slower one's SPD.
    pub fn faster_floor(&self, slower_spd: i64) -> i64 {
        slower_spd + self.slower_offset - self.faster_offset + 1
    }

    pub fn involves(&self, id: ConsumerId) -> bool {
        self.faster == id || self.slower == id
    }

    /// The other member, when `id` is part of this link.
    pub fn partner(&self, id: ConsumerId) -> Option<ConsumerId> {
        if self.faster == id {
            Some(self.slower)
        } else if self.slower == id {
            Some(self.faster)
        } else {
            None
        }
    }

    /// SPD bound on `id` once its partner's final SPD is known.
    pub fn bound_for(&self, id: ConsumerId, partner_spd: i64) -> Option<AttributeBound> {
        if id == self.slower {
            Some(AttributeBound::at_most(
                Attribute::Spd,
                self.slower_ceiling(partner_spd),
            ))
        } else if id == self.faster {
            Some(AttributeBound::at_least(
                Attribute::Spd,
                self.faster_floor(partner_spd),
            ))
        } else {
            None
        }
    }
}

/// Bounds derived for one consumer. Authored rules stay untouched.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DerivedBounds {
    /// Absolute bounds, currently the speed tick band.
    pub bounds: Vec<AttributeBound>,
    /// Turn-order links this consumer takes part in.
    pub links: Vec<OrderingLink>,
}

impl DerivedBounds {
    pub fn has_floor_on(&self, attribute: Attribute, id: ConsumerId) -> bool {
        self.bounds
            .iter()
            .any(|b| b.attribute == attribute && b.min.is_some())
            || (attribute == Attribute::Spd && self.links.iter().any(|l| l.faster == id))
    }
}

/// Overlay of derived bounds for every consumer in a run.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRules {
    derived: BTreeMap<ConsumerId, DerivedBounds>,
    links: Vec<OrderingLink>,
    sequences: Vec<Vec<ConsumerId>>,
    empty: DerivedBounds,
}

impl ResolvedRules {
    pub fn derived(&self, id: ConsumerId) -> &DerivedBounds {
        self.derived.get(&id).unwrap_or(&self.empty)
    }

    pub fn links(&self) -> &[OrderingLink] {
        &self.links
    }

    pub fn links_for(&self, id: ConsumerId) -> impl Iterator<Item = &OrderingLink> + '_ {
        self.links.iter().filter(move |l| l.involves(id))
    }

    /// Objective weights for one consumer: its own override or `default`,
    /// with floor emphasis on every authored or derived floor.
    pub fn objective_profile(&self, entry: &RosterEntry, default: &ObjectiveWeights) -> ObjectiveProfile {
        let id = entry.consumer.id;
        let derived = self.derived(id);
        let weights = entry.rules.objective.as_ref().unwrap_or(default);
        ObjectiveProfile::new(weights, |a| {
            entry.rules.has_floor_on(a) || derived.has_floor_on(a, id)
        })
    }

    /// Turn sequence of each team with turn order enabled, fastest first.
    /// Teams without turn order have an empty sequence.
    pub fn turn_sequence(&self, team: usize) -> &[ConsumerId] {
        self.sequences.get(team).map_or(&[], |s| s.as_slice())
    }
}

/// Builds the overlay.
///
/// Members of a team with turn order enabled are sorted by their explicit
/// `turn_order` tick (members without one go last); ties keep team order.
/// Each consecutive pair yields one [`OrderingLink`]. Any consumer with a
/// `speed_tick` gets the tick's SPD band as an absolute bound.
pub fn resolve(roster: &Roster, teams: &[Team], ticks: &TickTable) -> Result<ResolvedRules> {
    let mut resolved = ResolvedRules::default();

    for entry in roster.entries() {
        if let Some(tick) = entry.rules.speed_tick {
            let (min, max) = ticks.band(tick).ok_or_else(|| {
                AllocError::InvalidConfig(format!(
                    "{} requests speed tick {} which the tick table does not define",
                    entry.consumer.id, tick
                ))
            })?;
            resolved
                .derived
                .entry(entry.consumer.id)
                .or_default()
                .bounds
                .push(AttributeBound {
                    attribute: Attribute::Spd,
                    basis: Default::default(),
                    min: Some(min),
                    max,
                });
        }
    }

    for (team_index, team) in teams.iter().enumerate() {
        let mut members = Vec::with_capacity(team.members.len());
        for &id in &team.members {
            let entry = roster.get(id).ok_or(AllocError::UnknownConsumer(id))?;
            members.push((entry.rules.turn_order.unwrap_or(u32::MAX), id, entry.rules.spd_offset));
        }
        if !team.turn_order {
            resolved.sequences.push(Vec::new());
            continue;
        }
        members.sort_by_key(|&(tick, _, _)| tick);

        for pair in members.windows(2) {
            let (_, faster, fo) = pair[0];
            let (_, slower, so) = pair[1];
            let link = OrderingLink {
                team: team_index,
                faster,
                slower,
                faster_offset: fo as i64,
                slower_offset: so as i64,
            };
            for id in [faster, slower] {
                resolved.derived.entry(id).or_default().links.push(link);
            }
            resolved.links.push(link);
        }
        resolved
            .sequences
            .push(members.into_iter().map(|(_, id, _)| id).collect());
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeSet, Consumer, EligibilityRules, Element};

    fn roster(rules: &[EligibilityRules]) -> Roster {
        let mut roster = Roster::new();
        for (i, r) in rules.iter().enumerate() {
            roster.push(
                Consumer::new(i as u64 + 1, format!("u{}", i + 1), Element::Fire, AttributeSet::base(10_000, 700, 600, 100)),
                r.clone(),
            );
        }
        roster
    }

    #[test]
    fn test_team_order_yields_consecutive_links() {
        let roster = roster(&[EligibilityRules::default(), EligibilityRules::default(), EligibilityRules::default()]);
        let team = Team::new("arena", vec![ConsumerId(1), ConsumerId(2), ConsumerId(3)]).with_turn_order(true);
        let resolved = resolve(&roster, &[team], &TickTable::normal()).unwrap();

        let pairs: Vec<_> = resolved.links().iter().map(|l| (l.faster.0, l.slower.0)).collect();
        assert_eq!(pairs, vec![(1, 2), (2, 3)]);
        assert_eq!(resolved.derived(ConsumerId(2)).links.len(), 2);
        assert!(resolved.derived(ConsumerId(1)).has_floor_on(Attribute::Spd, ConsumerId(1)));
        assert!(!resolved.derived(ConsumerId(3)).has_floor_on(Attribute::Spd, ConsumerId(3)));
    }

    #[test]
    fn test_explicit_ticks_override_team_order_and_ties_are_stable() {
        let roster = roster(&[
            EligibilityRules::default().with_turn_order(2),
            EligibilityRules::default().with_turn_order(1),
            EligibilityRules::default().with_turn_order(2),
        ]);
        let team = Team::new("g", vec![ConsumerId(1), ConsumerId(2), ConsumerId(3)]).with_turn_order(true);
        let resolved = resolve(&roster, &[team], &TickTable::normal()).unwrap();
        assert_eq!(resolved.turn_sequence(0), &[ConsumerId(2), ConsumerId(1), ConsumerId(3)]);
    }

    #[test]
    fn test_disabled_turn_order_has_no_links() {
        let roster = roster(&[EligibilityRules::default(), EligibilityRules::default()]);
        let team = Team::new("t", vec![ConsumerId(1), ConsumerId(2)]);
        let resolved = resolve(&roster, &[team], &TickTable::normal()).unwrap();
        assert!(resolved.links().is_empty());
        assert!(resolved.turn_sequence(0).is_empty());
    }

    #[test]
    fn test_offsets_shift_bounds() {
        let roster = roster(&[
            EligibilityRules::default().with_spd_offset(10),
            EligibilityRules::default(),
        ]);
        let team = Team::new("t", vec![ConsumerId(1), ConsumerId(2)]).with_turn_order(true);
        let resolved = resolve(&roster, &[team], &TickTable::normal()).unwrap();
        let link = resolved.links()[0];
        assert!(link.holds(195, 204));
        assert!(!link.holds(195, 205));
        assert_eq!(link.slower_ceiling(195), 204);
        assert_eq!(link.faster_floor(205), 196);
        assert_eq!(
            link.bound_for(ConsumerId(2), 195),
            Some(AttributeBound::at_most(Attribute::Spd, 204))
        );
    }

    #[test]
    fn test_speed_tick_band_and_unknown_tick() {
        let roster1 = roster(&[EligibilityRules::default().with_speed_tick(8)]);
        let resolved = resolve(&roster1, &[], &TickTable::normal()).unwrap();
        let bound = resolved.derived(ConsumerId(1)).bounds[0];
        assert_eq!((bound.min, bound.max), (Some(179), Some(204)));

        let roster2 = roster(&[EligibilityRules::default().with_speed_tick(40)]);
        assert!(resolve(&roster2, &[], &TickTable::normal()).is_err());
    }

    #[test]
    fn test_unknown_team_member_is_rejected() {
        let roster = roster(&[EligibilityRules::default()]);
        let team = Team::new("t", vec![ConsumerId(1), ConsumerId(9)]);
        let err = resolve(&roster, &[team], &TickTable::normal()).unwrap_err();
        assert!(matches!(err, AllocError::UnknownConsumer(ConsumerId(9))));
    }
}
