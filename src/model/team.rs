//! Teams and the roster of one run.

use super::consumer::{Consumer, ConsumerId, LeaderSkill};
use super::rules::EligibilityRules;

/// Largest team the engine accepts.
pub const MAX_TEAM_SIZE: usize = 15;

/// Ordered group of consumers. The first member is the leader.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Team {
    pub name: String,
    pub members: Vec<ConsumerId>,
    /// Enforce strictly decreasing SPD along the turn order.
    pub turn_order: bool,
}

impl Team {
    pub fn new(name: impl Into<String>, members: Vec<ConsumerId>) -> Self {
        Self {
            name: name.into(),
            members,
            turn_order: false,
        }
    }

    pub fn with_turn_order(mut self, enabled: bool) -> Self {
        self.turn_order = enabled;
        self
    }

    pub fn leader(&self) -> Option<ConsumerId> {
        self.members.first().copied()
    }

    pub fn contains(&self, id: ConsumerId) -> bool {
        self.members.contains(&id)
    }
}

/// A consumer together with its authored rules.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RosterEntry {
    pub consumer: Consumer,
    pub rules: EligibilityRules,
}

/// The consumers to optimize in one run, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, consumer: Consumer, rules: EligibilityRules) {
        self.entries.push(RosterEntry { consumer, rules });
    }

    pub fn with(mut self, consumer: Consumer, rules: EligibilityRules) -> Self {
        self.push(consumer, rules);
        self
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declaration index of a consumer.
    pub fn index_of(&self, id: ConsumerId) -> Option<usize> {
        self.entries.iter().position(|e| e.consumer.id == id)
    }

    pub fn get(&self, id: ConsumerId) -> Option<&RosterEntry> {
        self.index_of(id).map(|i| &self.entries[i])
    }

    /// Index of the first team that lists `id`.
    pub fn team_of(&self, teams: &[Team], id: ConsumerId) -> Option<usize> {
        teams.iter().position(|t| t.contains(id))
    }

    /// Leader skill that applies to `id` through its team, if any.
    pub fn leader_skill_for(&self, teams: &[Team], id: ConsumerId) -> Option<LeaderSkill> {
        let team = &teams[self.team_of(teams, id)?];
        let consumer = &self.get(id)?.consumer;
        self.get(team.leader()?)?
            .consumer
            .leader
            .filter(|l| l.applies_to(consumer.element))
    }
}
