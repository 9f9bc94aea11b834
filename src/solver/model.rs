//! Allocation model: decision slots, candidates and constraints.

use crate::model::{AttributeBound, Attribute, Consumer, LeaderSkill, Position, SetDemand};
use crate::ordering::OrderingLink;
use crate::pool::{PieceIdx, PoolSnapshot};
use crate::scoring::{ObjectiveProfile, Scorer};

/// A piece that may fill one slot, with its precomputed contribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub piece: PieceIdx,
    /// Marginal objective, excluding set bonuses.
    pub gain: f64,
    /// Real-valued attribute change.
    pub delta: [f64; Attribute::COUNT],
}

/// One (member, position) decision.
#[derive(Debug, Clone)]
pub struct ModelSlot {
    pub position: Position,
    /// Sorted by descending gain.
    pub candidates: Vec<Candidate>,
}

/// One consumer in the model.
#[derive(Debug, Clone)]
pub struct ModelMember<'a> {
    pub consumer: &'a Consumer,
    pub leader: Option<LeaderSkill>,
    pub profile: ObjectiveProfile,
    pub slots: Vec<ModelSlot>,
    /// Alternatives; at least one must be met. Empty means unconstrained.
    pub set_demands: Vec<SetDemand>,
    /// Hard floors and ceilings.
    pub bounds: Vec<AttributeBound>,
}

/// Turn-order relation between two members of the model.
#[derive(Debug, Clone, Copy)]
pub struct ModelLink {
    pub faster: usize,
    pub slower: usize,
    pub link: OrderingLink,
}

/// A complete allocation problem.
///
/// Every piece is used at most once across all members. A member is either
/// complete (every slot filled, every constraint met) or, when
/// `allow_incomplete` is set, left out entirely. The objective is
/// lexicographic: completed members first, then the summed member objective.
#[derive(Debug, Clone)]
pub struct AllocationModel<'a> {
    pub name: String,
    pub scorer: &'a Scorer,
    pub pool: &'a PoolSnapshot,
    pub members: Vec<ModelMember<'a>>,
    pub links: Vec<ModelLink>,
    pub allow_incomplete: bool,
    /// Known solution to start from, aligned with `members`.
    pub hint: Option<Vec<Option<Vec<PieceIdx>>>>,
}

impl<'a> AllocationModel<'a> {
    pub fn new(name: impl Into<String>, scorer: &'a Scorer, pool: &'a PoolSnapshot) -> Self {
        Self {
            name: name.into(),
            scorer,
            pool,
            members: Vec::new(),
            links: Vec::new(),
            allow_incomplete: false,
            hint: None,
        }
    }

    pub fn add_member(&mut self, member: ModelMember<'a>) -> usize {
        self.members.push(member);
        self.members.len() - 1
    }

    pub fn add_link(&mut self, link: ModelLink) {
        self.links.push(link);
    }

    pub fn with_incomplete(mut self, allow: bool) -> Self {
        self.allow_incomplete = allow;
        self
    }

    pub fn with_hint(mut self, hint: Vec<Option<Vec<PieceIdx>>>) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Checks structural consistency.
    pub fn validate(&self) -> Result<(), String> {
        for (i, member) in self.members.iter().enumerate() {
            if member.slots.is_empty() {
                return Err(format!("member {} ({}) has no slots", i, member.consumer.id));
            }
            for slot in &member.slots {
                if let Some(c) = slot.candidates.iter().find(|c| c.piece.index() >= self.pool.len()) {
                    return Err(format!(
                        "candidate {} for {} is outside the pool",
                        c.piece.index(),
                        slot.position
                    ));
                }
            }
        }
        for link in &self.links {
            if link.faster >= self.members.len() || link.slower >= self.members.len() {
                return Err(format!(
                    "link references undefined member ({} -> {})",
                    link.faster, link.slower
                ));
            }
            if link.faster == link.slower {
                return Err(format!("member {} is linked to itself", link.faster));
            }
        }
        if let Some(hint) = &self.hint {
            if hint.len() != self.members.len() {
                return Err(format!(
                    "hint covers {} members, model has {}",
                    hint.len(),
                    self.members.len()
                ));
            }
        }
        Ok(())
    }
}
