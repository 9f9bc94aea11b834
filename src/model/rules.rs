//! Per-consumer eligibility rules, as authored.
//!
//! Rules are never mutated by the engine. Bounds derived from team ordering
//! live in a separate overlay (see [`crate::ordering`]).

use super::equipment::{EquipmentPiece, Loadout, PieceId, Position, SetSize, SetTag};
use super::stats::{Attribute, AttributeSet, Stat};
use crate::scoring::ObjectiveWeights;

/// Largest refinement pass budget a consumer may request.
pub const MAX_PASSES: u8 = 10;

/// Allowed set tags for the three set slots.
///
/// The third slot is only considered when the first two both resolve to
/// 2-piece sets. An empty slot is unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetChoices {
    pub first: Vec<SetTag>,
    pub second: Vec<SetTag>,
    pub third: Vec<SetTag>,
}

/// One resolved set requirement: how many pieces of each tag are needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetDemand {
    /// Sorted by tag, one entry per tag.
    pub pieces: Vec<(SetTag, u8)>,
}

impl SetDemand {
    fn from_tags(tags: &[SetTag]) -> Self {
        let mut pieces: Vec<(SetTag, u8)> = Vec::new();
        for &tag in tags {
            match pieces.iter_mut().find(|(t, _)| *t == tag) {
                Some(entry) => entry.1 += tag.size().pieces(),
                None => pieces.push((tag, tag.size().pieces())),
            }
        }
        pieces.sort();
        Self { pieces }
    }

    pub fn total(&self) -> u8 {
        self.pieces.iter().map(|&(_, n)| n).sum()
    }

    pub fn required(&self, tag: SetTag) -> u8 {
        self.pieces
            .iter()
            .find(|(t, _)| *t == tag)
            .map_or(0, |&(_, n)| n)
    }

    /// Whether the given per-tag counts meet this demand.
    pub fn is_met_by(&self, counts: &[(SetTag, u8)]) -> bool {
        self.pieces.iter().all(|&(tag, need)| {
            counts
                .iter()
                .find(|(t, _)| *t == tag)
                .is_some_and(|&(_, have)| have >= need)
        })
    }
}

/// Pieces per set tag among `pieces`, in first-seen order.
pub fn set_counts(pieces: &[&EquipmentPiece]) -> Vec<(SetTag, u8)> {
    let mut counts: Vec<(SetTag, u8)> = Vec::new();
    for tag in pieces.iter().filter_map(|p| p.set) {
        match counts.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 += 1,
            None => counts.push((tag, 1)),
        }
    }
    counts
}

/// Which set slot a size problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetSlot {
    First,
    Second,
    Third,
}

impl SetChoices {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(first: Vec<SetTag>, second: Vec<SetTag>, third: Vec<SetTag>) -> Self {
        Self {
            first,
            second,
            third,
        }
    }

    /// A single required set (e.g. four Swift).
    pub fn single(tag: SetTag) -> Self {
        Self::new(vec![tag], Vec::new(), Vec::new())
    }

    pub fn is_unconstrained(&self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }

    /// Slots that mix 2-piece and 4-piece tags, or a third slot holding a
    /// 4-piece tag.
    pub fn size_violations(&self) -> Vec<SetSlot> {
        let mixed = |tags: &[SetTag]| {
            tags.iter().any(|t| t.size() == SetSize::Two)
                && tags.iter().any(|t| t.size() == SetSize::Four)
        };
        let mut out = Vec::new();
        if mixed(&self.first) {
            out.push(SetSlot::First);
        }
        if mixed(&self.second) {
            out.push(SetSlot::Second);
        }
        if self.third.iter().any(|t| t.size() == SetSize::Four) {
            out.push(SetSlot::Third);
        }
        out
    }

    /// Every distinct set combination these choices allow, each fitting in six
    /// rune slots. An empty result with [`is_unconstrained`](Self::is_unconstrained)
    /// false means no combination fits.
    pub fn demands(&self) -> Vec<SetDemand> {
        let (a, b) = if self.first.is_empty() {
            (&self.second, &self.first)
        } else {
            (&self.first, &self.second)
        };
        if a.is_empty() {
            return Vec::new();
        }

        let mut out: Vec<SetDemand> = Vec::new();
        let mut push = |tags: &[SetTag]| {
            let demand = SetDemand::from_tags(tags);
            if demand.total() <= 6 && !out.contains(&demand) {
                out.push(demand);
            }
        };
        for &x in a {
            if b.is_empty() {
                push(&[x]);
                continue;
            }
            for &y in b {
                let both_two = x.size() == SetSize::Two && y.size() == SetSize::Two;
                if both_two && !self.third.is_empty() {
                    for &z in &self.third {
                        push(&[x, y, z]);
                    }
                } else {
                    push(&[x, y]);
                }
            }
        }
        out.sort();
        out
    }
}

/// Allowed primary stats at one position.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimaryFilter {
    pub position: Position,
    pub allowed: Vec<Stat>,
}

/// What an attribute bound is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundBasis {
    /// Final attribute value.
    #[default]
    Final,
    /// Final minus base: only what equipment and bonuses add.
    BonusOnly,
}

/// Minimum and/or maximum on one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeBound {
    pub attribute: Attribute,
    pub basis: BoundBasis,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl AttributeBound {
    pub fn at_least(attribute: Attribute, min: i64) -> Self {
        Self {
            attribute,
            basis: BoundBasis::Final,
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(attribute: Attribute, max: i64) -> Self {
        Self {
            attribute,
            basis: BoundBasis::Final,
            min: None,
            max: Some(max),
        }
    }

    pub fn bonus_only(mut self) -> Self {
        self.basis = BoundBasis::BonusOnly;
        self
    }

    /// The quantity this bound constrains.
    pub fn measure(&self, attributes: &AttributeSet, base: &AttributeSet) -> i64 {
        match self.basis {
            BoundBasis::Final => attributes[self.attribute],
            BoundBasis::BonusOnly => attributes[self.attribute] - base[self.attribute],
        }
    }

    pub fn is_satisfied(&self, attributes: &AttributeSet, base: &AttributeSet) -> bool {
        let v = self.measure(attributes, base);
        self.min.is_none_or(|m| v >= m) && self.max.is_none_or(|m| v <= m)
    }

    /// Converts the bound into limits on the final value.
    pub fn final_limits(&self, base: &AttributeSet) -> (Option<i64>, Option<i64>) {
        let shift = match self.basis {
            BoundBasis::Final => 0,
            BoundBasis::BonusOnly => base[self.attribute],
        };
        (self.min.map(|m| m + shift), self.max.map(|m| m + shift))
    }
}

/// Per-consumer configuration describing legal equipment and targets.
///
/// # Examples
///
/// ```
/// use u_loadout::model::{Attribute, AttributeBound, EligibilityRules, Position, SetChoices, SetTag, Stat};
///
/// let rules = EligibilityRules::default()
///     .with_sets(SetChoices::single(SetTag::Swift))
///     .with_primary(Position::Rune(2), vec![Stat::Spd])
///     .with_bound(AttributeBound::at_least(Attribute::Spd, 200))
///     .with_priority(1);
/// assert_eq!(rules.set_demands().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EligibilityRules {
    pub loadout: Loadout,
    pub sets: SetChoices,
    pub primaries: Vec<PrimaryFilter>,
    pub bounds: Vec<AttributeBound>,
    /// Lower is served earlier.
    pub priority: u32,
    /// Refinement passes this consumer takes part in (1–10).
    pub passes: u8,
    /// Explicit turn-order placement within the team; lower goes first.
    pub turn_order: Option<u32>,
    /// Added to final SPD when comparing turn order.
    pub spd_offset: i32,
    /// Target speed tick; resolved into an absolute SPD band.
    pub speed_tick: Option<u32>,
    /// Pieces pinned to this consumer.
    pub locked: Vec<(Position, PieceId)>,
    /// Overrides the run's objective blend for this consumer.
    pub objective: Option<ObjectiveWeights>,
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self {
            loadout: Loadout::Runes,
            sets: SetChoices::any(),
            primaries: Vec::new(),
            bounds: Vec::new(),
            priority: 100,
            passes: MAX_PASSES,
            turn_order: None,
            spd_offset: 0,
            speed_tick: None,
            locked: Vec::new(),
            objective: None,
        }
    }
}

impl EligibilityRules {
    pub fn with_loadout(mut self, loadout: Loadout) -> Self {
        self.loadout = loadout;
        self
    }

    pub fn with_sets(mut self, sets: SetChoices) -> Self {
        self.sets = sets;
        self
    }

    /// Restricts the primary stat at a position; replaces any earlier filter.
    pub fn with_primary(mut self, position: Position, allowed: Vec<Stat>) -> Self {
        self.primaries.retain(|f| f.position != position);
        self.primaries.push(PrimaryFilter { position, allowed });
        self
    }

    pub fn with_bound(mut self, bound: AttributeBound) -> Self {
        self.bounds.push(bound);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_passes(mut self, passes: u8) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_turn_order(mut self, tick: u32) -> Self {
        self.turn_order = Some(tick);
        self
    }

    pub fn with_spd_offset(mut self, offset: i32) -> Self {
        self.spd_offset = offset;
        self
    }

    pub fn with_speed_tick(mut self, tick: u32) -> Self {
        self.speed_tick = Some(tick);
        self
    }

    pub fn with_locked(mut self, position: Position, piece: PieceId) -> Self {
        self.locked.retain(|(p, _)| *p != position);
        self.locked.push((position, piece));
        self
    }

    pub fn with_objective(mut self, weights: ObjectiveWeights) -> Self {
        self.objective = Some(weights);
        self
    }

    pub fn positions(&self) -> Vec<Position> {
        self.loadout.positions()
    }

    /// Allowed primaries at a position; `None` means any.
    pub fn allowed_primaries(&self, position: Position) -> Option<&[Stat]> {
        self.primaries
            .iter()
            .find(|f| f.position == position && !f.allowed.is_empty())
            .map(|f| f.allowed.as_slice())
    }

    pub fn locked_piece(&self, position: Position) -> Option<PieceId> {
        self.locked
            .iter()
            .find(|(p, _)| *p == position)
            .map(|&(_, id)| id)
    }

    pub fn set_demands(&self) -> Vec<SetDemand> {
        self.sets.demands()
    }

    pub fn has_floor_on(&self, attribute: Attribute) -> bool {
        self.bounds
            .iter()
            .any(|b| b.attribute == attribute && b.min.is_some())
    }

    /// Basic shape checks.
    pub fn validate(&self) -> Result<(), String> {
        if self.passes == 0 || self.passes > MAX_PASSES {
            return Err(format!(
                "passes must be in 1..={}, got {}",
                MAX_PASSES, self.passes
            ));
        }
        for bound in &self.bounds {
            if let (Some(lo), Some(hi)) = (bound.min, bound.max) {
                if lo > hi {
                    return Err(format!(
                        "{} bound has min {} above max {}",
                        bound.attribute, lo, hi
                    ));
                }
            }
        }
        Ok(())
    }
}
