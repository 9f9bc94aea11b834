//! Feasibility report types.

use std::fmt;

use crate::model::{ConsumerId, PieceId, Position, SetSlot, SetTag, Stat};

/// One specific reason the input cannot be allocated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shortfall {
    #[error("{consumer} appears {occurrences} times across teams")]
    DuplicateConsumer {
        consumer: ConsumerId,
        occurrences: usize,
    },

    #[error("team {team:?} references {consumer}, which is not in the roster")]
    UnknownTeamMember { team: String, consumer: ConsumerId },

    #[error("team {team:?} has {size} members, more than allowed")]
    OversizedTeam { team: String, size: usize },

    #[error("{consumer}: {reason}")]
    InvalidRules { consumer: ConsumerId, reason: String },

    #[error("{consumer}: set slot {slot:?} mixes 2-piece and 4-piece sets")]
    MixedSetSizes { consumer: ConsumerId, slot: SetSlot },

    #[error("{consumer}: no allowed set combination fits in six rune slots")]
    SetsOverflow { consumer: ConsumerId },

    #[error("{consumer}: {position} is not a valid position")]
    UnaddressablePosition {
        consumer: ConsumerId,
        position: Position,
    },

    #[error("{consumer}: pool has no piece for {position}")]
    EmptyPosition {
        consumer: ConsumerId,
        position: Position,
    },

    #[error("{consumer}: set {tag:?} needs {required} pieces but only {available} slots can supply one")]
    SetUnavailable {
        consumer: ConsumerId,
        tag: SetTag,
        required: u8,
        available: u8,
    },

    #[error("set {tag:?}: consumers {consumers:?} need {required} pieces together, pool has {available}")]
    SetShortage {
        tag: SetTag,
        required: usize,
        available: usize,
        consumers: Vec<ConsumerId>,
    },

    #[error("{consumer}: no piece for {position} with primary in {allowed:?}")]
    PrimaryUnavailable {
        consumer: ConsumerId,
        position: Position,
        allowed: Vec<Stat>,
    },

    #[error("{consumer}: pinned piece {piece} for {position} is missing, misplaced or unavailable")]
    LockedMissing {
        consumer: ConsumerId,
        position: Position,
        piece: PieceId,
    },

    #[error("piece {piece} is pinned by several consumers: {consumers:?}")]
    LockedConflict {
        piece: PieceId,
        consumers: Vec<ConsumerId>,
    },
}

/// Ordered list of shortfalls. Empty means feasible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeasibilityReport {
    pub shortfalls: Vec<Shortfall>,
}

impl FeasibilityReport {
    pub fn is_feasible(&self) -> bool {
        self.shortfalls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shortfalls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortfalls.is_empty()
    }

    pub(crate) fn push(&mut self, shortfall: Shortfall) {
        self.shortfalls.push(shortfall);
    }
}

impl fmt::Display for FeasibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shortfalls.is_empty() {
            return f.write_str("feasible");
        }
        write!(f, "{} shortfall(s)", self.shortfalls.len())?;
        for (i, s) in self.shortfalls.iter().enumerate() {
            write!(f, "{} {}", if i == 0 { ":" } else { ";" }, s)?;
        }
        Ok(())
    }
}
