//! Error types.
//!
//! [`AllocError`] aborts a call. [`Unsatisfied`] is data: it explains why a
//! single consumer was left incomplete while the run carried on.

use crate::feasibility::FeasibilityReport;
use crate::model::{Attribute, ConsumerId, PieceId, Position, SetTag, Stat};

#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("infeasible input: {0}")]
    Infeasible(FeasibilityReport),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("duplicate piece id {0}")]
    DuplicatePiece(PieceId),

    #[error("unknown consumer {0}")]
    UnknownConsumer(ConsumerId),
}

pub type Result<T> = std::result::Result<T, AllocError>;

/// Why a consumer could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unsatisfied {
    #[error("no available piece for {position}")]
    EmptyPosition { position: Position },

    #[error("no available piece for {position} with primary in {allowed:?}")]
    PrimaryUnavailable {
        position: Position,
        allowed: Vec<Stat>,
    },

    #[error("pinned piece {piece} for {position} is not available")]
    LockedUnavailable { position: Position, piece: PieceId },

    #[error("set {tag:?} needs {required} pieces, only {available} slots can supply one")]
    SetUnavailable {
        tag: SetTag,
        required: u8,
        available: u8,
    },

    #[error("{attribute} floor {required} unreachable, best attainable {best}")]
    FloorUnreachable {
        attribute: Attribute,
        required: i64,
        best: i64,
    },

    #[error("{attribute} ceiling {limit} exceeded, lowest attainable {lowest}")]
    CeilingExceeded {
        attribute: Attribute,
        limit: i64,
        lowest: i64,
    },

    #[error("turn order against {other} needs SPD {} {limit}", direction(.faster))]
    OrderingUnreachable {
        other: ConsumerId,
        /// True when this consumer must be faster than `other`.
        faster: bool,
        limit: i64,
    },

    #[error("no combination of available pieces satisfies every constraint")]
    CombinationNotFound,

    #[error("time budget exhausted before a feasible loadout was found")]
    BudgetExhausted,

    #[error("run cancelled before this consumer was served")]
    Cancelled,

    #[error("skipped after an earlier failure (fail-fast)")]
    Skipped,
}

fn direction(faster: &bool) -> &'static str {
    if *faster {
        "above"
    } else {
        "below"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_constraint() {
        let e = Unsatisfied::SetUnavailable {
            tag: SetTag::Violent,
            required: 4,
            available: 1,
        };
        assert!(e.to_string().contains("Violent"));

        let e = Unsatisfied::OrderingUnreachable {
            other: ConsumerId(3),
            faster: true,
            limit: 201,
        };
        assert_eq!(e.to_string(), "turn order against unit 3 needs SPD above 201");
    }
}
