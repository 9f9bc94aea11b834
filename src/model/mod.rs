//! Equipment, consumer, rule and team data model.
//!
//! - **Stats**: [`Stat`] (piece-level effects), [`Attribute`] and the
//!   integer [`AttributeSet`] (consumer-level final values)
//! - **Equipment**: [`EquipmentPiece`] with its [`Position`], [`SetTag`]
//!   and rolls
//! - **Consumers**: [`Consumer`] and the [`LeaderSkill`] it grants its team
//! - **Rules**: [`EligibilityRules`] as authored, including set choices,
//!   primary filters and attribute bounds
//! - **Teams**: [`Team`] and the [`Roster`] of one run
//!
//! Everything here is read-only input to the engine.

mod consumer;
mod equipment;
mod rules;
mod stats;
mod team;

pub use consumer::{Consumer, ConsumerId, Element, LeaderSkill};
pub use equipment::{
    ArtifactSlot, EquipmentPiece, Loadout, PieceId, Position, SetSize, SetTag, StatRoll, Substat,
};
pub use rules::{
    set_counts, AttributeBound, BoundBasis, EligibilityRules, PrimaryFilter, SetChoices, SetDemand,
    SetSlot, MAX_PASSES,
};
pub use stats::{Attribute, AttributeSet, Effect, Stat};
pub use team::{Roster, RosterEntry, Team, MAX_TEAM_SIZE};
