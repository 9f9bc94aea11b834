//! Scoring module.
//!
//! Pure functions from equipment to numbers:
//!
//! - [`Scorer::efficiency`]: piece → efficiency percent
//! - [`Scorer::final_attributes`]: (consumer, pieces, leader) → [`AttributeSet`](crate::model::AttributeSet)
//! - [`Scorer::objective`]: weighted blend of efficiency and attribute gains
//!
//! Weight tables and normalization constants are configuration
//! ([`ScoringConfig`]); the defaults reproduce the common community
//! efficiency formula for runes and artifacts.

mod config;
mod scorer;

pub use config::{
    ArtifactEfficiencyTable, EfficiencyTable, ObjectiveWeights, ScoringConfig, SetBonus,
    SetCatalog,
};
pub use scorer::{ObjectiveProfile, Scorer};
