//! Result builder.
//!
//! [`ResultBuilder`] turns the committed pool of a finished run into one
//! immutable [`OptimizationResult`]: per-consumer loadouts, final
//! attributes, objectives and diagnoses, plus per-team leader bonuses.

mod builder;
mod types;

pub use builder::{ResultBuilder, RunSummary};
pub use types::{ConsumerReport, OptimizationResult, TeamSummary};
