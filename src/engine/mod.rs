//! Assignment engine.
//!
//! The engine owns the [`Pool`](crate::pool::Pool) for a run and drives one
//! of four strategies behind the [`AssignmentStrategy`] interface:
//!
//! - [`GreedyStrategy`]: consumers in serving order, first loadout that meets
//!   every constraint
//! - [`RefineStrategy`]: greedy, then replacement and swap passes that
//!   strictly improve the summed objective
//! - [`GlobalStrategy`]: one joint branch-and-bound model over everyone
//! - [`ScreenStrategy`]: parallel screening of serving orders, then
//!   refinement of the survivors
//!
//! Strategies never touch scoring, feasibility or result building; they all
//! share the same [`RunContext`].

mod config;
mod context;
mod diagnose;
mod global;
mod greedy;
mod progress;
mod refine;
mod runner;
mod screen;
mod types;

pub use config::{EngineConfig, QualityProfile, ScreeningConfig, Strategy};
pub use context::{ActiveBound, MemberInfo, RunContext};
pub use global::GlobalStrategy;
pub use greedy::GreedyStrategy;
pub use progress::{ChannelObserver, ProgressEvent, ProgressObserver, ProgressPhase, RunControl};
pub use refine::RefineStrategy;
pub use runner::{strategy_impl, Engine, RunOutcome};
pub use screen::ScreenStrategy;
pub use types::{Allocation, Assignment, AssignmentStrategy};
