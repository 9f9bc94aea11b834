//! Allocation of a shared equipment pool across consumers.
//!
//! Given a pool of scored runes and artifacts, a roster of consumers with
//! per-consumer eligibility rules, and teams that couple consumers through
//! leader skills and turn order, the engine commits each piece to at most
//! one consumer so that the summed objective is as high as the selected
//! quality profile allows.
//!
//! - **Model**: equipment, consumers, rules and teams as read-only input
//! - **Pool**: index-addressed inventory with read-only snapshots
//! - **Scoring**: piece efficiency, final attributes and the objective
//! - **Feasibility**: pre-flight check with one specific shortfall per problem
//! - **Ordering**: turn order and speed ticks as a bound overlay
//! - **Solver**: exact branch-and-bound over allocation models
//! - **Engine**: Greedy, Refine, Global and Screened strategies
//! - **Result**: immutable, recomputed run results and an archive interface
//!
//! # Features
//!
//! - `parallel` (default): rayon-backed screening and parallel root branches
//!   in the solver. Without it the screened strategy falls back to the global
//!   one.
//! - `serde`: `Serialize`/`Deserialize` on model, config and result types.

pub mod archive;
pub mod engine;
pub mod error;
pub mod feasibility;
pub mod model;
pub mod ordering;
pub mod pool;
pub mod result;
pub mod scoring;
pub mod solver;

pub use engine::{Engine, EngineConfig, QualityProfile, Strategy};
pub use error::{AllocError, Result, Unsatisfied};
pub use result::OptimizationResult;
