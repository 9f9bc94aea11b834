//! Equipment pool.
//!
//! The [`Pool`] is the only mutable shared resource of a run. It is moved
//! into the engine for the run's duration and handed back with the result.
//! Parallel phases read a [`PoolSnapshot`] and work on private sandboxes.

mod inventory;
mod snapshot;

pub use inventory::{PieceIdx, Pool};
pub use snapshot::PoolSnapshot;
