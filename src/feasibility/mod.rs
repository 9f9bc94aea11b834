//! Feasibility validator.
//!
//! Runs before the engine commits anything and returns every specific
//! [`Shortfall`] it finds, in check order. The engine refuses to run on a
//! report that is not [feasible](FeasibilityReport::is_feasible).

mod types;
mod validator;

pub use types::{FeasibilityReport, Shortfall};
pub use validator::validate;
