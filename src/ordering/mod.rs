//! Ordering constraint resolver.
//!
//! Converts team turn order into [`OrderingLink`]s and speed ticks into
//! absolute SPD bounds, collected in a [`ResolvedRules`] overlay that sits
//! next to the authored [`EligibilityRules`](crate::model::EligibilityRules).
//! Strategies materialize a link into an ordinary SPD floor or ceiling once
//! the partner's SPD is known, so no strategy needs its own turn-order logic.

mod resolver;
mod ticks;

pub use resolver::{resolve, DerivedBounds, OrderingLink, ResolvedRules};
pub use ticks::TickTable;
