//! Plan cache keys built from parameterized trees
//!
//! Only the key lives here. Storing and selecting cached plans belongs to
//! the query planner.

mod key;

pub use key::{KeyError, PlanCacheKey};
