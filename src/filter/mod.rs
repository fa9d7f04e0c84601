//! Resort filtering
//!
//! - state: the filter values behind the filter bar
//! - predicates: one pure test per dimension and their AND-composition
//! - engine: memoized recomputation of the filtered resort list

pub mod engine;
pub mod predicates;
pub mod state;

pub use engine::FilterEngine;
pub use predicates::{FilterCriteria, Predicate};
pub use state::{ActiveDistance, DistanceQuery, FilterDefaults, FilterPanel, FilterState, PriceRange};
