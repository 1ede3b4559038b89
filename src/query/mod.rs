//! Query builder - predicates and resource listings

pub mod filter;
pub mod search;

pub use filter::{build_filter, build_group, Field, FilterValue, GroupOp, Operator, Predicate};
pub use search::{assemble, search, AssembledQuery, SearchOptions, SearchResults, SortKey};
