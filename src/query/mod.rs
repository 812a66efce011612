pub mod executor;
pub mod parser;

pub use executor::{literal_hits, lookup, Hit, QueryExecutor};
pub use parser::parse_query;
// Re-exports for public API
#[allow(unused_imports)]
pub use parser::{Query, QueryFilters, QueryNode, QueryOptions};
