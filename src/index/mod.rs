pub mod catalog;
pub mod parser;
pub mod reader;
pub mod stats;
pub mod types;

pub use catalog::Catalog;
pub use parser::{parse_search_data, ParseError};
pub use reader::{LoadOptions, SearchTable};
pub use types::*;
