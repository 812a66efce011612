//! # doxfind - Doxygen Search Index Browser
//!
//! doxfind loads the JavaScript search index Doxygen writes next to its HTML
//! output (`search/<section>_<hex>.js` shards plus `searchdata.js`) and
//! answers case-insensitive substring lookups over it, from the command line
//! or an interactive terminal UI.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Shard parsing, the section catalog, and the loaded search table
//! - [`query`] - Query parsing and lookup over the table
//! - [`tui`] - Interactive search box (`interactive` feature)
//! - [`output`] - Plain, colored and JSON result formatting
//! - [`utils`] - Key mangling, configuration, opening pages
//!
//! ## Quick Start
//!
//! ```
//! use doxfind::index::{parse_search_data, SearchTable};
//! use doxfind::query::lookup;
//!
//! let shard = r#"var searchData=
//! [
//!   ['generateid',['generateID',['../class_material_manager.html#a1',1,'MaterialManager']]],
//!   ['getnumber',['getNumber',['../class_button.html#a2',1,'Button']]]
//! ];"#;
//!
//! let table = SearchTable::from_records(parse_search_data(shard).unwrap());
//! let found = lookup(&table, "GEN");
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].name, "generateID");
//! ```
//!
//! On disk, [`index::SearchTable::open`] accepts the documentation root, the
//! `html` directory, the `search` directory itself, or a single shard file.

pub mod index;
pub mod output;
pub mod query;
#[cfg(feature = "interactive")]
pub mod tui;
pub mod utils;
