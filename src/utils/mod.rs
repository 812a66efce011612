//! Utility functions shared across doxfind.
//!
//! ## Modules
//!
//! - [`app_data`] - Configuration file location and loading
//! - [`browser`] - Opening documentation pages
//! - [`encoding`] - Doxygen search-key mangling and HTML entities
//!
//! ## Key Functions
//!
//! ```
//! use doxfind::utils::{decode_search_id, unescape_html};
//!
//! assert_eq!(decode_search_id("get_5fcurrent_5fdir"), "get_current_dir");
//! assert_eq!(unescape_html("Engine &amp;engine"), "Engine &engine");
//! ```

pub mod app_data;
pub mod browser;
pub mod encoding;

pub use app_data::*;
pub use browser::*;
pub use encoding::*;
