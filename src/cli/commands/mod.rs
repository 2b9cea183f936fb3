//! CLI command implementations.

mod config;
mod import;
mod list;
mod mcp;
mod search;
mod serve;

pub use config::run_config;
pub use import::run_import;
pub use list::run_list;
pub use mcp::run_mcp;
pub use search::{run_search, SearchArgs};
pub use serve::run_serve;
