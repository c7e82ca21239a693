// ABOUTME: Tool module - registry, groups, preferences, filtering, and search.
// ABOUTME: Decides which tools exist, who owns them, and which ones the model sees.

mod catalog;
mod filter;
mod group;
mod preferences;
mod registry;
mod result;
mod search;
mod traits;

pub use catalog::*;
pub use filter::*;
pub use group::*;
pub use preferences::*;
pub use registry::*;
pub use result::*;
pub use search::{search, terms, SearchHit};
pub use traits::*;
