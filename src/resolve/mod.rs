//! Resolution of mapping entries into a pack tree.
//!
//! - [`resolve_path`] turns a target convention into an output path
//! - [`OutputTree`] applies conflict policies as files are committed
//! - [`MappingResolver`] drives expansion and the ordered commit pass
//! - [`stage`] writes the finished tree and swaps it into place

mod mapping;
mod merge;
mod path;
mod stage;
mod tree;

pub use mapping::MappingResolver;
pub use merge::merge_json;
pub use path::{resolve_path, DestinationRules};
pub use stage::{stage, write_tree};
pub use tree::{CommitOutcome, OutputFile, OutputTree};
