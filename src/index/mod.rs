//! Directory indexing
//!
//! Walks the browse root and produces the flat, deduplicated listing served
//! by `GET /browse`.

mod entry;
mod indexer;

pub use entry::*;
pub use indexer::*;
