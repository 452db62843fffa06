//! Graph store backend and payload writer.
//!
//! [`memory::MemoryGraphStore`] is the reference implementation of the
//! [`graphloom_core::traits::GraphStore`] boundary: an in-memory property
//! graph with merge-by-identity writes, per-payload transactions, and JSON
//! snapshot persistence. [`writer::GraphWriter`] drives batches through any
//! store implementation.

pub mod memory;
pub mod schema;
pub mod writer;

pub use memory::MemoryGraphStore;
pub use schema::default_schema;
pub use writer::{select_primary_root, GraphWriter, WriteReport};
