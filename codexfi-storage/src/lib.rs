//! # codexfi-storage
//!
//! Adapter over an embedded LanceDB vector table. One table, fixed schema,
//! string filter predicates, cosine distance. Multiple processes may hold
//! handles onto the same table directory; `refresh` re-opens the handle to
//! observe their commits.

mod schema;
mod table;

pub use table::MemoryTable;
