//! Database module for PostgreSQL persistence.

mod owners;
mod pool;
mod records;

pub use owners::*;
pub use pool::*;
pub use records::*;
