//! Request handlers.

mod auth;
mod records;
mod sync;

pub use auth::*;
pub use records::*;
pub use sync::*;
