#[macro_use]
pub mod macros;

mod codes;
mod types;

// Re-export all public types and utilities
pub use codes::ErrorCode;
pub use types::{UpsertError, UpsertResult, WrappedError};
