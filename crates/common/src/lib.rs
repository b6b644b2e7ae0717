//! Shared domain types, grid math, collaborator traits, and error
//! definitions for the weather-alarm service.

pub mod error;
pub mod grid;
pub mod store;
pub mod text;
pub mod types;

pub use error::Error;
pub use grid::GridCell;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
