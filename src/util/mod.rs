//! Utility types for motion-tables.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
