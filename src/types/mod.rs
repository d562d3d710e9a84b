//! Shared types

pub mod error;

pub use error::{JananiError, Result};
