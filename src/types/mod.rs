//! Shared types

pub mod error;

pub use error::{PolicyError, Result};
