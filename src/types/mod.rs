//! Shared types for Sluice

pub mod error;

pub use error::{Result, SluiceError};
