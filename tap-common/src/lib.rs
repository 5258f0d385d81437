//! # TAP Common Library
//!
//! Shared code for the Time-and-Place harvesting tools including:
//! - Error types
//! - Configuration loading and output folder resolution
//! - The `ImageRecord` manifest model and its atomic persistence

pub mod config;
pub mod error;
pub mod manifest;

pub use error::{Error, Result};
pub use manifest::ImageRecord;
