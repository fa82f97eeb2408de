//! Core types and trait definitions for the opcon scenario console.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod drone;
pub mod enemy;
pub mod error;
pub mod model;
pub mod progress;
pub mod store;

pub use error::{Error, Result};
