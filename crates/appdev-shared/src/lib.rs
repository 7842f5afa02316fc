//! # AppDev Shared
//!
//! Shared types, errors and configuration for AppDev.
//! This crate provides the foundation types used by the core engine.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use crate::config::*;
pub use crate::error::*;
pub use crate::types::*;
