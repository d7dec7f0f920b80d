//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the runtime:
//! - Math types and operations
//! - Handle types and collections
//! - Frame-rate counting
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod time;
pub mod logging;
