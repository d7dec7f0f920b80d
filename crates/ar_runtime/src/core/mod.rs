//! # Core Module
//!
//! Shared runtime configuration used by every subsystem constructor.

pub mod config;

pub use config::{
    AnimationConfig,
    Config,
    ConfigError,
    ConfigIssue,
    CoordinatorConfig,
    GestureConfig,
    PhysicsConfig,
    RuntimeConfig,
    Severity,
};
