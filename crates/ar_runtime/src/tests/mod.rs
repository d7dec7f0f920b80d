//! Cross-module scenario tests
//!
//! Unit tests live beside the code they cover. The scenarios here drive
//! several subsystems together the way a host application would.

mod animation_scenarios;
mod physics_scenarios;
