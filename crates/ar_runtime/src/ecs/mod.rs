//! Component system
//!
//! Entities live in the [`EntityGraph`](crate::scene::EntityGraph); this
//! module defines what can be attached to them.

pub mod component;
pub mod components;

pub use component::{
    downcast_box, downcast_mut, downcast_ref, AsAny, Component, ComponentContext, ComponentKind,
    TypedComponent,
};
