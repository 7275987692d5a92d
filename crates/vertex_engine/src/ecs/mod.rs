//! Entity-component layer
//!
//! Entities are named containers owned by a [`Scene`](crate::scene::Scene).
//! Components are trait objects with lifecycle hooks; the scene drives the
//! hooks and hands each one a [`ComponentContext`].

pub mod entity;
pub mod component;
pub mod context;
pub mod components;

pub use entity::{Entity, EntityId};
pub use component::{Capabilities, Component, ComponentError, LifecyclePhase};
pub use context::ComponentContext;
