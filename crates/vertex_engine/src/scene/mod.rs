//! Scene management
//!
//! A [`Scene`] owns entities and their transforms and drives component
//! lifecycles once per tick.
//!
//! ## Frame flow
//!
//! ```text
//! Scene::update
//!      ↓ sync: pending adds become live, pending removes are destroyed
//!      ↓ update every enabled component of every active live entity
//! Scene::render
//!      ↓ main camera → view / projection
//!      ↓ every enabled renderable draws at its world matrix
//! ```
//!
//! Transforms live in a [`TransformTree`] arena keyed by [`TransformId`];
//! world matrices are cached and rebuilt lazily after a local change.

mod registry;
mod scene_graph;

#[cfg(test)]
mod tests;

pub use registry::{ComponentFailure, Scene, SceneError, DEFAULT_SCENE_NAME};
pub use scene_graph::{HierarchyError, TransformId, TransformMut, TransformTree};
