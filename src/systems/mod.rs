//! Engine systems.
//!
//! This module groups the ECS systems and world-level helpers that advance
//! the scene each frame and maintain the transformation tree.
//!
//! Submodules overview
//! - [`animator`] – evaluate procedural animators into [`AnimatorValues`](crate::resources::animatorregistry::AnimatorValues)
//! - [`animatorbinding`] – fast update path driven by animator outputs
//! - [`hierarchy`] – reparenting, ancestor queries and the lazy world-matrix query
//! - [`propagate_transforms`] – dirty-flag driven transform recomputation
//! - [`raycast`] – ray/box and ray/triangle tests and scene picking
//! - [`time`] – update simulation time and delta

pub mod animator;
pub mod animatorbinding;
pub mod hierarchy;
pub mod propagate_transforms;
pub mod raycast;
pub mod time;
