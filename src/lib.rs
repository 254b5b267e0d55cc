//! Scene core library.
//!
//! A hierarchical 3D transformation engine on top of `bevy_ecs`, with
//! procedural animators bound to node properties and ray picking.
//!
//! This module exposes the engine's ECS components, resources, systems, and
//! events, plus the [`scene::Scene`] context that ties them together.

pub mod components;
pub mod error;
pub mod events;
pub mod resources;
pub mod scene;
pub mod systems;

pub use error::{Result, SceneError};
pub use scene::Scene;
