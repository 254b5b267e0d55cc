//! ECS components for scene nodes and animators.
//!
//! This module groups all component types that can be attached to entities in
//! the scene world. Components define data such as placement, the computed
//! matrices, procedural animators and their bindings, and pickable geometry.
//!
//! Submodules overview:
//! - [`animator`] – procedural value generators and their evaluation state
//! - [`animatorbinding`] – per-property animator bindings and the fast-path record
//! - [`orientation`] – euler, look-at and axis-pair orientations
//! - [`position`] – cartesian, linear, spherical and cylindrical positions
//! - [`raycastable`] – triangle geometry and ray types for picking
//! - [`scale`] – per-axis or uniform scale
//! - [`tint`] – authoritative and animated RGBA tint
//! - [`transformation`] – local/world matrices and intrusive tree links

pub mod animator;
pub mod animatorbinding;
pub mod orientation;
pub mod position;
pub mod raycastable;
pub mod scale;
pub mod tint;
pub mod transformation;
