//! ECS resources made available to systems.
//!
//! This module groups the long-lived data injected into the scene world and
//! accessed by systems during execution: animator bookkeeping, observer
//! slots, configuration, timing and input. Each submodule documents the
//! semantics and intended usage of its resource(s).
//!
//! Overview
//! - `animatorregistry` – animator ids, value slots and the binding reverse index
//! - `observers` – bounded slots for lifecycle observers
//! - `paninput` – latest pan location for pan animators
//! - `sceneconfig` – engine settings loaded from an INI file
//! - `worldtime` – simulation time and delta
pub mod animatorregistry;
pub mod observers;
pub mod paninput;
pub mod sceneconfig;
pub mod worldtime;
