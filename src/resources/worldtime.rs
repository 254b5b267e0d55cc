//! Scene clock.
//!
//! Advanced by [`update_world_time`](crate::systems::time::update_world_time)
//! once per frame and moved directly by
//! [`seek_world_time`](crate::systems::time::seek_world_time). Animators are
//! evaluated at `elapsed`.
use bevy_ecs::prelude::Resource;

#[derive(Resource, Clone, Copy, Debug)]
pub struct WorldTime {
    /// Scaled seconds since the scene started (or since the last seek).
    pub elapsed: f32,
    /// Scaled length of the last frame.
    pub delta: f32,
    pub time_scale: f32,
    /// Frames run so far; seeking does not change it.
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        Self::with_time_scale(1.0)
    }
}

impl WorldTime {
    pub fn with_time_scale(time_scale: f32) -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale,
            frame_count: 0,
        }
    }
}
