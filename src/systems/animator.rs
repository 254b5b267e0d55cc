//! Animator evaluation.
//!
//! [`evaluate_animators`] samples every animator once per frame against an
//! [`AnimatorContext`] built from [`WorldTime`], [`SceneConfig`] and
//! [`PanInput`], and stores the result in [`AnimatorValues`] for the fast
//! update path.
//!
//! Stateful sources (random, noise, oscillator) work in sampling intervals.
//! Whenever the time has moved past the end of the current interval a new
//! sample is drawn and the interval advances by its length, as many times as
//! needed to catch up. The interval length is `1 / min(frequency,
//! sampling_rate)`. Evaluation is deterministic for a given seed, frequency
//! and sequence of times.

use bevy_ecs::prelude::*;
use glam::Vec2;
use log::debug;

use crate::components::animator::{
    Animator, AnimatorId, AnimatorSource, AnimatorState, Easing, NoiseKind, PanAxis,
};
use crate::error::{Result, SceneError};
use crate::resources::animatorregistry::{AnimatorRegistry, AnimatorValues};
use crate::resources::paninput::PanInput;
use crate::resources::sceneconfig::SceneConfig;
use crate::resources::worldtime::WorldTime;

/// Inputs shared by every animator in one evaluation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnimatorContext {
    pub time: f32,
    pub sampling_rate: f32,
    pub pan_location: Vec2,
}

/// Apply an easing function to a normalized time value.
///
/// The input `t` is clamped to [0.0, 1.0] and transformed according to the
/// easing curve.
pub fn ease(e: Easing, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match e {
        Easing::Linear => t,
        Easing::QuadIn => t * t,
        Easing::QuadOut => t * (2.0 - t),
        Easing::QuadInOut => {
            if t < 0.5 {
                2.0 * t * t
            } else {
                -1.0 + (4.0 - 2.0 * t) * t
            }
        }
        Easing::CubicIn => t * t * t,
        Easing::CubicOut => {
            let p = t - 1.0;
            p * p * p + 1.0
        }
        Easing::CubicInOut => {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                let p = 2.0 * t - 2.0;
                0.5 * p * p * p + 1.0
            }
        }
        Easing::Cosine => (1.0 - (std::f32::consts::PI * t).cos()) * 0.5,
        Easing::SmoothStep => t * t * t * (t * (t * 6.0 - 15.0) + 10.0),
    }
}

/// Linearly interpolate between two floats.
pub(crate) fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Run the catch-up loop, calling `step` once per new sample.
fn advance(
    state: &mut AnimatorState,
    frequency: f32,
    ctx: &AnimatorContext,
    mut step: impl FnMut(&mut AnimatorState),
) {
    let length = 1.0 / frequency.min(ctx.sampling_rate);
    while ctx.time - state.interval_start >= state.interval_length {
        step(state);
        if state.interval_length > 0.0 {
            let next = state.interval_start + state.interval_length;
            if next == state.interval_start {
                // f32 ran out of precision; jump instead of spinning
                state.interval_start = ctx.time;
            } else {
                state.interval_start = next;
            }
            state.intervals += 1;
        }
        state.interval_length = length;
    }
}

/// Position of `time` inside the current interval, in `[0, 1]`.
fn phase(state: &AnimatorState, time: f32) -> f32 {
    if state.interval_length > 0.0 {
        ((time - state.interval_start) / state.interval_length).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Evaluate one animator at `ctx`, advancing its state. The result is
/// always in `[0, 1]`.
pub fn evaluate(source: &AnimatorSource, state: &mut AnimatorState, ctx: &AnimatorContext) -> f32 {
    let value = match *source {
        AnimatorSource::Pan {
            bottom_left,
            top_right,
            axis,
        } => {
            let (lo, hi, v) = match axis {
                PanAxis::X => (bottom_left.x, top_right.x, ctx.pan_location.x),
                PanAxis::Y => (bottom_left.y, top_right.y, ctx.pan_location.y),
            };
            (v.clamp(lo, hi) - lo) / (hi - lo)
        }
        AnimatorSource::Random { frequency, .. } => {
            advance(state, frequency, ctx, |s| {
                s.previous = s.target;
                s.target = s.rng.f32();
            });
            state.target
        }
        AnimatorSource::Noise {
            kind,
            frequency,
            easing,
            ..
        } => {
            advance(state, frequency, ctx, |s| {
                s.previous = s.target;
                s.target = s.draw(kind);
            });
            let t = phase(state, ctx.time);
            let blend = ease(easing, t);
            match kind {
                NoiseKind::Value => lerp_f32(state.previous, state.target, blend),
                NoiseKind::Perlin => {
                    0.5 + lerp_f32(state.previous * t, state.target * (t - 1.0), blend)
                }
            }
        }
        AnimatorSource::Oscillator { frequency, easing } => {
            advance(state, frequency, ctx, |s| {
                s.previous = s.target;
                s.target = 1.0 - s.target;
            });
            let t = phase(state, ctx.time);
            lerp_f32(state.previous, state.target, ease(easing, t))
        }
    };
    let value = if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    };
    state.value = value;
    value
}

/// Sample every animator for the current frame.
pub fn evaluate_animators(
    time: Res<WorldTime>,
    config: Res<SceneConfig>,
    pan: Res<PanInput>,
    registry: Res<AnimatorRegistry>,
    mut values: ResMut<AnimatorValues>,
    mut animators: Query<(&Animator, &mut AnimatorState)>,
) {
    let ctx = AnimatorContext {
        time: time.elapsed,
        sampling_rate: config.sampling_rate,
        pan_location: pan.location,
    };
    let mut count = 0;
    for (animator, mut state) in animators.iter_mut() {
        let value = evaluate(&animator.source, &mut state, &ctx);
        if let Some(entry) = registry.get(animator.id) {
            values.set(entry.slot, value);
            count += 1;
        }
    }
    debug!("evaluate_animators: {} animators at t={}", count, ctx.time);
}

/// Reset a single animator's stream and interval state.
pub fn reset_animator(world: &mut World, id: AnimatorId) -> Result<()> {
    let entity = world
        .resource::<AnimatorRegistry>()
        .get(id)
        .ok_or(SceneError::UnknownAnimator(id))?
        .entity;
    let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
        return Err(SceneError::UnknownAnimator(id));
    };
    let source = entity_mut
        .get::<Animator>()
        .map(|a| a.source.clone())
        .ok_or(SceneError::UnknownAnimator(id))?;
    if let Some(mut state) = entity_mut.get_mut::<AnimatorState>() {
        state.reset(&source);
    }
    Ok(())
}

/// Reset every animator in the world.
pub fn reset_all_animators(world: &mut World) {
    let mut query = world.query::<(&Animator, &mut AnimatorState)>();
    for (animator, mut state) in query.iter_mut(world) {
        state.reset(&animator.source);
    }
}
