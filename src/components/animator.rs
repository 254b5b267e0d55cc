//! Animator components.
//!
//! An animator is an entity carrying two components:
//! - [`Animator`] – identity and configuration (the [`AnimatorSource`])
//! - [`AnimatorState`] – mutable evaluation state (RNG stream, samples and
//!   the current sampling interval)
//!
//! Animators produce a normalized value in `[0, 1]` every frame. Objects
//! consume it through [`AnimatorBinding`](super::animatorbinding::AnimatorBinding)s.
//! See [`crate::systems::animator`] for evaluation.

use bevy_ecs::prelude::Component;
use fastrand::Rng;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError, ensure_finite};

/// Stable animator identifier, unique for the lifetime of a scene.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimatorId(pub u32);

/// Easing functions for smooth interpolation.
///
/// These functions transform a linear `t` value (0.0 to 1.0) to create
/// different acceleration/deceleration curves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed (no easing).
    #[default]
    Linear,
    /// Starts slow, accelerates (quadratic).
    QuadIn,
    /// Starts fast, decelerates (quadratic).
    QuadOut,
    /// Slow start and end (quadratic).
    QuadInOut,
    /// Starts slow, accelerates (cubic).
    CubicIn,
    /// Starts fast, decelerates (cubic).
    CubicOut,
    /// Slow start and end (cubic).
    CubicInOut,
    /// Half cosine period, `(1 - cos(pi t)) / 2`.
    Cosine,
    /// Perlin's quintic fade, `6t^5 - 15t^4 + 10t^3`.
    SmoothStep,
}

impl Easing {
    /// Whether `ease(1 - t) == 1 - ease(t)`. Perlin blending stays inside
    /// its range only for these curves.
    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            Easing::Linear
                | Easing::QuadInOut
                | Easing::CubicInOut
                | Easing::Cosine
                | Easing::SmoothStep
        )
    }
}

/// Which noise flavour a [`AnimatorSource::Noise`] produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseKind {
    /// Interpolated uniform samples.
    Value,
    /// Interpolated signed gradients.
    Perlin,
}

/// Component of the pan location that drives a pan animator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanAxis {
    X,
    Y,
}

/// What an animator generates and how.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AnimatorSource {
    /// Maps one axis of the pan location inside a rectangle onto `[0, 1]`.
    Pan {
        bottom_left: Vec2,
        top_right: Vec2,
        axis: PanAxis,
    },
    /// Uniform random steps, `frequency` new values per second.
    Random { seed: u64, frequency: f32 },
    /// Smooth noise with a new sample `frequency` times per second.
    Noise {
        kind: NoiseKind,
        seed: u64,
        frequency: f32,
        easing: Easing,
    },
    /// Eased 0↔1 wave flipping `frequency` times per second.
    Oscillator { frequency: f32, easing: Easing },
}

impl AnimatorSource {
    /// Check the configuration before an animator is created or updated.
    pub fn validate(&self) -> Result<()> {
        match *self {
            AnimatorSource::Pan {
                bottom_left,
                top_right,
                ..
            } => {
                ensure_finite("pan rectangle", &[bottom_left.x, bottom_left.y])?;
                ensure_finite("pan rectangle", &[top_right.x, top_right.y])?;
                if bottom_left.x >= top_right.x || bottom_left.y >= top_right.y {
                    return Err(SceneError::InvalidParameter(format!(
                        "pan rectangle is inverted or empty: {bottom_left} .. {top_right}"
                    )));
                }
                Ok(())
            }
            AnimatorSource::Noise {
                kind: NoiseKind::Perlin,
                frequency,
                easing,
                ..
            } => {
                ensure_frequency(frequency)?;
                if !easing.is_symmetric() {
                    return Err(SceneError::InvalidParameter(format!(
                        "perlin noise needs a symmetric fade curve, got {easing:?}"
                    )));
                }
                Ok(())
            }
            AnimatorSource::Random { frequency, .. }
            | AnimatorSource::Noise { frequency, .. }
            | AnimatorSource::Oscillator { frequency, .. } => ensure_frequency(frequency),
        }
    }

    /// Seed of the RNG stream; sources without randomness use 0.
    pub fn seed(&self) -> u64 {
        match *self {
            AnimatorSource::Random { seed, .. } | AnimatorSource::Noise { seed, .. } => seed,
            AnimatorSource::Pan { .. } | AnimatorSource::Oscillator { .. } => 0,
        }
    }
}

fn ensure_frequency(frequency: f32) -> Result<()> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(())
    } else {
        Err(SceneError::InvalidParameter(format!(
            "frequency must be positive, got {frequency}"
        )))
    }
}

/// Identity and configuration of an animator.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Animator {
    pub id: AnimatorId,
    pub name: String,
    pub source: AnimatorSource,
}

/// Evaluation state of an animator.
///
/// Reset whenever the source changes and when playback is scrubbed back.
#[derive(Component, Clone, Debug)]
pub struct AnimatorState {
    pub(crate) rng: Rng,
    /// Sample the current interval starts from.
    pub previous: f32,
    /// Sample the current interval moves towards.
    pub target: f32,
    /// Start time of the current interval (the last generation time).
    pub interval_start: f32,
    /// Length of the current interval; 0 until the first evaluation.
    pub interval_length: f32,
    /// Number of interval advances since the last reset.
    pub intervals: u64,
    /// Output of the last evaluation.
    pub value: f32,
}

impl AnimatorState {
    /// Fresh state for `source`, equivalent to a reset.
    pub fn new(source: &AnimatorSource) -> Self {
        let mut state = AnimatorState {
            rng: Rng::with_seed(source.seed()),
            previous: 0.0,
            target: 0.0,
            interval_start: 0.0,
            interval_length: 0.0,
            intervals: 0,
            value: 0.0,
        };
        state.reset(source);
        state
    }

    /// Reseed the RNG stream and zero the interval state.
    pub fn reset(&mut self, source: &AnimatorSource) {
        self.rng = Rng::with_seed(source.seed());
        self.previous = 0.0;
        self.target = 0.0;
        self.interval_start = 0.0;
        self.interval_length = 0.0;
        self.intervals = 0;
        self.value = 0.0;
        // noise interpolates from a real sample right away
        if let AnimatorSource::Noise { kind, .. } = source {
            self.target = self.draw(*kind);
        }
    }

    /// Next sample of the stream: uniform `[0, 1)` for value noise, signed
    /// gradient `[-1, 1)` for perlin noise.
    pub(crate) fn draw(&mut self, kind: NoiseKind) -> f32 {
        let u = self.rng.f32();
        match kind {
            NoiseKind::Value => u,
            NoiseKind::Perlin => u * 2.0 - 1.0,
        }
    }
}
