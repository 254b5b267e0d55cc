//! Scene core demo entry point.
//!
//! Builds a small orbiting system on top of [`scenecore::Scene`]:
//! - a ray-castable sun at the origin
//! - a planet on a spherical position whose longitude follows an oscillator
//! - a moon parented to the planet, scaled by a pan animator and tinted by
//!   value noise
//!
//! then runs the frame loop, casts a picking ray and prints a per-frame
//! report (as JSON with `--json`).
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --frames 120 --dt 0.016 --json
//! ```

use std::f32::consts::{FRAC_PI_2, TAU};
use std::path::PathBuf;

use bevy_ecs::prelude::Entity;
use clap::Parser;
use glam::{Vec2, Vec3};
use serde::Serialize;

use scenecore::components::animator::{AnimatorSource, Easing, NoiseKind, PanAxis};
use scenecore::components::animatorbinding::{AnimatableProperty, AnimatorBinding};
use scenecore::components::orientation::{EulerOrder, Orientation};
use scenecore::components::position::Position;
use scenecore::components::raycastable::{Ray, RayCastable, RayHit};
use scenecore::components::scale::Scale;
use scenecore::components::tint::Tint;
use scenecore::events::change::TrackedComponent;
use scenecore::resources::sceneconfig::SceneConfig;
use scenecore::{Result, Scene};

/// Scene core demo
#[derive(Parser)]
#[command(version, about = "Runs a procedural orbit scene and reports world transforms.")]
struct Cli {
    /// INI configuration file ([animation] and [picking] sections).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Unscaled seconds per frame.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Seed for the animators and the simulated pan input.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct FrameReport {
    frame: u64,
    time: f32,
    planet: [f32; 3],
    moon: [f32; 3],
    moon_scale: f32,
    moon_tint: [f32; 4],
}

#[derive(Serialize)]
struct Report {
    frames: Vec<FrameReport>,
    pick: Option<RayHit>,
}

struct Demo {
    sun: Entity,
    planet: Entity,
    moon: Entity,
}

fn build_demo(scene: &mut Scene, seed: u64) -> Result<Demo> {
    let sun = scene.spawn_node();
    scene.make_position(sun, Position::new(0.0, 0.0, 0.0))?;
    scene.make_scale(sun, Scale::Uniform(1.0))?;
    scene.set_raycastable(sun, RayCastable::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0)))?;

    let planet = scene.spawn_node();
    scene.set_parent(planet, Some(sun))?;
    scene.make_position(
        planet,
        Position::Spherical {
            origin: Vec3::ZERO,
            radius: 5.0,
            longitude: 0.0,
            latitude: FRAC_PI_2,
        },
    )?;
    scene.make_orientation(planet, Orientation::euler(0.0, 0.0, 0.0, EulerOrder::Xyz))?;

    let moon = scene.spawn_node();
    scene.set_parent(moon, Some(planet))?;
    scene.make_position(moon, Position::new(1.5, 0.0, 0.0))?;
    scene.make_scale(moon, Scale::Uniform(0.25))?;
    scene.set_tint(moon, Tint::new(1.0, 1.0, 1.0, 1.0))?;

    let orbit = scene.make_animator(
        "orbit",
        AnimatorSource::Oscillator {
            frequency: 0.25,
            easing: Easing::SmoothStep,
        },
    )?;
    let spin = scene.make_animator(
        "spin",
        AnimatorSource::Noise {
            kind: NoiseKind::Perlin,
            seed,
            frequency: 2.0,
            easing: Easing::SmoothStep,
        },
    )?;
    let zoom = scene.make_animator(
        "zoom",
        AnimatorSource::Pan {
            bottom_left: Vec2::splat(-1.0),
            top_right: Vec2::splat(1.0),
            axis: PanAxis::X,
        },
    )?;
    let flicker = scene.make_animator(
        "flicker",
        AnimatorSource::Noise {
            kind: NoiseKind::Value,
            seed: seed.wrapping_add(1),
            frequency: 4.0,
            easing: Easing::Cosine,
        },
    )?;

    scene.bind_animator(
        planet,
        AnimatableProperty::PositionLongitude,
        AnimatorBinding::new(orbit, 0.0, TAU),
    )?;
    scene.bind_animator(
        planet,
        AnimatableProperty::EulerY,
        AnimatorBinding::new(spin, -1.0, 1.0),
    )?;
    scene.bind_animator(
        moon,
        AnimatableProperty::ScaleUniform,
        AnimatorBinding::new(zoom, 0.1, 0.4),
    )?;
    scene.bind_animator(
        moon,
        AnimatableProperty::ColorR,
        AnimatorBinding::new(flicker, 0.5, 1.0),
    )?;

    Ok(Demo { sun, planet, moon })
}

fn run(cli: &Cli) -> Result<Report> {
    let config = match &cli.config {
        Some(path) => {
            let mut config = SceneConfig::with_path(path);
            if let Err(e) = config.load_from_file() {
                log::warn!("{}; using defaults", e);
            }
            config
        }
        None => SceneConfig::new(),
    };
    let mut scene = Scene::with_config(config)?;

    scene.observe_did_emerge(TrackedComponent::AnimatorBinding, |event| {
        log::debug!("bound {:?} on {:?}", event.property, event.entity);
    })?;

    let demo = build_demo(&mut scene, cli.seed)?;
    log::info!(
        "Demo scene: sun {:?}, planet {:?}, moon {:?}",
        demo.sun,
        demo.planet,
        demo.moon
    );

    let mut rng = fastrand::Rng::with_seed(cli.seed);
    let mut pan = Vec2::ZERO;
    let mut frames = Vec::with_capacity(cli.frames as usize);
    for _ in 0..cli.frames {
        pan = (pan + Vec2::new(rng.f32() - 0.5, rng.f32() - 0.5) * 0.2)
            .clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
        scene.set_pan_location(pan);
        scene.run_frame(cli.dt)?;

        let time = scene.time();
        let planet = scene.world_position(demo.planet)?;
        let moon = scene.world_position(demo.moon)?;
        frames.push(FrameReport {
            frame: time.frame_count,
            time: time.elapsed,
            planet: planet.to_array(),
            moon: moon.to_array(),
            moon_scale: scene.world_scale(demo.moon)?.x,
            moon_tint: scene
                .effective_tint(demo.moon)
                .unwrap_or(glam::Vec4::ONE)
                .to_array(),
        });
    }

    let pick = scene.pick(&Ray::new(Vec3::new(0.25, 0.5, -10.0), Vec3::Z));
    Ok(Report { frames, pick })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let report = match run(&cli) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    for f in &report.frames {
        println!(
            "#{:<4} t={:>7.3}  planet=({:>6.2}, {:>6.2}, {:>6.2})  moon=({:>6.2}, {:>6.2}, {:>6.2})  scale={:.3}  red={:.3}",
            f.frame,
            f.time,
            f.planet[0],
            f.planet[1],
            f.planet[2],
            f.moon[0],
            f.moon[1],
            f.moon[2],
            f.moon_scale,
            f.moon_tint[0],
        );
    }
    match report.pick {
        Some(hit) => println!("pick: {:?} at t={:.3}", hit.entity, hit.t),
        None => println!("pick: nothing"),
    }
}
