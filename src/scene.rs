//! The scene context.
//!
//! [`Scene`] owns the bevy `World` holding every scene node and animator,
//! the per-frame schedules, and the resources the systems share
//! (animator registry and values, binding index, observer slots,
//! configuration, time and pan input). All editing goes through it so that
//! dirty flags, the binding index, animator records and lifecycle
//! notifications stay consistent.
//!
//! # Frame
//!
//! [`Scene::run_frame`] advances [`WorldTime`] and runs, in order:
//! 1. [`evaluate_animators`] – sample every animator
//! 2. [`propagate_dirty_transforms`] – recompute edited nodes and subtrees
//! 3. [`update_animators_only`] – apply animator outputs to bound nodes
//!
//! Afterwards the renderer reads [`Transformation::global`],
//! [`Transformation::is_mirroring`] and [`EffectiveTint`].
//!
//! # Editing
//!
//! Make / Update / Destroy calls validate their input and return
//! [`SceneError`] instead of changing anything when it is rejected. Observers
//! registered with [`Scene::observe_did_emerge`], [`Scene::observe_will_change`]
//! and [`Scene::observe_will_perish`] run synchronously inside those calls.

use bevy_ecs::observer::Observer;
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec2, Vec3};
use log::{debug, info};
use smallvec::SmallVec;

use crate::components::animator::{Animator, AnimatorId, AnimatorSource, AnimatorState};
use crate::components::animatorbinding::{
    AnimatableProperty, AnimatorBinding, AnimatorBindings, PropertyOwner,
};
use crate::components::orientation::Orientation;
use crate::components::position::Position;
use crate::components::raycastable::{Ray, RayCastable, RayHit};
use crate::components::scale::Scale;
use crate::components::tint::{EffectiveTint, Tint};
use crate::components::transformation::{DirtyFlag, Transformation, is_mirroring};
use crate::error::{Result, SceneError, ensure_finite};
use crate::events::change::{ChangeEvent, DidEmerge, TrackedComponent, WillChange, WillPerish};
use crate::resources::animatorregistry::{AnimatorBindingIndex, AnimatorRegistry, AnimatorValues};
use crate::resources::observers::{ChangeObservers, ObserverToken};
use crate::resources::paninput::PanInput;
use crate::resources::sceneconfig::SceneConfig;
use crate::resources::worldtime::WorldTime;
use crate::systems::animator::{self, AnimatorContext, evaluate_animators};
use crate::systems::animatorbinding::{rebuild_record, update_animators_only};
use crate::systems::hierarchy;
use crate::systems::propagate_transforms::propagate_dirty_transforms;
use crate::systems::raycast;
use crate::systems::time::{seek_world_time, update_world_time};

/// Tracked component whose representation an animatable property lives in.
/// Tint is not tracked.
fn owning_component(property: AnimatableProperty) -> Option<TrackedComponent> {
    match property.owner() {
        PropertyOwner::Position => Some(TrackedComponent::Position),
        PropertyOwner::Orientation => Some(TrackedComponent::Orientation),
        PropertyOwner::Scale => Some(TrackedComponent::Scale),
        PropertyOwner::Tint => None,
    }
}

/// Scene graph, animators and the frame loop over them.
pub struct Scene {
    world: World,
    frame: Schedule,
    dirty_pass: Schedule,
    fast_pass: Schedule,
}

impl Default for Scene {
    fn default() -> Self {
        Self::build(SceneConfig::new())
    }
}

impl Scene {
    /// Empty scene with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty scene with `config`, rejected if it does not validate.
    pub fn with_config(config: SceneConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SceneConfig) -> Self {
        let mut world = World::new();
        world.insert_resource(WorldTime::with_time_scale(config.time_scale));
        world.insert_resource(AnimatorRegistry::new());
        world.insert_resource(AnimatorValues::default());
        world.insert_resource(AnimatorBindingIndex::default());
        world.insert_resource(ChangeObservers::default());
        world.insert_resource(PanInput::default());
        info!(
            "Scene created: sampling_rate={}, time_scale={}",
            config.sampling_rate, config.time_scale
        );
        world.insert_resource(config);

        let mut frame = Schedule::default();
        frame.add_systems(
            (
                evaluate_animators,
                propagate_dirty_transforms,
                update_animators_only,
            )
                .chain(),
        );
        let mut dirty_pass = Schedule::default();
        dirty_pass.add_systems(propagate_dirty_transforms);
        let mut fast_pass = Schedule::default();
        fast_pass.add_systems(update_animators_only);

        Self {
            world,
            frame,
            dirty_pass,
            fast_pass,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for renderers and tools. Editing scene components
    /// through it bypasses dirty tracking and notifications.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &SceneConfig {
        self.world.resource::<SceneConfig>()
    }

    pub fn time(&self) -> WorldTime {
        *self.world.resource::<WorldTime>()
    }

    pub fn set_time_scale(&mut self, time_scale: f32) -> Result<()> {
        ensure_finite("time scale", &[time_scale])?;
        if time_scale < 0.0 {
            return Err(SceneError::InvalidParameter(format!(
                "time scale must be non-negative, got {time_scale}"
            )));
        }
        self.world.resource_mut::<WorldTime>().time_scale = time_scale;
        Ok(())
    }

    pub fn set_pan_location(&mut self, location: Vec2) {
        self.world.resource_mut::<PanInput>().location = location;
    }

    // ==================== FRAME ====================

    /// Advance time by `dt` unscaled seconds and run the frame passes.
    /// A negative or non-finite `dt` is rejected before anything runs.
    pub fn run_frame(&mut self, dt: f32) -> Result<()> {
        ensure_finite("frame delta", &[dt])?;
        if dt < 0.0 {
            return Err(SceneError::InvalidParameter(format!(
                "frame delta must be non-negative, got {dt}"
            )));
        }
        update_world_time(&mut self.world, dt);
        self.frame.run(&mut self.world);
        self.world.clear_trackers();
        Ok(())
    }

    /// Run only the dirty-propagation pass.
    pub fn update_transforms(&mut self) {
        self.dirty_pass.run(&mut self.world);
    }

    /// Run only the animator fast path with the last evaluated values.
    pub fn update_animators_only(&mut self) {
        self.fast_pass.run(&mut self.world);
    }

    /// Set the clock to `time`. Scrubbing backwards resets every animator so
    /// replaying gives the same values as the first time.
    pub fn seek(&mut self, time: f32) -> Result<()> {
        ensure_finite("seek time", &[time])?;
        if time < 0.0 {
            return Err(SceneError::InvalidParameter(format!(
                "seek time must be non-negative, got {time}"
            )));
        }
        if seek_world_time(&mut self.world, time) {
            animator::reset_all_animators(&mut self.world);
            debug!("seek back to {time}: animators reset");
        }
        Ok(())
    }

    // ==================== TREE ====================

    /// Spawn a root scene node with identity transform.
    pub fn spawn_node(&mut self) -> Entity {
        self.world.spawn((Transformation::default(), DirtyFlag)).id()
    }

    pub fn is_node(&self, entity: Entity) -> bool {
        self.world.get::<Transformation>(entity).is_some()
    }

    fn require_node(&self, entity: Entity) -> Result<()> {
        if self.is_node(entity) {
            Ok(())
        } else {
            Err(SceneError::UnknownEntity(entity))
        }
    }

    pub fn set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<()> {
        hierarchy::set_parent(&mut self.world, entity, parent)
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        hierarchy::parent_of(&self.world, entity)
    }

    pub fn children(&self, entity: Entity) -> SmallVec<[Entity; 8]> {
        hierarchy::children_of(&self.world, entity)
    }

    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        hierarchy::is_ancestor(&self.world, ancestor, entity)
    }

    pub fn transformation(&self, entity: Entity) -> Option<&Transformation> {
        self.world.get::<Transformation>(entity)
    }

    /// Current world matrix, correct even before the next pass.
    pub fn global(&self, entity: Entity) -> Result<Mat4> {
        hierarchy::global_matrix(&self.world, entity)
    }

    pub fn is_mirroring(&self, entity: Entity) -> Result<bool> {
        Ok(is_mirroring(&self.global(entity)?))
    }

    pub fn world_position(&self, entity: Entity) -> Result<Vec3> {
        Ok(self.global(entity)?.w_axis.truncate())
    }

    /// Length of each world-space axis; the scale accumulated from the root.
    pub fn world_scale(&self, entity: Entity) -> Result<Vec3> {
        let m = self.global(entity)?;
        Ok(Vec3::new(
            m.x_axis.truncate().length(),
            m.y_axis.truncate().length(),
            m.z_axis.truncate().length(),
        ))
    }

    /// Unbind, notify and despawn `entity` and everything below it.
    pub fn destroy_object(&mut self, entity: Entity) -> Result<()> {
        self.require_node(entity)?;
        let nodes = hierarchy::subtree(&self.world, entity);
        for &node in &nodes {
            for property in self.bound_properties(node) {
                self.unbind_animator(node, property)?;
            }
            if self.world.get::<Position>(node).is_some() {
                self.notify_will_perish(node, TrackedComponent::Position, None);
            }
            if self.world.get::<Orientation>(node).is_some() {
                self.notify_will_perish(node, TrackedComponent::Orientation, None);
            }
            if self.world.get::<Scale>(node).is_some() {
                self.notify_will_perish(node, TrackedComponent::Scale, None);
            }
        }
        hierarchy::detach(&mut self.world, entity);
        for &node in nodes.iter().rev() {
            self.world.despawn(node);
        }
        debug!("destroyed {:?} with {} nodes", entity, nodes.len());
        Ok(())
    }

    // ==================== NOTIFICATIONS ====================

    fn notify_did_emerge(
        &mut self,
        entity: Entity,
        component: TrackedComponent,
        property: Option<AnimatableProperty>,
    ) {
        self.world.trigger(DidEmerge {
            entity,
            component,
            property,
        });
    }

    fn notify_will_change(
        &mut self,
        entity: Entity,
        component: TrackedComponent,
        property: Option<AnimatableProperty>,
    ) {
        self.world.trigger(WillChange {
            entity,
            component,
            property,
        });
    }

    fn notify_will_perish(
        &mut self,
        entity: Entity,
        component: TrackedComponent,
        property: Option<AnimatableProperty>,
    ) {
        self.world.trigger(WillPerish {
            entity,
            component,
            property,
        });
    }

    fn observe<E: ChangeEvent>(
        &mut self,
        component: TrackedComponent,
        callback: impl Fn(&E) + Send + Sync + 'static,
    ) -> Result<ObserverToken> {
        self.world
            .resource::<ChangeObservers>()
            .ensure_free(component, E::PHASE)?;
        let observer = self
            .world
            .spawn(Observer::new(move |trigger: On<E>| {
                let event = trigger.event();
                if event.component() == component {
                    callback(event);
                }
            }))
            .id();
        self.world.flush();
        self.world
            .resource_mut::<ChangeObservers>()
            .insert(component, E::PHASE, observer)
    }

    /// Call `callback` after a `component` is attached.
    pub fn observe_did_emerge(
        &mut self,
        component: TrackedComponent,
        callback: impl Fn(&DidEmerge) + Send + Sync + 'static,
    ) -> Result<ObserverToken> {
        self.observe(component, callback)
    }

    /// Call `callback` before a `component` receives a new value.
    pub fn observe_will_change(
        &mut self,
        component: TrackedComponent,
        callback: impl Fn(&WillChange) + Send + Sync + 'static,
    ) -> Result<ObserverToken> {
        self.observe(component, callback)
    }

    /// Call `callback` before a `component` is removed.
    pub fn observe_will_perish(
        &mut self,
        component: TrackedComponent,
        callback: impl Fn(&WillPerish) + Send + Sync + 'static,
    ) -> Result<ObserverToken> {
        self.observe(component, callback)
    }

    /// Detach an observer. Returns `false` for an unknown or already removed
    /// token.
    pub fn remove_observer(&mut self, token: ObserverToken) -> bool {
        if !self.world.resource_mut::<ChangeObservers>().remove(token) {
            return false;
        }
        self.world.despawn(token.observer);
        true
    }

    // ==================== POSITION / ORIENTATION / SCALE ====================

    /// Properties of `entity` that no longer exist on `owner`'s new value.
    fn stranded_binding(
        &self,
        entity: Entity,
        owner: TrackedComponent,
        applies: impl Fn(AnimatableProperty) -> bool,
    ) -> Option<AnimatableProperty> {
        self.world
            .get::<AnimatorBindings>(entity)?
            .iter()
            .map(|(property, _)| *property)
            .find(|p| owning_component(*p) == Some(owner) && !applies(*p))
    }

    fn make_tracked<C: Component>(
        &mut self,
        entity: Entity,
        value: C,
        component: TrackedComponent,
    ) -> Result<()> {
        self.world.entity_mut(entity).insert((value, DirtyFlag));
        self.notify_did_emerge(entity, component, None);
        Ok(())
    }

    fn update_tracked<C: Component>(
        &mut self,
        entity: Entity,
        value: C,
        component: TrackedComponent,
    ) -> Result<()> {
        if self.world.get::<C>(entity).is_none() {
            return Err(SceneError::MissingComponent { entity, component });
        }
        self.notify_will_change(entity, component, None);
        self.world.entity_mut(entity).insert((value, DirtyFlag));
        Ok(())
    }

    fn destroy_tracked<C: Component>(
        &mut self,
        entity: Entity,
        component: TrackedComponent,
    ) -> Result<()> {
        self.require_node(entity)?;
        if self.world.get::<C>(entity).is_none() {
            return Err(SceneError::MissingComponent { entity, component });
        }
        for property in self.bound_properties(entity) {
            if owning_component(property) == Some(component) {
                self.unbind_animator(entity, property)?;
            }
        }
        self.notify_will_perish(entity, component, None);
        let mut entity_mut = self.world.entity_mut(entity);
        entity_mut.remove::<C>();
        entity_mut.insert(DirtyFlag);
        Ok(())
    }

    /// Attach a position, or update it when one is already present.
    pub fn make_position(&mut self, entity: Entity, position: Position) -> Result<()> {
        if self.world.get::<Position>(entity).is_some() {
            return self.update_position(entity, position);
        }
        position.validate()?;
        self.require_node(entity)?;
        self.make_tracked(entity, position, TrackedComponent::Position)
    }

    /// Replace the position. Bindings must still apply to the new
    /// representation.
    pub fn update_position(&mut self, entity: Entity, position: Position) -> Result<()> {
        position.validate()?;
        self.require_node(entity)?;
        if let Some(property) = self.stranded_binding(entity, TrackedComponent::Position, |p| {
            p.read_position(&position).is_some()
        }) {
            return Err(SceneError::UnknownBinding { entity, property });
        }
        self.update_tracked(entity, position, TrackedComponent::Position)
    }

    /// Remove the position, unbinding its channels first.
    pub fn destroy_position(&mut self, entity: Entity) -> Result<()> {
        self.destroy_tracked::<Position>(entity, TrackedComponent::Position)
    }

    pub fn position(&self, entity: Entity) -> Option<&Position> {
        self.world.get::<Position>(entity)
    }

    pub fn make_orientation(&mut self, entity: Entity, orientation: Orientation) -> Result<()> {
        if self.world.get::<Orientation>(entity).is_some() {
            return self.update_orientation(entity, orientation);
        }
        orientation.validate()?;
        self.require_node(entity)?;
        self.make_tracked(entity, orientation, TrackedComponent::Orientation)
    }

    pub fn update_orientation(&mut self, entity: Entity, orientation: Orientation) -> Result<()> {
        orientation.validate()?;
        self.require_node(entity)?;
        if let Some(property) =
            self.stranded_binding(entity, TrackedComponent::Orientation, |p| {
                p.read_orientation(&orientation).is_some()
            })
        {
            return Err(SceneError::UnknownBinding { entity, property });
        }
        self.update_tracked(entity, orientation, TrackedComponent::Orientation)
    }

    pub fn destroy_orientation(&mut self, entity: Entity) -> Result<()> {
        self.destroy_tracked::<Orientation>(entity, TrackedComponent::Orientation)
    }

    pub fn orientation(&self, entity: Entity) -> Option<&Orientation> {
        self.world.get::<Orientation>(entity)
    }

    pub fn make_scale(&mut self, entity: Entity, scale: Scale) -> Result<()> {
        if self.world.get::<Scale>(entity).is_some() {
            return self.update_scale(entity, scale);
        }
        scale.validate()?;
        self.require_node(entity)?;
        self.make_tracked(entity, scale, TrackedComponent::Scale)
    }

    pub fn update_scale(&mut self, entity: Entity, scale: Scale) -> Result<()> {
        scale.validate()?;
        self.require_node(entity)?;
        if let Some(property) = self.stranded_binding(entity, TrackedComponent::Scale, |p| {
            p.read_scale(&scale).is_some()
        }) {
            return Err(SceneError::UnknownBinding { entity, property });
        }
        self.update_tracked(entity, scale, TrackedComponent::Scale)
    }

    pub fn destroy_scale(&mut self, entity: Entity) -> Result<()> {
        self.destroy_tracked::<Scale>(entity, TrackedComponent::Scale)
    }

    pub fn scale(&self, entity: Entity) -> Option<&Scale> {
        self.world.get::<Scale>(entity)
    }

    // ==================== TINT ====================

    /// Attach or replace the tint. The effective tint follows immediately;
    /// bound colour channels are re-applied by the next fast pass.
    pub fn set_tint(&mut self, entity: Entity, tint: Tint) -> Result<()> {
        ensure_finite("tint", &tint.color.to_array())?;
        self.require_node(entity)?;
        self.world
            .entity_mut(entity)
            .insert((tint, EffectiveTint(tint.color)));
        if self.world.get::<AnimatorBindings>(entity).is_some() {
            rebuild_record(&mut self.world, entity);
        }
        Ok(())
    }

    /// Remove the tint, unbinding colour channels first.
    pub fn remove_tint(&mut self, entity: Entity) -> Result<()> {
        self.require_node(entity)?;
        for property in self.bound_properties(entity) {
            if property.color_channel().is_some() {
                self.unbind_animator(entity, property)?;
            }
        }
        self.world
            .entity_mut(entity)
            .remove::<(Tint, EffectiveTint)>();
        Ok(())
    }

    pub fn tint(&self, entity: Entity) -> Option<&Tint> {
        self.world.get::<Tint>(entity)
    }

    pub fn effective_tint(&self, entity: Entity) -> Option<glam::Vec4> {
        self.world.get::<EffectiveTint>(entity).map(|t| t.0)
    }

    // ==================== RAY CASTING ====================

    pub fn set_raycastable(&mut self, entity: Entity, castable: RayCastable) -> Result<()> {
        self.require_node(entity)?;
        self.world.entity_mut(entity).insert(castable);
        Ok(())
    }

    pub fn remove_raycastable(&mut self, entity: Entity) -> Result<()> {
        self.require_node(entity)?;
        self.world.entity_mut(entity).remove::<RayCastable>();
        Ok(())
    }

    /// Closest hit of `ray`, after bringing every world matrix up to date.
    pub fn ray_cast_scene(&mut self, ray: &Ray, tolerance: f32) -> Option<RayHit> {
        self.update_transforms();
        self.update_animators_only();
        raycast::ray_cast(&mut self.world, ray, tolerance.max(0.0))
    }

    /// [`Scene::ray_cast_scene`] with the configured tolerance.
    pub fn pick(&mut self, ray: &Ray) -> Option<RayHit> {
        let tolerance = self.config().ray_tolerance;
        self.ray_cast_scene(ray, tolerance)
    }

    // ==================== ANIMATORS ====================

    /// Create an animator. Names are optional; a later animator with the same
    /// name takes over name lookups.
    pub fn make_animator(&mut self, name: &str, source: AnimatorSource) -> Result<AnimatorId> {
        source.validate()?;
        let (id, slot) = self.world.resource_mut::<AnimatorRegistry>().allocate();
        let state = AnimatorState::new(&source);
        let entity = self
            .world
            .spawn((
                Animator {
                    id,
                    name: name.to_string(),
                    source,
                },
                state,
            ))
            .id();
        self.world
            .resource_mut::<AnimatorRegistry>()
            .register(id, slot, entity, name);
        self.world.resource_mut::<AnimatorValues>().set(slot, 0.0);
        self.notify_did_emerge(entity, TrackedComponent::Animator, None);
        debug!("animator {:?} '{}' in slot {}", id, name, slot);
        Ok(id)
    }

    /// Replace an animator's source; its state restarts from scratch.
    pub fn update_animator(&mut self, id: AnimatorId, source: AnimatorSource) -> Result<()> {
        source.validate()?;
        let entity = self.animator_entity(id)?;
        self.notify_will_change(entity, TrackedComponent::Animator, None);
        let mut entity_mut = self.world.entity_mut(entity);
        if let Some(mut state) = entity_mut.get_mut::<AnimatorState>() {
            state.reset(&source);
        }
        if let Some(mut animator) = entity_mut.get_mut::<Animator>() {
            animator.source = source;
        }
        Ok(())
    }

    pub fn rename_animator(&mut self, id: AnimatorId, name: &str) -> Result<()> {
        let entity = self.animator_entity(id)?;
        self.notify_will_change(entity, TrackedComponent::Animator, None);
        if let Some(mut animator) = self.world.get_mut::<Animator>(entity) {
            animator.name = name.to_string();
        }
        self.world.resource_mut::<AnimatorRegistry>().rename(id, name);
        Ok(())
    }

    /// Destroy an animator, force-unbinding every binding that uses it.
    pub fn destroy_animator(&mut self, id: AnimatorId) -> Result<()> {
        let entry = self
            .world
            .resource::<AnimatorRegistry>()
            .get(id)
            .ok_or(SceneError::UnknownAnimator(id))?;
        let dependents = self.world.resource::<AnimatorBindingIndex>().dependents(id);
        for &(entity, property) in &dependents {
            self.unbind_animator(entity, property)?;
        }
        debug_assert_eq!(self.world.resource::<AnimatorBindingIndex>().count(id), 0);

        self.notify_will_perish(entry.entity, TrackedComponent::Animator, None);
        self.world.resource_mut::<AnimatorRegistry>().unregister(id);
        self.world.resource_mut::<AnimatorValues>().set(entry.slot, 0.0);
        self.world.despawn(entry.entity);
        debug!(
            "destroyed animator {:?}, {} bindings released",
            id,
            dependents.len()
        );
        Ok(())
    }

    fn animator_entity(&self, id: AnimatorId) -> Result<Entity> {
        self.world
            .resource::<AnimatorRegistry>()
            .get(id)
            .map(|entry| entry.entity)
            .ok_or(SceneError::UnknownAnimator(id))
    }

    pub fn animator(&self, id: AnimatorId) -> Option<&Animator> {
        let entity = self.animator_entity(id).ok()?;
        self.world.get::<Animator>(entity)
    }

    pub fn animator_state(&self, id: AnimatorId) -> Option<&AnimatorState> {
        let entity = self.animator_entity(id).ok()?;
        self.world.get::<AnimatorState>(entity)
    }

    pub fn animator_by_name(&self, name: &str) -> Option<AnimatorId> {
        self.world.resource::<AnimatorRegistry>().find_by_name(name)
    }

    /// Output of the animator's last evaluation.
    pub fn animator_value(&self, id: AnimatorId) -> Result<f32> {
        let entry = self
            .world
            .resource::<AnimatorRegistry>()
            .get(id)
            .ok_or(SceneError::UnknownAnimator(id))?;
        Ok(self.world.resource::<AnimatorValues>().get(entry.slot))
    }

    /// Evaluate one animator at `time` outside the frame loop. The result is
    /// stored like a frame evaluation would.
    pub fn evaluate_animator(&mut self, id: AnimatorId, time: f32) -> Result<f32> {
        ensure_finite("time", &[time])?;
        let entry = self
            .world
            .resource::<AnimatorRegistry>()
            .get(id)
            .ok_or(SceneError::UnknownAnimator(id))?;
        let ctx = AnimatorContext {
            time,
            sampling_rate: self.config().sampling_rate,
            pan_location: self.world.resource::<PanInput>().location,
        };
        let mut entity_mut = self
            .world
            .get_entity_mut(entry.entity)
            .map_err(|_| SceneError::UnknownAnimator(id))?;
        let source = entity_mut
            .get::<Animator>()
            .map(|a| a.source.clone())
            .ok_or(SceneError::UnknownAnimator(id))?;
        let mut state = entity_mut
            .get_mut::<AnimatorState>()
            .ok_or(SceneError::UnknownAnimator(id))?;
        let value = animator::evaluate(&source, &mut state, &ctx);
        self.world
            .resource_mut::<AnimatorValues>()
            .set(entry.slot, value);
        Ok(value)
    }

    pub fn reset_animator(&mut self, id: AnimatorId) -> Result<()> {
        animator::reset_animator(&mut self.world, id)
    }

    pub fn reset_all_animators(&mut self) {
        animator::reset_all_animators(&mut self.world);
    }

    // ==================== BINDINGS ====================

    fn property_applies(&self, entity: Entity, property: AnimatableProperty) -> bool {
        if property.color_channel().is_some() {
            return self.world.get::<Tint>(entity).is_some();
        }
        self.world
            .get::<Position>(entity)
            .is_some_and(|p| property.read_position(p).is_some())
            || self
                .world
                .get::<Orientation>(entity)
                .is_some_and(|o| property.read_orientation(o).is_some())
            || self
                .world
                .get::<Scale>(entity)
                .is_some_and(|s| property.read_scale(s).is_some())
    }

    fn bound_properties(&self, entity: Entity) -> SmallVec<[AnimatableProperty; 4]> {
        self.world
            .get::<AnimatorBindings>(entity)
            .map(|b| b.iter().map(|(p, _)| *p).collect())
            .unwrap_or_default()
    }

    /// Drive `property` of `entity` from an animator. Replaces an existing
    /// binding of the same property.
    pub fn bind_animator(
        &mut self,
        entity: Entity,
        property: AnimatableProperty,
        binding: AnimatorBinding,
    ) -> Result<()> {
        ensure_finite("binding range", &[binding.value_at_0, binding.value_at_1])?;
        self.require_node(entity)?;
        if !self.world.resource::<AnimatorRegistry>().contains(binding.animator) {
            return Err(SceneError::UnknownAnimator(binding.animator));
        }
        if !self.property_applies(entity, property) {
            return Err(SceneError::UnknownBinding { entity, property });
        }

        let existing = self
            .world
            .get::<AnimatorBindings>(entity)
            .and_then(|b| b.get(property).copied());
        if existing.is_some() {
            self.notify_will_change(entity, TrackedComponent::AnimatorBinding, Some(property));
        }

        let mut bindings = self
            .world
            .get::<AnimatorBindings>(entity)
            .cloned()
            .unwrap_or_default();
        bindings.insert(property, binding);
        self.world.entity_mut(entity).insert(bindings);

        let mut index = self.world.resource_mut::<AnimatorBindingIndex>();
        if let Some(old) = existing {
            index.remove(old.animator, entity, property);
        }
        index.add(binding.animator, entity, property);

        rebuild_record(&mut self.world, entity);
        if property.affects_transform() {
            self.world.entity_mut(entity).insert(DirtyFlag);
        }
        if existing.is_none() {
            self.notify_did_emerge(entity, TrackedComponent::AnimatorBinding, Some(property));
        }
        Ok(())
    }

    /// Remove the binding of `property`, returning it. The property falls
    /// back to its component value on the next pass.
    pub fn unbind_animator(
        &mut self,
        entity: Entity,
        property: AnimatableProperty,
    ) -> Result<AnimatorBinding> {
        let binding = self
            .world
            .get::<AnimatorBindings>(entity)
            .and_then(|b| b.get(property).copied())
            .ok_or(SceneError::UnknownBinding { entity, property })?;

        self.notify_will_perish(entity, TrackedComponent::AnimatorBinding, Some(property));

        let now_empty = match self.world.get_mut::<AnimatorBindings>(entity) {
            Some(mut bindings) => {
                bindings.remove(property);
                bindings.is_empty()
            }
            None => true,
        };
        if now_empty {
            self.world.entity_mut(entity).remove::<AnimatorBindings>();
        }
        self.world
            .resource_mut::<AnimatorBindingIndex>()
            .remove(binding.animator, entity, property);

        rebuild_record(&mut self.world, entity);
        if property.affects_transform() {
            self.world.entity_mut(entity).insert(DirtyFlag);
        }
        Ok(binding)
    }

    pub fn binding(&self, entity: Entity, property: AnimatableProperty) -> Option<AnimatorBinding> {
        self.world
            .get::<AnimatorBindings>(entity)?
            .get(property)
            .copied()
    }

    pub fn bindings(&self, entity: Entity) -> Option<&AnimatorBindings> {
        self.world.get::<AnimatorBindings>(entity)
    }

    /// `(object, property)` pairs bound to `id`.
    pub fn dependents(&self, id: AnimatorId) -> Vec<(Entity, AnimatableProperty)> {
        self.world
            .resource::<AnimatorBindingIndex>()
            .dependents(id)
            .into_vec()
    }
}
