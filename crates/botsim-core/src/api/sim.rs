use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::types::{EntityId, Pose};
use crate::components::controller::Controller;
use crate::components::entity::Entity;
use crate::components::render::{HeadlessRenderer, RenderBackend};
use crate::core::body::build_body;
use crate::core::joint::JointHandle;
use crate::core::object::AuxJoint;
use crate::core::physics::PhysicsWorld;
use crate::core::scene::Container;
use crate::core::time::{StepTarget, Stepper};
use crate::core::units::to_engine_vec;
use crate::error::{Result, SimError};
use crate::spec::EntitySpec;

/// Simulation settings, provided by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed physics tick in milliseconds (default: 1000/60).
    pub timestep_ms: f32,
    /// Gravity in cm/s². Default: zero, the arena is seen from above.
    pub gravity: Vec2,
    /// Force bound of friction joints.
    pub friction_joint_max_force: f32,
    /// Spring stiffness of mouse joints.
    pub mouse_joint_stiffness: f32,
    /// Spring damping of mouse joints.
    pub mouse_joint_damping: f32,
    /// Force bound of mouse joints, per axis.
    pub mouse_joint_max_force: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            timestep_ms: 1000.0 / 60.0,
            gravity: Vec2::ZERO,
            friction_joint_max_force: 500_000.0,
            mouse_joint_stiffness: 100.0,
            mouse_joint_damping: 10.0,
            mouse_joint_max_force: 100_000.0,
        }
    }
}

impl SimConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can drive a simulation.
    pub fn validate(&self) -> Result<()> {
        Stepper::new(self.timestep_ms)?;
        if !self.gravity.is_finite() {
            return Err(SimError::InvalidConfig("gravity must be finite"));
        }
        Ok(())
    }

    pub fn with_timestep_ms(mut self, timestep_ms: f32) -> Self {
        self.timestep_ms = timestep_ms;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }
}

/// The scene root: owns the physics world, every entity, and the stepper.
///
/// Entities live in an id-keyed arena. Ownership is the tree formed by the
/// root container and each entity's child container.
pub struct Simulation {
    config: SimConfig,
    physics: PhysicsWorld,
    entities: HashMap<EntityId, Entity>,
    root: Container,
    renderer: Box<dyn RenderBackend>,
    stepper: Stepper,
    leftover_ms: f32,
    next_id: u32,
}

impl Simulation {
    /// Create a simulation with a headless renderer.
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::with_renderer(config, Box::new(HeadlessRenderer::new()))
    }

    /// Fails with [`SimError::InvalidConfig`] if the config cannot drive a
    /// simulation.
    pub fn with_renderer(config: SimConfig, renderer: Box<dyn RenderBackend>) -> Result<Self> {
        config.validate()?;
        let stepper = Stepper::new(config.timestep_ms)?;
        let mut physics = PhysicsWorld::new(to_engine_vec(config.gravity));
        physics.set_dt(stepper.timestep_secs());
        log::info!(
            "simulation created: timestep {} ms, gravity {:?} cm/s²",
            config.timestep_ms,
            config.gravity
        );
        Ok(Self {
            config,
            physics,
            entities: HashMap::new(),
            root: Container::new(),
            renderer,
            stepper,
            leftover_ms: 0.0,
            next_id: 1,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn get(&self, id: EntityId) -> Result<&Entity> {
        self.entities.get(&id).ok_or(SimError::UnknownEntity(id))
    }

    fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities.get_mut(&id).ok_or(SimError::UnknownEntity(id))
    }

    // -- Construction --

    /// Build `spec` and all of its children. With `parent`, the new entity is
    /// attached through [`Self::add_child`]; otherwise it becomes a root.
    ///
    /// All or nothing: if any entity of the tree fails to build, everything
    /// built so far is destroyed before the error is returned.
    pub fn spawn(&mut self, spec: &EntitySpec, parent: Option<EntityId>) -> Result<EntityId> {
        if let Some(p) = parent {
            self.get(p)?;
        }
        let physics = build_body(&mut self.physics, spec)?;
        let id = self.next_id();
        let mirror = self.renderer.create_mirror(id, spec);
        let mut entity = Entity::new(id, physics, mirror).with_label(spec.label.clone());
        entity.sync(&self.physics);
        self.entities.insert(id, entity);

        match parent {
            Some(p) => {
                if let Err(err) = self.add_child(p, id) {
                    self.discard(id);
                    return Err(err);
                }
            }
            None => {
                self.root.add_child(id);
                self.renderer.register(id);
            }
        }
        log::debug!("spawned {:?} ({:?}) under {:?}", id, spec.label, parent);

        for child in &spec.children {
            if let Err(err) = self.spawn(child, Some(id)) {
                log::warn!("spawn of {:?} failed in a child, rolling back: {}", spec.label, err);
                self.discard(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Unlink `id` from its owner and destroy its subtree.
    fn discard(&mut self, id: EntityId) {
        match self.parent_of(id) {
            Some(p) => {
                if let Some(parent) = self.entities.get_mut(&p) {
                    parent.children.remove_child(id);
                }
            }
            None => {
                self.root.remove_child(id);
            }
        }
        self.destroy_tree(id);
    }

    /// Make `child` a child of `parent` and joint their bodies.
    ///
    /// `child` must currently be a root. Returns the joint, or `None` if the
    /// engine refused to create one; the ownership link is made either way.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<Option<JointHandle>> {
        if parent == child {
            return Err(SimError::InvalidHierarchy("an entity cannot own itself"));
        }
        let child_entity = self.get(child)?;
        self.get(parent)?;
        if child_entity.parent.is_some() {
            return Err(SimError::InvalidHierarchy("child already has a parent"));
        }
        if self.is_ancestor(child, parent) {
            return Err(SimError::InvalidHierarchy("link would create a cycle"));
        }

        self.root.remove_child(child);
        if let Some(p) = self.entities.get_mut(&parent) {
            p.children.add_child(child);
        }

        let joint = match (self.entities.get(&parent), self.entities.get(&child)) {
            (Some(p), Some(c)) => p.physics().attach(&mut self.physics, c.physics()),
            _ => None,
        };

        let child_entity = self.entities.get_mut(&child).ok_or(SimError::UnknownEntity(child))?;
        child_entity.parent = Some(parent);
        child_entity.joint = joint;
        child_entity.sync(&self.physics);
        self.renderer.register(child);
        Ok(joint)
    }

    fn is_ancestor(&self, ancestor: EntityId, mut id: EntityId) -> bool {
        while let Some(parent) = self.entities.get(&id).and_then(|e| e.parent) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    // -- Teardown --

    /// Detach `child` from `parent`. With `destroy`, the child and all of
    /// its descendants are destroyed; otherwise the joint is removed and the
    /// child becomes a root.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId, destroy: bool) -> Result<()> {
        let removed = self.get_mut(parent)?.children.remove_child(child);
        if !removed {
            return Err(SimError::InvalidHierarchy("not a child of this parent"));
        }
        self.release(child, destroy);
        Ok(())
    }

    /// Detach every child of `parent`, destroying them if asked.
    pub fn clear_children(&mut self, parent: EntityId, destroy: bool) -> Result<()> {
        let children = self.get_mut(parent)?.children.clear();
        for child in children {
            self.release(child, destroy);
        }
        Ok(())
    }

    /// Destroy an entity and everything it owns.
    pub fn despawn(&mut self, id: EntityId) -> Result<()> {
        let parent = self.get(id)?.parent;
        match parent {
            Some(p) => self.remove_child(p, id, true),
            None => {
                self.root.remove_child(id);
                self.destroy_tree(id);
                Ok(())
            }
        }
    }

    /// Destroy every entity.
    pub fn clear(&mut self) {
        for id in self.root.clear() {
            self.destroy_tree(id);
        }
    }

    fn release(&mut self, child: EntityId, destroy: bool) {
        if destroy {
            self.destroy_tree(child);
            return;
        }
        let Some(entity) = self.entities.get_mut(&child) else { return };
        entity.parent = None;
        if let Some(joint) = entity.joint.take() {
            self.physics.remove_joint(joint.raw());
        }
        self.root.add_child(child);
    }

    fn destroy_tree(&mut self, id: EntityId) {
        let Some(mut entity) = self.entities.remove(&id) else { return };
        for child in entity.children.clear() {
            self.destroy_tree(child);
        }
        self.renderer.unregister(id);
        entity.destroy(&mut self.physics);
        log::debug!("destroyed {:?}", id);
    }

    // -- Lookup --

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn roots(&self) -> &[EntityId] {
        self.root.children()
    }

    pub fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(&id).and_then(|e| e.parent)
    }

    pub fn children_of(&self, id: EntityId) -> &[EntityId] {
        self.entities.get(&id).map(|e| e.children()).unwrap_or(&[])
    }

    /// Find the entity with the given label, depth first from the roots.
    pub fn find_by_label(&self, label: &str) -> Option<EntityId> {
        let mut stack: Vec<EntityId> = self.root.children().iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(entity) = self.entities.get(&id) else { continue };
            if entity.label.as_deref() == Some(label) {
                return Some(id);
            }
            stack.extend(entity.children().iter().rev().copied());
        }
        None
    }

    pub fn set_controller(&mut self, id: EntityId, controller: Box<dyn Controller>) -> Result<()> {
        self.get_mut(id)?.set_controller(controller);
        Ok(())
    }

    // -- Pose and forces, in authoring units --

    pub fn pose(&self, id: EntityId) -> Result<Pose> {
        Ok(self.get(id)?.pose(&self.physics))
    }

    pub fn position(&self, id: EntityId) -> Result<Vec2> {
        Ok(self.get(id)?.position(&self.physics))
    }

    pub fn angle(&self, id: EntityId) -> Result<f32> {
        Ok(self.get(id)?.angle(&self.physics))
    }

    pub fn set_position(&mut self, id: EntityId, pos: Vec2) -> Result<()> {
        let entity = self.entities.get_mut(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.set_position(&mut self.physics, pos);
        Ok(())
    }

    pub fn set_angle(&mut self, id: EntityId, angle: f32) -> Result<()> {
        let entity = self.entities.get_mut(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.set_angle(&mut self.physics, angle);
        Ok(())
    }

    pub fn apply_force(&mut self, id: EntityId, force: Vec2, point: Option<Vec2>) -> Result<()> {
        let entity = self.entities.get(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.apply_force(&mut self.physics, force, point);
        Ok(())
    }

    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec2, point: Option<Vec2>) -> Result<()> {
        let entity = self.entities.get(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.apply_impulse(&mut self.physics, impulse, point);
        Ok(())
    }

    pub fn linear_velocity_at(&self, id: EntityId, point: Option<Vec2>) -> Result<Vec2> {
        Ok(self.get(id)?.physics().linear_velocity_at(&self.physics, point))
    }

    pub fn lateral_velocity_at(&self, id: EntityId, point: Option<Vec2>) -> Result<Vec2> {
        Ok(self.get(id)?.physics().lateral_velocity_at(&self.physics, point))
    }

    pub fn angular_velocity(&self, id: EntityId) -> Result<f32> {
        Ok(self.get(id)?.physics().angular_velocity(&self.physics))
    }

    pub fn set_linear_velocity(&mut self, id: EntityId, vel: Vec2) -> Result<()> {
        let entity = self.entities.get(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.physics().set_linear_velocity(&mut self.physics, vel);
        Ok(())
    }

    pub fn set_angular_velocity(&mut self, id: EntityId, vel: f32) -> Result<()> {
        let entity = self.entities.get(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.physics().set_angular_velocity(&mut self.physics, vel);
        Ok(())
    }

    // -- Auxiliary joints --

    /// Add a friction joint at a world point, bounded by the configured force.
    pub fn add_friction_joint(&mut self, id: EntityId, point: Vec2) -> Result<Option<AuxJoint>> {
        let max_force = self.config.friction_joint_max_force;
        let entity = self.entities.get_mut(&id).ok_or(SimError::UnknownEntity(id))?;
        Ok(entity.physics_mut().add_friction_joint(&mut self.physics, point, max_force))
    }

    /// Start dragging an entity from a world point.
    pub fn add_mouse_joint(&mut self, id: EntityId, target: Vec2) -> Result<Option<AuxJoint>> {
        let SimConfig {
            mouse_joint_stiffness,
            mouse_joint_damping,
            mouse_joint_max_force,
            ..
        } = self.config;
        let entity = self.entities.get_mut(&id).ok_or(SimError::UnknownEntity(id))?;
        Ok(entity.physics_mut().add_mouse_joint(
            &mut self.physics,
            target,
            mouse_joint_stiffness,
            mouse_joint_damping,
            mouse_joint_max_force,
        ))
    }

    pub fn set_mouse_target(&mut self, id: EntityId, aux: &AuxJoint, target: Vec2) -> Result<()> {
        let entity = self.entities.get(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.physics().set_mouse_target(&mut self.physics, aux, target);
        Ok(())
    }

    pub fn remove_aux_joint(&mut self, id: EntityId, aux: AuxJoint) -> Result<()> {
        let entity = self.entities.get_mut(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.physics_mut().remove_aux_joint(&mut self.physics, aux);
        Ok(())
    }

    // -- Stepping --

    /// Run whole fixed ticks out of `elapsed_ms`; returns the unused time.
    pub fn advance(&mut self, elapsed_ms: f32) -> f32 {
        let stepper = self.stepper;
        stepper.advance(self, elapsed_ms)
    }

    /// Drive one rendered frame: tick physics with the carried remainder,
    /// then run the per-frame `update` hooks.
    pub fn frame(&mut self, elapsed_ms: f32) {
        let total = self.leftover_ms + elapsed_ms;
        self.leftover_ms = self.advance(total);
        self.update(elapsed_ms / 1000.0);
    }

    /// Time carried into the next [`Self::frame`].
    pub fn leftover_ms(&self) -> f32 {
        self.leftover_ms
    }

    /// Per-frame hook for every entity, parents before children.
    pub fn update(&mut self, dt_secs: f32) {
        for id in self.root.children().to_vec() {
            self.walk(id, &mut |entity, world| entity.update(world, dt_secs));
        }
    }

    /// Visit `id` and then its descendants depth first, in child order.
    fn walk(&mut self, id: EntityId, visit: &mut dyn FnMut(&mut Entity, &mut PhysicsWorld)) {
        let children = match self.entities.get_mut(&id) {
            Some(entity) => {
                visit(entity, &mut self.physics);
                entity.children().to_vec()
            }
            None => return,
        };
        for child in children {
            self.walk(child, visit);
        }
    }
}

impl StepTarget for Simulation {
    fn before_physics_step(&mut self, dt_secs: f32) {
        for id in self.root.children().to_vec() {
            self.walk(id, &mut |entity, world| entity.before_physics_step(world, dt_secs));
        }
    }

    fn physics_step(&mut self, dt_secs: f32) {
        self.physics.set_dt(dt_secs);
        self.physics.step();
    }

    fn after_physics_step(&mut self, dt_secs: f32) {
        for id in self.root.children().to_vec() {
            self.walk(id, &mut |entity, world| entity.after_physics_step(world, dt_secs));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::components::controller::ControlContext;
    use crate::components::render::RenderMirror;
    use crate::spec::{BodyPhysicsSpec, EntityShapeSpec, JointKind, JointSpec, ShapeKind};

    type Log = Rc<RefCell<Vec<String>>>;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    fn chassis() -> EntitySpec {
        EntitySpec::new(Vec2::ZERO, 0.0)
            .with_label("chassis")
            .with_shape(EntityShapeSpec::boxed(Vec2::new(20.0, 20.0)))
    }

    fn arm() -> EntitySpec {
        EntitySpec::new(Vec2::new(5.0, 0.0), 0.0)
            .with_label("arm")
            .with_joint(JointSpec::revolute().relative_to_parent())
            .with_shape(EntityShapeSpec::boxed(Vec2::new(4.0, 2.0)))
    }

    fn sim_with_timestep(timestep_ms: f32) -> Simulation {
        Simulation::new(SimConfig::default().with_timestep_ms(timestep_ms)).unwrap()
    }

    struct RecordingMirror {
        id: EntityId,
        log: Rc<RefCell<Vec<(EntityId, &'static str, Pose)>>>,
    }

    impl RenderMirror for RecordingMirror {
        fn sync(&mut self, pose: Pose) {
            self.log.borrow_mut().push((self.id, "sync", pose));
        }

        fn after_physics_step(&mut self, pose: Pose, _dt_secs: f32) {
            self.log.borrow_mut().push((self.id, "step", pose));
        }

        fn destroy(&mut self) {
            self.log.borrow_mut().push((self.id, "destroy", Pose::default()));
        }
    }

    #[derive(Default, Clone)]
    struct RecordingBackend {
        poses: Rc<RefCell<Vec<(EntityId, &'static str, Pose)>>>,
        registered: Rc<RefCell<Vec<EntityId>>>,
    }

    impl RenderBackend for RecordingBackend {
        fn create_mirror(&mut self, id: EntityId, _spec: &EntitySpec) -> Box<dyn RenderMirror> {
            Box::new(RecordingMirror {
                id,
                log: self.poses.clone(),
            })
        }

        fn register(&mut self, id: EntityId) {
            self.registered.borrow_mut().push(id);
        }

        fn unregister(&mut self, id: EntityId) {
            self.registered.borrow_mut().retain(|r| *r != id);
        }
    }

    struct Tracer {
        name: &'static str,
        log: Log,
    }

    impl Controller for Tracer {
        fn before_physics_step(&mut self, _ctx: &mut ControlContext<'_>, _dt_secs: f32) {
            self.log.borrow_mut().push(format!("before:{}", self.name));
        }

        fn after_physics_step(&mut self, _ctx: &mut ControlContext<'_>, _dt_secs: f32) {
            self.log.borrow_mut().push(format!("after:{}", self.name));
        }

        fn update(&mut self, _ctx: &mut ControlContext<'_>, _dt_secs: f32) {
            self.log.borrow_mut().push(format!("update:{}", self.name));
        }
    }

    struct Thruster(Vec2);

    impl Controller for Thruster {
        fn before_physics_step(&mut self, ctx: &mut ControlContext<'_>, _dt_secs: f32) {
            let force = self.0;
            ctx.apply_force(force, Some(Vec2::new(3.0, 0.0)));
        }
    }

    #[test]
    fn config_defaults_and_json_overrides() {
        let config = SimConfig::default();
        assert!((config.timestep_ms - 1000.0 / 60.0).abs() < 1e-6);
        assert_eq!(config.gravity, Vec2::ZERO);
        assert_eq!(config.friction_joint_max_force, 500_000.0);

        let config = SimConfig::from_json(r#"{ "timestep_ms": 10, "gravity": [0, -981] }"#).unwrap();
        assert_eq!(config.timestep_ms, 10.0);
        assert_eq!(config.gravity, Vec2::new(0.0, -981.0));
        assert_eq!(config.friction_joint_max_force, 500_000.0);

        assert!(matches!(SimConfig::from_json("{ nope"), Err(SimError::Spec(_))));
    }

    #[test]
    fn unusable_timesteps_are_rejected() {
        for json in [r#"{ "timestep_ms": 0 }"#, r#"{ "timestep_ms": -16 }"#] {
            assert!(
                matches!(SimConfig::from_json(json), Err(SimError::InvalidConfig(_))),
                "{} should be refused",
                json
            );
        }
        let config = SimConfig::default().with_timestep_ms(0.0);
        assert!(matches!(Simulation::new(config), Err(SimError::InvalidConfig(_))));
        let config = SimConfig::default().with_gravity(Vec2::new(f32::NAN, 0.0));
        assert!(matches!(Simulation::new(config), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn default_rate_ticks_the_same_for_any_frame_split() {
        let mut whole = Simulation::new(SimConfig::default()).unwrap();
        whole.frame(1000.0);

        let mut chunked = Simulation::new(SimConfig::default()).unwrap();
        for _ in 0..100 {
            chunked.frame(10.0);
        }

        assert_eq!(whole.physics().step_count(), 60);
        assert_eq!(chunked.physics().step_count(), whole.physics().step_count());
    }

    #[test]
    fn failed_child_rolls_back_the_whole_tree() {
        let backend = RecordingBackend::default();
        let registered = backend.registered.clone();
        let mut sim = Simulation::with_renderer(SimConfig::default(), Box::new(backend)).unwrap();
        let keep = sim.spawn(&chassis(), None).unwrap();

        let broken = arm().with_shape(EntityShapeSpec::new(ShapeKind::Polygon {
            verts: vec![Vec2::ZERO],
        }));
        let spec = chassis().with_child(arm().with_child(broken.clone()));
        assert!(matches!(sim.spawn(&spec, None), Err(SimError::InvalidGeometry { .. })));

        assert_eq!(sim.len(), 1);
        assert_eq!(sim.roots(), [keep]);
        assert_eq!(sim.physics().body_count(), 1);
        assert_eq!(sim.physics().joint_count(), 0);
        assert_eq!(*registered.borrow(), [keep]);

        // Same under an existing parent: the parent survives, the subtree does not.
        let nested = arm().with_child(arm()).with_child(arm().with_child(broken));
        assert!(sim.spawn(&nested, Some(keep)).is_err());
        assert_eq!(sim.len(), 1);
        assert!(sim.children_of(keep).is_empty());
        assert_eq!(sim.physics().body_count(), 1);
        assert_eq!(sim.physics().joint_count(), 0);
    }

    #[test]
    fn velocity_setters_reach_the_body() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let id = sim.spawn(&chassis(), None).unwrap();
        sim.set_linear_velocity(id, Vec2::new(0.5, -0.25)).unwrap();
        sim.set_angular_velocity(id, 1.5).unwrap();
        assert!(close(sim.linear_velocity_at(id, None).unwrap(), Vec2::new(0.5, -0.25)));
        assert!((sim.angular_velocity(id).unwrap() - 1.5).abs() < 1e-6);
        assert!(matches!(
            sim.set_angular_velocity(EntityId(99), 1.0),
            Err(SimError::UnknownEntity(_))
        ));
    }

    #[test]
    fn chassis_with_arm_builds_two_bodies_and_one_joint() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let root = sim.spawn(&chassis().with_child(arm()), None).unwrap();

        assert_eq!(sim.len(), 2);
        assert_eq!(sim.physics().body_count(), 2);
        assert_eq!(sim.physics().joint_count(), 1);
        assert_eq!(sim.roots(), [root]);

        let arm_id = sim.children_of(root)[0];
        assert_eq!(sim.parent_of(arm_id), Some(root));
        let joint = sim.entity(arm_id).unwrap().joint().unwrap();
        assert_eq!(joint.kind, JointKind::Revolute);
        assert!(close(sim.position(arm_id).unwrap(), Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn relative_children_follow_rotated_parent() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let root = sim.spawn(&chassis(), None).unwrap();
        sim.set_position(root, Vec2::new(10.0, 10.0)).unwrap();
        sim.set_angle(root, 90.0).unwrap();

        let arm_id = sim.spawn(&arm(), Some(root)).unwrap();
        assert!(close(sim.position(arm_id).unwrap(), Vec2::new(10.0, 15.0)));
        assert!((sim.angle(arm_id).unwrap() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn spawn_from_json_tree() {
        let json = r#"{
            "label": "bot",
            "pos": [0, 0],
            "shapes": [{ "type": "box", "size": [20, 20] }],
            "children": [
                {
                    "label": "wheel",
                    "pos": [-10, 0],
                    "physics": { "joint": { "type": "revolute", "transformToParent": true } },
                    "shapes": [{ "type": "circle", "radius": 3 }]
                },
                {
                    "label": "marker",
                    "pos": [0, 5],
                    "shapes": [{ "type": "path", "verts": [[0, 0], [1, 1]], "width": 1 }]
                }
            ]
        }"#;
        let spec = EntitySpec::from_json(json).unwrap();
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let bot = sim.spawn(&spec, None).unwrap();

        assert_eq!(sim.len(), 3);
        assert_eq!(sim.find_by_label("bot"), Some(bot));
        let wheel = sim.find_by_label("wheel").unwrap();
        let marker = sim.find_by_label("marker").unwrap();
        assert_eq!(sim.children_of(bot), [wheel, marker]);
        assert_eq!(sim.entity(marker).unwrap().physics().skipped_shapes(), 1);
        assert_eq!(sim.find_by_label("nothing"), None);
    }

    #[test]
    fn mirror_sees_every_pose_change() {
        let backend = RecordingBackend::default();
        let poses = backend.poses.clone();
        let mut sim = Simulation::with_renderer(SimConfig::default(), Box::new(backend)).unwrap();
        let id = sim.spawn(&chassis(), None).unwrap();

        sim.set_position(id, Vec2::new(30.0, -4.0)).unwrap();
        let (who, what, pose) = *poses.borrow().last().unwrap();
        assert_eq!((who, what), (id, "sync"));
        assert!(close(pose.position, Vec2::new(30.0, -4.0)));

        sim.set_angle(id, 45.0).unwrap();
        let (_, _, pose) = *poses.borrow().last().unwrap();
        assert!((pose.angle - 45.0).abs() < 1e-3);

        sim.apply_impulse(id, Vec2::new(0.05, 0.0), None).unwrap();
        sim.frame(20.0);
        let (_, what, pose) = *poses.borrow().last().unwrap();
        assert_eq!(what, "step");
        assert_eq!(pose, sim.pose(id).unwrap());
        assert!(pose.position.x > 30.0);
    }

    #[test]
    fn hooks_run_parents_first_and_wrap_the_step() {
        let log: Log = Rc::default();
        let mut sim = sim_with_timestep(10.0);
        let root = sim.spawn(&chassis(), None).unwrap();
        let child = sim.spawn(&arm(), Some(root)).unwrap();
        let other = sim.spawn(&chassis().with_label("other"), None).unwrap();
        for (id, name) in [(root, "root"), (child, "child"), (other, "other")] {
            sim.set_controller(id, Box::new(Tracer { name, log: log.clone() })).unwrap();
        }

        sim.frame(15.0);
        assert_eq!(
            *log.borrow(),
            [
                "before:root",
                "before:child",
                "before:other",
                "after:root",
                "after:child",
                "after:other",
                "update:root",
                "update:child",
                "update:other",
            ]
        );
        assert_eq!(sim.physics().step_count(), 1);
        assert!((sim.leftover_ms() - 5.0).abs() < 1e-6);

        log.borrow_mut().clear();
        sim.frame(5.0);
        assert_eq!(sim.physics().step_count(), 2);
        assert!(sim.leftover_ms().abs() < 1e-6);
    }

    #[test]
    fn chunked_frames_match_one_long_frame() {
        fn run(chunks: &[f32]) -> (Pose, Pose) {
            let mut sim = sim_with_timestep(20.0);
            let root = sim.spawn(&chassis().with_child(arm()), None).unwrap();
            let arm_id = sim.children_of(root)[0];
            sim.set_controller(root, Box::new(Thruster(Vec2::new(4.0, 1.0)))).unwrap();
            for chunk in chunks {
                sim.frame(*chunk);
            }
            (sim.pose(root).unwrap(), sim.pose(arm_id).unwrap())
        }

        let whole = run(&[200.0]);
        let chunked = run(&[7.0, 13.0, 45.0, 5.0, 60.0, 1.0, 69.0]);
        assert_eq!(whole, chunked);
        assert!(whole.0.position.x > 0.0);
    }

    #[test]
    fn despawn_destroys_the_whole_subtree() {
        let backend = RecordingBackend::default();
        let registered = backend.registered.clone();
        let poses = backend.poses.clone();
        let mut sim = Simulation::with_renderer(SimConfig::default(), Box::new(backend)).unwrap();
        let root = sim.spawn(&chassis().with_child(arm().with_child(arm())), None).unwrap();
        let keep = sim.spawn(&chassis(), None).unwrap();
        assert_eq!(sim.len(), 4);
        assert_eq!(registered.borrow().len(), 4);

        sim.despawn(root).unwrap();
        assert_eq!(sim.len(), 1);
        assert_eq!(sim.roots(), [keep]);
        assert_eq!(sim.physics().body_count(), 1);
        assert_eq!(sim.physics().joint_count(), 0);
        assert_eq!(*registered.borrow(), [keep]);
        let destroyed = poses.borrow().iter().filter(|(_, what, _)| *what == "destroy").count();
        assert_eq!(destroyed, 3);

        assert!(matches!(sim.despawn(root), Err(SimError::UnknownEntity(_))));
    }

    #[test]
    fn remove_child_without_destroy_reroots() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let root = sim.spawn(&chassis(), None).unwrap();
        let child = sim.spawn(&arm(), Some(root)).unwrap();
        assert_eq!(sim.physics().joint_count(), 1);

        sim.remove_child(root, child, false).unwrap();
        assert_eq!(sim.parent_of(child), None);
        assert!(sim.entity(child).unwrap().joint().is_none());
        assert_eq!(sim.roots(), [root, child]);
        assert_eq!(sim.physics().joint_count(), 0);
        assert_eq!(sim.physics().body_count(), 2);

        // Re-adding joints it again.
        assert!(sim.add_child(root, child).unwrap().is_some());
        assert_eq!(sim.roots(), [root]);

        assert!(matches!(
            sim.remove_child(child, root, false),
            Err(SimError::InvalidHierarchy(_))
        ));
    }

    #[test]
    fn clear_children_can_destroy_or_keep() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let root = sim.spawn(&chassis().with_child(arm()).with_child(arm()), None).unwrap();
        sim.clear_children(root, false).unwrap();
        assert_eq!(sim.len(), 3);
        assert_eq!(sim.roots().len(), 3);
        assert!(sim.children_of(root).is_empty());

        let other = sim.spawn(&chassis().with_child(arm()).with_child(arm()), None).unwrap();
        sim.clear_children(other, true).unwrap();
        assert_eq!(sim.len(), 4);
        assert_eq!(sim.physics().joint_count(), 0);

        sim.clear();
        assert!(sim.is_empty());
        assert_eq!(sim.physics().body_count(), 0);
    }

    #[test]
    fn invalid_links_are_rejected() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let a = sim.spawn(&chassis(), None).unwrap();
        let b = sim.spawn(&arm(), Some(a)).unwrap();
        let c = sim.spawn(&chassis(), None).unwrap();

        assert!(matches!(sim.add_child(a, a), Err(SimError::InvalidHierarchy(_))));
        assert!(matches!(sim.add_child(b, a), Err(SimError::InvalidHierarchy(_))));
        assert!(matches!(sim.add_child(c, b), Err(SimError::InvalidHierarchy(_))));
        assert!(matches!(sim.add_child(a, EntityId(99)), Err(SimError::UnknownEntity(_))));
        assert!(matches!(sim.spawn(&arm(), Some(EntityId(99))), Err(SimError::UnknownEntity(_))));
        assert_eq!(sim.physics().joint_count(), 1);
        assert_eq!(sim.len(), 3);
    }

    #[test]
    fn mouse_child_stays_unjointed() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let root = sim.spawn(&chassis(), None).unwrap();
        let spec = arm().with_joint(JointSpec::new(JointKind::Mouse));
        let child = sim.spawn(&spec, Some(root)).unwrap();
        assert_eq!(sim.parent_of(child), Some(root));
        assert!(sim.entity(child).unwrap().joint().is_none());
        assert_eq!(sim.physics().joint_count(), 0);
    }

    #[test]
    fn static_body_ignores_forces() {
        let mut sim = sim_with_timestep(10.0);
        let wall = sim
            .spawn(&chassis().with_physics(BodyPhysicsSpec::fixed()), None)
            .unwrap();
        sim.apply_force(wall, Vec2::new(1000.0, 0.0), None).unwrap();
        sim.advance(100.0);
        assert!(close(sim.position(wall).unwrap(), Vec2::ZERO));
    }

    #[test]
    fn friction_joint_brakes_a_sliding_body() {
        let mut sim = sim_with_timestep(10.0);
        let id = sim.spawn(&chassis(), None).unwrap();
        let aux = sim.add_friction_joint(id, Vec2::ZERO).unwrap().unwrap();
        sim.apply_impulse(id, Vec2::new(0.04, 0.0), None).unwrap();
        sim.advance(500.0);
        assert!(sim.linear_velocity_at(id, None).unwrap().length() < 0.5);
        sim.remove_aux_joint(id, aux).unwrap();
        assert_eq!(sim.physics().joint_count(), 0);
    }
}
