use glam::Vec2;
use rapier2d::prelude::*;

use crate::core::joint::{build_joint, pin_spring, resolve_joint, JointHandle};
use crate::core::physics::{
    na_to_vec2, point_to_vec2, vec2_to_na, vec2_to_point, BodyDesc, BodyType, PhysicsWorld,
};
use crate::core::units::{
    dot, forward, from_engine_vec, rotate_deg, scale, to_degrees, to_engine_vec, to_radians,
};
use crate::spec::JointSpec;

/// Motor gain of friction joints; the max force is the real bound.
const FRICTION_MOTOR_FACTOR: f32 = 1.0e3;

/// Joint to a synthetic anchor body, created for drag or damping behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxJoint {
    pub(crate) joint: ImpulseJointHandle,
    pub(crate) anchor: RigidBodyHandle,
}

impl AuxJoint {
    pub fn joint(&self) -> ImpulseJointHandle {
        self.joint
    }

    pub fn anchor(&self) -> RigidBodyHandle {
        self.anchor
    }
}

/// Live handle to one entity's rigid body.
///
/// Pose accessors speak authoring units (cm, degrees). Forces, impulses and
/// velocities are passed to and from the engine unscaled.
#[derive(Debug)]
pub struct PhysicsObject {
    body: RigidBodyHandle,
    colliders: Vec<ColliderHandle>,
    /// Joint used when this object becomes the child of another.
    joint: Option<JointSpec>,
    skipped_shapes: usize,
    anchors: Vec<RigidBodyHandle>,
}

impl PhysicsObject {
    pub fn new(body: RigidBodyHandle, colliders: Vec<ColliderHandle>, joint: Option<JointSpec>) -> Self {
        Self {
            body,
            colliders,
            joint,
            skipped_shapes: 0,
            anchors: Vec::new(),
        }
    }

    pub(crate) fn with_skipped_shapes(mut self, skipped: usize) -> Self {
        self.skipped_shapes = skipped;
        self
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn colliders(&self) -> &[ColliderHandle] {
        &self.colliders
    }

    pub fn joint_spec(&self) -> Option<&JointSpec> {
        self.joint.as_ref()
    }

    /// Shapes from the spec that produced no collider.
    pub fn skipped_shapes(&self) -> usize {
        self.skipped_shapes
    }

    // -- Pose --

    /// World position in cm.
    pub fn position(&self, world: &PhysicsWorld) -> Vec2 {
        world
            .body(self.body)
            .map(|rb| from_engine_vec(na_to_vec2(rb.translation())))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn set_position(&self, world: &mut PhysicsWorld, pos: Vec2) {
        if let Some(rb) = world.body_mut(self.body) {
            rb.set_translation(vec2_to_na(to_engine_vec(pos)), true);
        }
    }

    /// World angle in degrees.
    pub fn angle(&self, world: &PhysicsWorld) -> f32 {
        world
            .body(self.body)
            .map(|rb| to_degrees(rb.rotation().angle()))
            .unwrap_or(0.0)
    }

    pub fn set_angle(&self, world: &mut PhysicsWorld, angle: f32) {
        if let Some(rb) = world.body_mut(self.body) {
            rb.set_rotation(nalgebra::UnitComplex::new(to_radians(angle)), true);
        }
    }

    /// Unit vector of the body's local +x axis in world space.
    pub fn forward(&self, world: &PhysicsWorld) -> Vec2 {
        forward(self.angle(world))
    }

    // -- Forces --

    /// Apply a continuous force for the next step. `point` is a world point
    /// in cm and defaults to the center of mass.
    pub fn apply_force(&self, world: &mut PhysicsWorld, force: Vec2, point: Option<Vec2>) {
        let Some(rb) = world.body_mut(self.body) else { return };
        match point {
            Some(p) => rb.add_force_at_point(vec2_to_na(force), vec2_to_point(to_engine_vec(p)), true),
            None => rb.add_force(vec2_to_na(force), true),
        }
    }

    /// Apply an instantaneous impulse. `point` as for [`Self::apply_force`].
    pub fn apply_impulse(&self, world: &mut PhysicsWorld, impulse: Vec2, point: Option<Vec2>) {
        let Some(rb) = world.body_mut(self.body) else { return };
        match point {
            Some(p) => rb.apply_impulse_at_point(vec2_to_na(impulse), vec2_to_point(to_engine_vec(p)), true),
            None => rb.apply_impulse(vec2_to_na(impulse), true),
        }
    }

    // -- Velocity --

    /// Velocity of the material point at `point` (world, cm), or of the
    /// center of mass.
    pub fn linear_velocity_at(&self, world: &PhysicsWorld, point: Option<Vec2>) -> Vec2 {
        let Some(rb) = world.body(self.body) else { return Vec2::ZERO };
        let p = match point {
            Some(p) => vec2_to_point(to_engine_vec(p)),
            None => *rb.center_of_mass(),
        };
        na_to_vec2(&rb.velocity_at_point(&p))
    }

    /// Component of [`Self::linear_velocity_at`] along the forward axis.
    pub fn lateral_velocity_at(&self, world: &PhysicsWorld, point: Option<Vec2>) -> Vec2 {
        let fwd = self.forward(world);
        let vel = self.linear_velocity_at(world, point);
        scale(fwd, dot(fwd, vel))
    }

    pub fn set_linear_velocity(&self, world: &mut PhysicsWorld, vel: Vec2) {
        if let Some(rb) = world.body_mut(self.body) {
            rb.set_linvel(vec2_to_na(vel), true);
        }
    }

    /// Angular velocity in rad/s.
    pub fn angular_velocity(&self, world: &PhysicsWorld) -> f32 {
        world.body(self.body).map(|rb| rb.angvel()).unwrap_or(0.0)
    }

    pub fn set_angular_velocity(&self, world: &mut PhysicsWorld, vel: f32) {
        if let Some(rb) = world.body_mut(self.body) {
            rb.set_angvel(vel, true);
        }
    }

    // -- Joints --

    /// Attach `child` to this body.
    ///
    /// The child's current position is read first and becomes the anchor on
    /// this body. When the resolved joint asks for a parent-relative
    /// transform, the child is first moved from this body's frame into world
    /// space. Returns `None` if the engine refuses the joint.
    pub fn attach(&self, world: &mut PhysicsWorld, child: &PhysicsObject) -> Option<JointHandle> {
        let spec = resolve_joint(child.joint.as_ref(), self.joint.as_ref());
        let relative_pos = child.position(world);

        if spec.transform_to_parent {
            let parent_angle = self.angle(world);
            let absolute = self.position(world) + rotate_deg(relative_pos, parent_angle);
            child.set_position(world, absolute);
            let child_angle = child.angle(world);
            child.set_angle(world, child_angle + parent_angle);
        }

        let Some(joint) = build_joint(&spec, to_engine_vec(relative_pos)) else {
            log::warn!("no {:?} joint can be built for this pair; child left unjointed", spec.kind);
            return None;
        };
        let Some(handle) = world.insert_joint(self.body, child.body, joint) else {
            log::warn!("engine refused {:?} joint {:?} -> {:?}", spec.kind, self.body, child.body);
            return None;
        };
        log::debug!(
            "attached {:?} -> {:?} with {:?} joint at {:?}",
            self.body,
            child.body,
            spec.kind,
            relative_pos
        );
        Some(JointHandle {
            handle,
            kind: spec.kind,
        })
    }

    fn create_anchor(&mut self, world: &mut PhysicsWorld, body_type: BodyType, point: Vec2) -> RigidBodyHandle {
        let anchor = world.create_body(&BodyDesc::new(body_type).with_position(to_engine_vec(point)));
        self.anchors.push(anchor);
        anchor
    }

    fn local_point(&self, world: &PhysicsWorld, point: Vec2) -> Option<Vec2> {
        let rb = world.body(self.body)?;
        let local = rb.position().inverse_transform_point(&vec2_to_point(to_engine_vec(point)));
        Some(point_to_vec2(&local))
    }

    /// Resist sliding at a world point (cm) with up to `max_force` of friction.
    pub fn add_friction_joint(&mut self, world: &mut PhysicsWorld, point: Vec2, max_force: f32) -> Option<AuxJoint> {
        let local = self.local_point(world, point)?;
        let anchor = self.create_anchor(world, BodyType::Fixed, point);
        let joint = GenericJointBuilder::new(JointAxesMask::empty())
            .local_anchor1(vec2_to_point(local))
            .local_anchor2(nalgebra::Point2::origin())
            .motor_velocity(JointAxis::LinX, 0.0, FRICTION_MOTOR_FACTOR)
            .motor_max_force(JointAxis::LinX, max_force)
            .motor_velocity(JointAxis::LinY, 0.0, FRICTION_MOTOR_FACTOR)
            .motor_max_force(JointAxis::LinY, max_force)
            .contacts_enabled(false)
            .build();
        self.finish_aux(world, anchor, joint)
    }

    /// Pull the body's material point under `target` (world, cm) toward a
    /// movable target with at most `max_force` per axis. Move the target with
    /// [`Self::set_mouse_target`].
    pub fn add_mouse_joint(
        &mut self,
        world: &mut PhysicsWorld,
        target: Vec2,
        stiffness: f32,
        damping: f32,
        max_force: f32,
    ) -> Option<AuxJoint> {
        let local = self.local_point(world, target)?;
        let anchor = self.create_anchor(world, BodyType::KinematicPositionBased, target);
        let mut joint = pin_spring(local, stiffness, damping, Some(max_force));
        joint.set_contacts_enabled(false);
        self.finish_aux(world, anchor, joint)
    }

    fn finish_aux(
        &mut self,
        world: &mut PhysicsWorld,
        anchor: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> Option<AuxJoint> {
        match world.insert_joint(self.body, anchor, joint) {
            Some(joint) => Some(AuxJoint { joint, anchor }),
            None => {
                self.release_anchor(world, anchor);
                None
            }
        }
    }

    /// Move the anchor of a mouse joint to a new world point (cm).
    pub fn set_mouse_target(&self, world: &mut PhysicsWorld, aux: &AuxJoint, target: Vec2) {
        if let Some(rb) = world.body_mut(aux.anchor) {
            rb.set_next_kinematic_translation(vec2_to_na(to_engine_vec(target)));
        }
    }

    /// Remove an auxiliary joint together with its anchor body.
    pub fn remove_aux_joint(&mut self, world: &mut PhysicsWorld, aux: AuxJoint) {
        self.release_anchor(world, aux.anchor);
    }

    fn release_anchor(&mut self, world: &mut PhysicsWorld, anchor: RigidBodyHandle) {
        self.anchors.retain(|a| *a != anchor);
        world.remove_body(anchor);
    }

    /// Remove the body, its colliders, its joints and any anchor bodies.
    pub fn destroy(self, world: &mut PhysicsWorld) {
        for anchor in &self.anchors {
            world.remove_body(*anchor);
        }
        if !world.remove_body(self.body) {
            log::warn!("body {:?} was already gone on destroy", self.body);
        }
    }
}
