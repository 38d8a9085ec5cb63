use glam::Vec2;
use rapier2d::prelude::*;

// ---------------------------------------------------------------------------
// Conversion helpers — glam ↔ nalgebra
// ---------------------------------------------------------------------------

pub(crate) fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

pub(crate) fn vec2_to_point(v: Vec2) -> nalgebra::Point2<f32> {
    nalgebra::Point2::new(v.x, v.y)
}

pub(crate) fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

pub(crate) fn point_to_vec2(p: &nalgebra::Point2<f32>) -> Vec2 {
    Vec2::new(p.x, p.y)
}

fn na_iso_to_pos_rot(iso: &nalgebra::Isometry2<f32>) -> (Vec2, f32) {
    let pos = Vec2::new(iso.translation.x, iso.translation.y);
    let rot = iso.rotation.angle();
    (pos, rot)
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The kind of rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Dynamic,
    Fixed,
    /// Moved by setting its next pose; used for synthetic joint anchors.
    KinematicPositionBased,
}

impl BodyType {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Fixed => RigidBodyType::Fixed,
            BodyType::KinematicPositionBased => RigidBodyType::KinematicPositionBased,
        }
    }
}

/// Rigid body parameters in engine units (meters, radians).
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec2,
    pub rotation: f32,
    pub fixed_rotation: bool,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl BodyDesc {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            position: Vec2::ZERO,
            rotation: 0.0,
            fixed_rotation: false,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    pub fn dynamic() -> Self {
        Self::new(BodyType::Dynamic)
    }

    pub fn fixed() -> Self {
        Self::new(BodyType::Fixed)
    }

    pub fn with_position(mut self, pos: Vec2) -> Self {
        self.position = pos;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Owns the rapier2d sets and pipeline. All values crossing this API are in
/// engine units; callers working in cm/degrees convert through
/// [`crate::core::units`].
pub struct PhysicsWorld {
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    steps: u64,
}

impl PhysicsWorld {
    /// Create a new world with gravity in m/s². The robot arena is viewed
    /// top-down, so most callers pass `Vec2::ZERO`.
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity: vec2_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            steps: 0,
        }
    }

    /// Set the integration timestep in seconds.
    pub fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Create a rigid body with no colliders.
    pub fn create_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::new(desc.body_type.to_rapier())
            .translation(vec2_to_na(desc.position))
            .rotation(desc.rotation)
            .locked_axes(if desc.fixed_rotation {
                LockedAxes::ROTATION_LOCKED
            } else {
                LockedAxes::empty()
            })
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .build();
        let handle = self.bodies.insert(rb);
        log::debug!("created {:?} body {:?} at {:?}", desc.body_type, handle, desc.position);
        handle
    }

    /// Attach a collider to an existing body.
    pub fn insert_collider(&mut self, collider: Collider, body: RigidBodyHandle) -> ColliderHandle {
        self.colliders
            .insert_with_parent(collider, body, &mut self.bodies)
    }

    /// Remove a body together with its colliders and joints.
    /// Returns `false` if the body was already gone.
    pub fn remove_body(&mut self, body: RigidBodyHandle) -> bool {
        let removed = self.bodies.remove(
            body,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        removed.is_some()
    }

    /// Advance the world by one integration step. Forces applied since the
    /// previous step are consumed by this step and then cleared.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        for (_, rb) in self.bodies.iter_mut() {
            rb.reset_forces(false);
            rb.reset_torques(false);
        }
        self.steps += 1;
    }

    /// Number of integration steps taken since creation.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn body(&self, body: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(body)
    }

    pub fn body_mut(&mut self, body: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(body)
    }

    pub fn collider(&self, collider: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(collider)
    }

    /// Current position and rotation of a body, in engine units.
    pub fn body_position(&self, body: RigidBodyHandle) -> Option<(Vec2, f32)> {
        self.bodies.get(body).map(|rb| na_iso_to_pos_rot(rb.position()))
    }

    /// Number of rigid bodies in the simulation.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of colliders in the simulation.
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Number of colliders attached to one body.
    pub fn fixture_count(&self, body: RigidBodyHandle) -> usize {
        self.bodies.get(body).map(|rb| rb.colliders().len()).unwrap_or(0)
    }

    // -- Joint methods --

    /// Insert a joint between two bodies. Returns `None` when either body is
    /// missing or both handles name the same body.
    pub fn insert_joint(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> Option<ImpulseJointHandle> {
        if body_a == body_b || !self.bodies.contains(body_a) || !self.bodies.contains(body_b) {
            return None;
        }
        Some(self.impulse_joints.insert(body_a, body_b, joint, true))
    }

    /// Remove a joint from the simulation.
    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joints.remove(handle, true).is_some()
    }

    pub fn joint(&self, handle: ImpulseJointHandle) -> Option<&ImpulseJoint> {
        self.impulse_joints.get(handle)
    }

    pub fn joint_mut(&mut self, handle: ImpulseJointHandle) -> Option<&mut ImpulseJoint> {
        self.impulse_joints.get_mut(handle)
    }

    /// Number of joints in the simulation.
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    /// Number of joints directly connecting two bodies.
    pub fn joints_between(&self, body_a: RigidBodyHandle, body_b: RigidBodyHandle) -> usize {
        self.impulse_joints.joints_between(body_a, body_b).count()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
