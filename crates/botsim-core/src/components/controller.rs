use glam::Vec2;

use crate::api::types::{EntityId, Pose};
use crate::core::object::PhysicsObject;
use crate::core::physics::PhysicsWorld;

/// Gameplay logic bound to one entity, e.g. a line follower steering a bot.
///
/// Hooks run in scene order: a parent's hook finishes before any of its
/// children's hooks start.
pub trait Controller {
    /// Apply forces for the coming tick.
    fn before_physics_step(&mut self, _ctx: &mut ControlContext<'_>, _dt_secs: f32) {}

    /// Read the post-integration state.
    fn after_physics_step(&mut self, _ctx: &mut ControlContext<'_>, _dt_secs: f32) {}

    /// Once per rendered frame.
    fn update(&mut self, _ctx: &mut ControlContext<'_>, _dt_secs: f32) {}
}

/// What a controller may touch: its own body and the world it lives in.
pub struct ControlContext<'a> {
    pub id: EntityId,
    pub physics: &'a mut PhysicsObject,
    pub world: &'a mut PhysicsWorld,
}

impl ControlContext<'_> {
    pub fn pose(&self) -> Pose {
        Pose::new(self.physics.position(self.world), self.physics.angle(self.world))
    }

    pub fn forward(&self) -> Vec2 {
        self.physics.forward(self.world)
    }

    pub fn apply_force(&mut self, force: Vec2, point: Option<Vec2>) {
        self.physics.apply_force(self.world, force, point);
    }

    pub fn apply_impulse(&mut self, impulse: Vec2, point: Option<Vec2>) {
        self.physics.apply_impulse(self.world, impulse, point);
    }

    pub fn linear_velocity(&self, point: Option<Vec2>) -> Vec2 {
        self.physics.linear_velocity_at(self.world, point)
    }

    pub fn lateral_velocity(&self, point: Option<Vec2>) -> Vec2 {
        self.physics.lateral_velocity_at(self.world, point)
    }

    pub fn angular_velocity(&self) -> f32 {
        self.physics.angular_velocity(self.world)
    }
}
