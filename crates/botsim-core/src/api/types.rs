use glam::Vec2;

/// Unique identifier for an entity in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Pose of a body in authoring units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// World position in centimeters.
    pub position: Vec2,
    /// World angle in degrees.
    pub angle: f32,
}

impl Pose {
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }
}
