use crate::core::object::PhysicsObject;
use crate::core::physics::{BodyDesc, BodyType, PhysicsWorld};
use crate::core::shape::compile_shape;
use crate::core::units::{to_engine_vec, to_radians};
use crate::error::{Result, SimError};
use crate::spec::{BodyKind, EntitySpec};

impl From<BodyKind> for BodyType {
    fn from(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Dynamic => BodyType::Dynamic,
            BodyKind::Static => BodyType::Fixed,
        }
    }
}

/// Body parameters for an entity spec, converted to engine units.
pub fn body_desc(spec: &EntitySpec) -> BodyDesc {
    let physics = &spec.physics;
    BodyDesc::new(physics.kind.into())
        .with_position(to_engine_vec(spec.pos))
        .with_rotation(to_radians(spec.angle))
        .with_damping(physics.linear_damping, physics.angular_damping)
        .with_fixed_rotation(physics.fixed_rotation.unwrap_or(false))
}

/// Create the rigid body for `spec` and one collider per shape, in order.
///
/// Children are not built here. Shapes the engine cannot represent are
/// skipped with a warning and counted on the returned object; invalid
/// geometry aborts the build and removes the half-built body.
pub fn build_body(world: &mut PhysicsWorld, spec: &EntitySpec) -> Result<PhysicsObject> {
    let body = world.create_body(&body_desc(spec));
    let mut colliders = Vec::with_capacity(spec.shapes.len());
    let mut skipped = 0;

    for shape in &spec.shapes {
        match compile_shape(world, body, shape) {
            Ok(handle) => colliders.push(handle),
            Err(SimError::UnsupportedShape(kind)) => {
                log::warn!(
                    "entity {:?}: skipping unsupported {} shape {:?}",
                    spec.label,
                    kind,
                    shape.label
                );
                skipped += 1;
            }
            Err(err) => {
                world.remove_body(body);
                return Err(err);
            }
        }
    }

    Ok(PhysicsObject::new(body, colliders, spec.physics.joint.clone()).with_skipped_shapes(skipped))
}
