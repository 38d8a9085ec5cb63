use glam::Vec2;
use rapier2d::prelude::*;

use crate::core::physics::{vec2_to_na, vec2_to_point, PhysicsWorld};
use crate::core::units::{rotate_deg, to_engine_length, to_engine_vec};
use crate::error::{Result, SimError};
use crate::spec::{EntityShapeSpec, FixtureMaterial, ShapeKind};

/// Shape geometry placed in the owning entity's frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    /// Convex outline, vertices in the order the collider receives them.
    Polygon(Vec<Vec2>),
    Circle { center: Vec2, radius: f32 },
    /// Segment `v0`→`v1`. Ghost vertices only describe neighbouring segments.
    Edge {
        v0: Vec2,
        v1: Vec2,
        v_prev: Option<Vec2>,
        v_next: Option<Vec2>,
    },
}

impl ShapeGeometry {
    /// Convert every coordinate from centimeters to engine meters.
    pub fn to_engine(&self) -> ShapeGeometry {
        match self {
            ShapeGeometry::Polygon(verts) => {
                ShapeGeometry::Polygon(verts.iter().map(|v| to_engine_vec(*v)).collect())
            }
            ShapeGeometry::Circle { center, radius } => ShapeGeometry::Circle {
                center: to_engine_vec(*center),
                radius: to_engine_length(*radius),
            },
            ShapeGeometry::Edge { v0, v1, v_prev, v_next } => ShapeGeometry::Edge {
                v0: to_engine_vec(*v0),
                v1: to_engine_vec(*v1),
                v_prev: v_prev.map(to_engine_vec),
                v_next: v_next.map(to_engine_vec),
            },
        }
    }

    fn collider_builder(&self) -> Result<ColliderBuilder> {
        match self {
            ShapeGeometry::Polygon(verts) => {
                if verts.len() < 3 {
                    return Err(SimError::InvalidGeometry {
                        kind: "polygon",
                        reason: "fewer than 3 vertices",
                    });
                }
                let points = verts.iter().map(|v| vec2_to_point(*v)).collect();
                ColliderBuilder::convex_polyline(points).ok_or(SimError::InvalidGeometry {
                    kind: "polygon",
                    reason: "outline is not convex or is degenerate",
                })
            }
            ShapeGeometry::Circle { center, radius } => {
                Ok(ColliderBuilder::ball(*radius).translation(vec2_to_na(*center)))
            }
            ShapeGeometry::Edge { v0, v1, v_prev, v_next } => {
                if v_prev.is_some() || v_next.is_some() {
                    log::debug!("edge ghost vertices are not supported by the engine; ignored");
                }
                Ok(ColliderBuilder::segment(vec2_to_point(*v0), vec2_to_point(*v1)))
            }
        }
    }
}

/// Place a point given in the shape's frame into the entity frame.
fn place(spec: &EntityShapeSpec, v: Vec2) -> Vec2 {
    rotate_deg(v, spec.angle) + spec.offset
}

/// Corners of a `size` box centered on the origin, counter-clockwise.
pub fn box_vertices(size: Vec2) -> [Vec2; 4] {
    let h = size * 0.5;
    [
        Vec2::new(-h.x, -h.y),
        Vec2::new(h.x, -h.y),
        Vec2::new(h.x, h.y),
        Vec2::new(-h.x, h.y),
    ]
}

/// Compute the geometry of a shape in the entity frame, in centimeters.
pub fn shape_geometry(spec: &EntityShapeSpec) -> Result<ShapeGeometry> {
    let geometry = match &spec.kind {
        ShapeKind::Box { size } => {
            ShapeGeometry::Polygon(box_vertices(*size).iter().map(|v| place(spec, *v)).collect())
        }
        ShapeKind::Circle { radius } => ShapeGeometry::Circle {
            center: spec.offset,
            radius: *radius,
        },
        ShapeKind::Polygon { verts } => {
            ShapeGeometry::Polygon(verts.iter().map(|v| place(spec, *v)).collect())
        }
        ShapeKind::Edge { v0, v1, v_prev, v_next } => ShapeGeometry::Edge {
            v0: place(spec, *v0),
            v1: place(spec, *v1),
            v_prev: v_prev.map(|v| place(spec, v)),
            v_next: v_next.map(|v| place(spec, v)),
        },
        ShapeKind::Path { .. } => return Err(SimError::UnsupportedShape(spec.kind.name())),
    };
    Ok(geometry)
}

fn collision_groups(material: &FixtureMaterial) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(material.category_bits),
        Group::from_bits_truncate(material.mask_bits),
    )
}

/// Compile one shape into a collider attached to `body`.
pub fn compile_shape(
    world: &mut PhysicsWorld,
    body: RigidBodyHandle,
    spec: &EntityShapeSpec,
) -> Result<ColliderHandle> {
    let geometry = shape_geometry(spec)?.to_engine();
    let material = spec.physics.resolve();
    let collider = geometry
        .collider_builder()?
        .density(material.density)
        .friction(material.friction)
        .restitution(material.restitution)
        .sensor(material.sensor)
        .collision_groups(collision_groups(&material))
        .build();
    let handle = world.insert_collider(collider, body);
    log::debug!(
        "attached {} collider {:?} to body {:?}",
        spec.kind.name(),
        handle,
        body
    );
    Ok(handle)
}
