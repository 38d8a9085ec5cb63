//! Declarative scene input: entities, shapes, materials and joints.
//!
//! JSON keys are camelCase, matching the map and bot files authored for the
//! browser simulator. Lengths are centimeters and angles are degrees
//! throughout. These types are treated as immutable input data; the core
//! never writes back into them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// One node of the scene tree: a single rigid body plus its shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySpec {
    #[serde(default)]
    pub label: Option<String>,
    /// Position in cm. Relative to the parent when the resolved joint asks for it.
    #[serde(default)]
    pub pos: Vec2,
    /// Angle in degrees.
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub physics: BodyPhysicsSpec,
    #[serde(default)]
    pub shapes: Vec<EntityShapeSpec>,
    /// Child entities, each built as its own body and jointed to this one.
    #[serde(default)]
    pub children: Vec<EntitySpec>,
}

impl EntitySpec {
    pub fn new(pos: Vec2, angle: f32) -> Self {
        Self {
            label: None,
            pos,
            angle,
            physics: BodyPhysicsSpec::default(),
            shapes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse an entity tree from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_physics(mut self, physics: BodyPhysicsSpec) -> Self {
        self.physics = physics;
        self
    }

    pub fn with_joint(mut self, joint: JointSpec) -> Self {
        self.physics.joint = Some(joint);
        self
    }

    pub fn with_shape(mut self, shape: EntityShapeSpec) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn with_child(mut self, child: EntitySpec) -> Self {
        self.children.push(child);
        self
    }
}

impl Default for EntitySpec {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 0.0)
    }
}

// ---------------------------------------------------------------------------
// Body physics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPhysicsSpec {
    #[serde(default, rename = "type")]
    pub kind: BodyKind,
    #[serde(default)]
    pub angular_damping: f32,
    #[serde(default)]
    pub linear_damping: f32,
    #[serde(default)]
    pub fixed_rotation: Option<bool>,
    /// Joint used when this entity is made the child of another.
    #[serde(default)]
    pub joint: Option<JointSpec>,
}

impl BodyPhysicsSpec {
    pub fn dynamic() -> Self {
        Self::default()
    }

    pub fn fixed() -> Self {
        Self {
            kind: BodyKind::Static,
            ..Self::default()
        }
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = Some(fixed);
        self
    }
}

// ---------------------------------------------------------------------------
// Joints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointKind {
    #[default]
    Revolute,
    Prismatic,
    Distance,
    Weld,
    Mouse,
}

/// How a child body is attached to its parent.
///
/// Every tuning field is optional; unset fields fall back to the locked
/// defaults documented on [`crate::core::joint`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JointSpec {
    #[serde(rename = "type")]
    pub kind: JointKind,
    /// Reinterpret the child's pose as relative to the parent at attach time.
    #[serde(default)]
    pub transform_to_parent: bool,
    /// Revolute: angle range in degrees. Prismatic: travel range in cm.
    #[serde(default)]
    pub limits: Option<[f32; 2]>,
    /// Prismatic slide axis in the parent frame.
    #[serde(default)]
    pub axis: Option<Vec2>,
    /// Distance rest length in cm.
    #[serde(default)]
    pub rest_length: Option<f32>,
    /// Weld reference angle in degrees.
    #[serde(default)]
    pub reference_angle: Option<f32>,
    #[serde(default)]
    pub stiffness: Option<f32>,
    #[serde(default)]
    pub damping: Option<f32>,
    /// Revolute motor target speed in degrees per second.
    #[serde(default)]
    pub motor_speed: Option<f32>,
    #[serde(default)]
    pub max_motor_torque: Option<f32>,
}

impl JointSpec {
    pub fn new(kind: JointKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn revolute() -> Self {
        Self::new(JointKind::Revolute)
    }

    pub fn relative_to_parent(mut self) -> Self {
        self.transform_to_parent = true;
        self
    }

    pub fn with_limits(mut self, lower: f32, upper: f32) -> Self {
        self.limits = Some([lower, upper]);
        self
    }
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// Geometry of a shape in its own local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeKind {
    Box {
        size: Vec2,
    },
    Circle {
        radius: f32,
    },
    Polygon {
        verts: Vec<Vec2>,
    },
    Edge {
        v0: Vec2,
        v1: Vec2,
        #[serde(default, rename = "vPrev")]
        v_prev: Option<Vec2>,
        #[serde(default, rename = "vNext")]
        v_next: Option<Vec2>,
    },
    Path {
        verts: Vec<Vec2>,
        width: f32,
    },
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Box { .. } => "box",
            ShapeKind::Circle { .. } => "circle",
            ShapeKind::Polygon { .. } => "polygon",
            ShapeKind::Edge { .. } => "edge",
            ShapeKind::Path { .. } => "path",
        }
    }
}

/// A shape attached to an entity, placed relative to the entity origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityShapeSpec {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: ShapeKind,
    /// Offset from the entity origin in cm.
    #[serde(default)]
    pub offset: Vec2,
    /// Rotation about the shape's own origin in degrees.
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub physics: ShapePhysicsSpec,
    /// Render-side styling. Carried through untouched.
    #[serde(default)]
    pub brush: Option<serde_json::Value>,
}

impl EntityShapeSpec {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            label: None,
            kind,
            offset: Vec2::ZERO,
            angle: 0.0,
            physics: ShapePhysicsSpec::default(),
            brush: None,
        }
    }

    pub fn boxed(size: Vec2) -> Self {
        Self::new(ShapeKind::Box { size })
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(ShapeKind::Circle { radius })
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_physics(mut self, physics: ShapePhysicsSpec) -> Self {
        self.physics = physics;
        self
    }
}

// ---------------------------------------------------------------------------
// Materials
// ---------------------------------------------------------------------------

/// Material as authored: any field may be left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapePhysicsSpec {
    #[serde(default)]
    pub density: Option<f32>,
    #[serde(default)]
    pub friction: Option<f32>,
    #[serde(default)]
    pub restitution: Option<f32>,
    #[serde(default)]
    pub sensor: Option<bool>,
    #[serde(default)]
    pub mask_bits: Option<u32>,
    #[serde(default)]
    pub category_bits: Option<u32>,
}

impl ShapePhysicsSpec {
    /// Fill every unset field with its default.
    pub fn resolve(&self) -> FixtureMaterial {
        let defaults = FixtureMaterial::default();
        FixtureMaterial {
            density: self.density.unwrap_or(defaults.density),
            friction: self.friction.unwrap_or(defaults.friction),
            restitution: self.restitution.unwrap_or(defaults.restitution),
            sensor: self.sensor.unwrap_or(defaults.sensor),
            category_bits: self.category_bits.unwrap_or(defaults.category_bits),
            mask_bits: self.mask_bits.unwrap_or(defaults.mask_bits),
        }
    }
}

/// Fully populated collider material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureMaterial {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub sensor: bool,
    /// Groups this collider belongs to.
    pub category_bits: u32,
    /// Groups this collider collides with.
    pub mask_bits: u32,
}

impl Default for FixtureMaterial {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.3,
            restitution: 0.2,
            sensor: false,
            category_bits: u32::MAX,
            mask_bits: u32::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_defaults_fill_gaps() {
        let spec = ShapePhysicsSpec {
            friction: Some(0.001),
            restitution: Some(1.0),
            ..Default::default()
        };
        let mat = spec.resolve();
        assert!((mat.density - 1.0).abs() < 1e-6);
        assert!((mat.friction - 0.001).abs() < 1e-6);
        assert!((mat.restitution - 1.0).abs() < 1e-6);
        assert!(!mat.sensor);
        assert_eq!(mat.mask_bits, u32::MAX);
        assert_eq!(mat.category_bits, u32::MAX);
    }

    #[test]
    fn parse_entity_tree() {
        let json = r#"{
            "label": "chassis",
            "pos": [40, 40],
            "angle": 90,
            "physics": { "type": "dynamic", "linearDamping": 2.0, "fixedRotation": true },
            "shapes": [
                { "type": "box", "size": [20, 10], "physics": { "density": 0.1, "maskBits": 6 } },
                { "type": "edge", "v0": [0, 0], "v1": [20, 20], "vNext": [30, 20] }
            ],
            "children": [
                {
                    "label": "arm",
                    "pos": [5, 0],
                    "physics": {
                        "type": "dynamic",
                        "joint": { "type": "revolute", "transformToParent": true }
                    },
                    "shapes": [{ "type": "circle", "radius": 3 }]
                }
            ]
        }"#;
        let spec = EntitySpec::from_json(json).unwrap();
        assert_eq!(spec.label.as_deref(), Some("chassis"));
        assert_eq!(spec.pos, Vec2::new(40.0, 40.0));
        assert_eq!(spec.physics.kind, BodyKind::Dynamic);
        assert_eq!(spec.physics.linear_damping, 2.0);
        assert_eq!(spec.physics.fixed_rotation, Some(true));
        assert_eq!(spec.shapes.len(), 2);
        assert_eq!(spec.shapes[0].kind, ShapeKind::Box { size: Vec2::new(20.0, 10.0) });
        assert_eq!(spec.shapes[0].physics.density, Some(0.1));
        assert_eq!(spec.shapes[0].physics.mask_bits, Some(6));
        assert_eq!(
            spec.shapes[1].kind,
            ShapeKind::Edge {
                v0: Vec2::ZERO,
                v1: Vec2::new(20.0, 20.0),
                v_prev: None,
                v_next: Some(Vec2::new(30.0, 20.0)),
            }
        );

        let arm = &spec.children[0];
        let joint = arm.physics.joint.as_ref().unwrap();
        assert_eq!(joint.kind, JointKind::Revolute);
        assert!(joint.transform_to_parent);
        assert!(arm.children.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EntitySpec::from_json(r#"{ "shapes": [{ "type": "blob" }] }"#).is_err());
    }
}
