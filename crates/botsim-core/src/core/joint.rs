//! Joint selection and construction.
//!
//! A child entity is attached with the first joint spec found in this order:
//! the child's own, the parent's, then [`default_joint`]. Unset tuning fields
//! produce a locked joint: revolute limits `[0, 0]`, prismatic axis `(0, 1)`
//! with no travel limits, distance rest length 0 (a rigid pin), weld reference
//! angle 0.
//! Connected bodies never collide with each other.

use glam::Vec2;
use rapier2d::prelude::*;

use crate::core::physics::{vec2_to_na, vec2_to_point};
use crate::core::units::{to_engine_length, to_radians};
use crate::spec::{JointKind, JointSpec};

/// Spring stiffness used by distance joints with a rest length when none is
/// authored.
pub const DEFAULT_DISTANCE_STIFFNESS: f32 = 1.0e4;
/// Spring damping used by distance joints when none is authored.
pub const DEFAULT_DISTANCE_DAMPING: f32 = 1.0e2;

/// Handle to a joint created by the attach flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointHandle {
    pub(crate) handle: ImpulseJointHandle,
    pub kind: JointKind,
}

impl JointHandle {
    pub fn raw(&self) -> ImpulseJointHandle {
        self.handle
    }
}

pub fn default_joint() -> JointSpec {
    JointSpec::revolute()
}

/// Pick the joint spec for a parent/child pair.
pub fn resolve_joint(child: Option<&JointSpec>, parent: Option<&JointSpec>) -> JointSpec {
    child.or(parent).cloned().unwrap_or_else(default_joint)
}

/// Build the engine joint for `spec`.
///
/// `anchor_a` is the anchor on the parent body in engine units; the child is
/// always anchored at its own origin. Returns `None` for kinds that do not
/// connect two authored bodies (mouse) and for a prismatic axis of zero length.
pub fn build_joint(spec: &JointSpec, anchor_a: Vec2) -> Option<GenericJoint> {
    let anchor1 = vec2_to_point(anchor_a);
    let anchor2 = nalgebra::Point2::origin();

    let mut joint: GenericJoint = match spec.kind {
        JointKind::Revolute => {
            let [lower, upper] = spec.limits.unwrap_or([0.0, 0.0]);
            let mut builder = RevoluteJointBuilder::new()
                .local_anchor1(anchor1)
                .local_anchor2(anchor2)
                .limits([to_radians(lower), to_radians(upper)]);
            if let Some(speed) = spec.motor_speed {
                builder = builder
                    .motor_velocity(to_radians(speed), 1.0)
                    .motor_max_force(spec.max_motor_torque.unwrap_or(Real::MAX));
            }
            builder.build().into()
        }
        JointKind::Prismatic => {
            let axis = spec.axis.unwrap_or(Vec2::Y);
            let Some(axis) = nalgebra::Unit::try_new(vec2_to_na(axis), f32::EPSILON) else {
                log::warn!("prismatic axis {:?} has no direction", axis);
                return None;
            };
            let mut builder = PrismaticJointBuilder::new(axis)
                .local_anchor1(anchor1)
                .local_anchor2(anchor2);
            if let Some([lower, upper]) = spec.limits {
                builder = builder.limits([to_engine_length(lower), to_engine_length(upper)]);
            }
            builder.build().into()
        }
        JointKind::Distance => {
            let rest_length = to_engine_length(spec.rest_length.unwrap_or(0.0));
            let damping = spec.damping.unwrap_or(DEFAULT_DISTANCE_DAMPING);
            if rest_length > 0.0 {
                let stiffness = spec.stiffness.unwrap_or(DEFAULT_DISTANCE_STIFFNESS);
                SpringJointBuilder::new(rest_length, stiffness, damping)
                    .local_anchor1(anchor1)
                    .local_anchor2(anchor2)
                    .build()
                    .into()
            } else if let Some(stiffness) = spec.stiffness {
                pin_spring(anchor_a, stiffness, damping, None)
            } else {
                // Zero length and no spring: points coincide, rotation is free.
                RevoluteJointBuilder::new()
                    .local_anchor1(anchor1)
                    .local_anchor2(anchor2)
                    .build()
                    .into()
            }
        }
        JointKind::Weld => {
            let reference = to_radians(spec.reference_angle.unwrap_or(0.0));
            FixedJointBuilder::new()
                .local_frame1(nalgebra::Isometry2::new(vec2_to_na(anchor_a), reference))
                .local_anchor2(anchor2)
                .build()
                .into()
        }
        JointKind::Mouse => return None,
    };
    joint.set_contacts_enabled(false);
    Some(joint)
}

/// Spring pulling the child's origin onto `anchor_a` along both axes.
///
/// Used where the rest length is zero and the spring direction would be
/// undefined; `max_force` caps the pull per axis.
pub(crate) fn pin_spring(anchor_a: Vec2, stiffness: f32, damping: f32, max_force: Option<f32>) -> GenericJoint {
    let mut builder = GenericJointBuilder::new(JointAxesMask::empty())
        .local_anchor1(vec2_to_point(anchor_a))
        .local_anchor2(nalgebra::Point2::origin());
    for axis in [JointAxis::LinX, JointAxis::LinY] {
        builder = builder.motor_position(axis, 0.0, stiffness, damping);
        if let Some(max_force) = max_force {
            builder = builder.motor_max_force(axis, max_force);
        }
    }
    builder.build()
}
