//! Authoring ↔ engine unit conversion and small 2D vector helpers.
//!
//! Authoring units are centimeters and degrees; the physics engine works in
//! meters and radians. Every function here is total: no validation, no errors.

use glam::Vec2;

/// Engine meters per authoring centimeter.
pub const ENGINE_UNITS_PER_CM: f32 = 0.01;

#[inline]
pub fn to_engine_length(cm: f32) -> f32 {
    cm * ENGINE_UNITS_PER_CM
}

#[inline]
pub fn from_engine_length(m: f32) -> f32 {
    m / ENGINE_UNITS_PER_CM
}

#[inline]
pub fn to_engine_vec(v: Vec2) -> Vec2 {
    v * ENGINE_UNITS_PER_CM
}

#[inline]
pub fn from_engine_vec(v: Vec2) -> Vec2 {
    v / ENGINE_UNITS_PER_CM
}

#[inline]
pub fn to_radians(deg: f32) -> f32 {
    deg.to_radians()
}

#[inline]
pub fn to_degrees(rad: f32) -> f32 {
    rad.to_degrees()
}

/// Rotate `v` counter-clockwise by `deg` degrees: +90° maps (1,0) to (0,1).
pub fn rotate_deg(v: Vec2, deg: f32) -> Vec2 {
    Vec2::from_angle(to_radians(deg)).rotate(v)
}

#[inline]
pub fn add(a: Vec2, b: Vec2) -> Vec2 {
    a + b
}

#[inline]
pub fn scale(v: Vec2, s: f32) -> Vec2 {
    v * s
}

#[inline]
pub fn dot(a: Vec2, b: Vec2) -> f32 {
    a.dot(b)
}

/// Unit vector along a body's local +x axis for a body at `deg` degrees.
pub fn forward(deg: f32) -> Vec2 {
    rotate_deg(Vec2::X, deg)
}
