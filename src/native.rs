// src/native.rs
//! Keeps the host pipeline's own frustum culling switched off while the
//! engine drives visibility.
//!
//! The host would otherwise disable renderers before this engine evaluates
//! them with its own frustum+occlusion policy, double-culling and leaving
//! the enabled flags in an inconsistent state. The override is a degenerate
//! culling projection that accepts the whole addressable range.

use glam::{Mat4, Vec3};

use crate::scene::CullingCamera;

const RANGE: f32 = 99_999.0;
const NEAR: f32 = 0.001;

/// Degenerate culling projection accepting the whole addressable range.
/// Re-derived from the camera's current view transform so the override
/// tracks camera movement.
pub fn unbounded_culling_matrix(view: Mat4) -> Mat4 {
    Mat4::orthographic_rh(-RANGE, RANGE, -RANGE, RANGE, NEAR, RANGE)
        * Mat4::from_translation(Vec3::new(0.0, 0.0, -RANGE * 0.5))
        * view
}

/// Apply the override for the current frame. Call once per frame while the
/// engine is active, before the host's culling step runs.
pub fn apply(camera: &mut dyn CullingCamera) {
    let view = camera.view_matrix();
    camera.set_culling_matrix(unbounded_culling_matrix(view));
}

/// Restore the camera's default culling behavior. Call on deactivation.
pub fn restore(camera: &mut dyn CullingCamera) {
    camera.reset_culling_matrix();
}
