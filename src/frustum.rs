// src/frustum.rs
//! CPU frustum test: six half-space planes against axis-aligned bounds.

use glam::{Mat4, Vec3, Vec4};

use crate::proxy::Aabb;

/// A half-space `normal · p + distance >= 0` (inside).
#[derive(Copy, Clone, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Build a normalized plane from `(a, b, c, d)` coefficients.
    pub fn from_vec4(v: Vec4) -> Self {
        let length = v.truncate().length().max(1e-6);
        Self {
            normal: v.truncate() / length,
            distance: v.w / length,
        }
    }

    /// Signed distance to a point (positive = in front / inside).
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// View frustum as six planes: left, right, bottom, top, near, far.
#[derive(Clone, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix
    /// (Gribb-Hartmann row method).
    pub fn from_view_proj(vp: Mat4) -> Self {
        let row0 = vp.row(0);
        let row1 = vp.row(1);
        let row2 = vp.row(2);
        let row3 = vp.row(3);

        Self {
            planes: [
                Plane::from_vec4(row3 + row0), // left
                Plane::from_vec4(row3 - row0), // right
                Plane::from_vec4(row3 + row1), // bottom
                Plane::from_vec4(row3 - row1), // top
                Plane::from_vec4(row3 + row2), // near
                Plane::from_vec4(row3 - row2), // far
            ],
        }
    }

    /// Build from an explicit plane set (synthetic cameras, tests).
    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Conservative plane/AABB overlap test. Returns `true` when the bounds
    /// intersect the frustum. May pass bounds that are actually outside
    /// (AABB looseness); never rejects bounds that are truly inside.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let center = aabb.center();
        let extent = aabb.half_extent();

        for plane in &self.planes {
            // Radius of the box projected onto the plane normal.
            let radius = extent.x * plane.normal.x.abs()
                + extent.y * plane.normal.y.abs()
                + extent.z * plane.normal.z.abs();

            if plane.distance_to_point(center) < -radius {
                return false;
            }
        }
        true
    }
}
