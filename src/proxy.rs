// src/proxy.rs
//! Bounding proxies: coarse vertex sets rasterized against the depth buffer
//! in place of full render meshes, plus the bounds derived from them.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::scene::MeshData;

/// One proxy vertex: world-space position with the owning candidate's index
/// packed into `w`. 16-byte layout, shared verbatim with the GPU read
/// buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ProxyVertex(pub [f32; 4]);

impl ProxyVertex {
    #[inline]
    pub fn new(position: Vec3, owner: u32) -> Self {
        Self([position.x, position.y, position.z, owner as f32])
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.0[0], self.0[1], self.0[2])
    }

    #[inline]
    pub fn owner(&self) -> u32 {
        self.0[3] as u32
    }
}

/// Axis-aligned bounds as center + half-extent. Immutable value type: any
/// update replaces the whole value. 24-byte layout matches the GPU bounds
/// buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Aabb {
    pub center: [f32; 3],
    pub half_extent: [f32; 3],
}

impl Aabb {
    /// Bounds of an empty proxy.
    pub const ZERO: Self = Self {
        center: [0.0; 3],
        half_extent: [0.0; 3],
    };

    #[inline]
    pub fn new(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            center: center.to_array(),
            half_extent: half_extent.to_array(),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        Vec3::from(self.center)
    }

    #[inline]
    pub fn half_extent(&self) -> Vec3 {
        Vec3::from(self.half_extent)
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.center() - self.half_extent()
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.center() + self.half_extent()
    }

    /// Bounds of a proxy vertex set: center is the arithmetic mean of the
    /// positions, half-extent is `(max - min) / 2` componentwise. An empty
    /// set yields [`Aabb::ZERO`].
    pub fn from_proxy(vertices: &[ProxyVertex]) -> Self {
        if vertices.is_empty() {
            return Self::ZERO;
        }
        let mut total = Vec3::ZERO;
        let mut min = Vec3::INFINITY;
        let mut max = Vec3::NEG_INFINITY;
        for v in vertices {
            let p = v.position();
            total += p;
            min = min.min(p);
            max = max.max(p);
        }
        let center = total / vertices.len() as f32;
        Self::new(center, (max - min) * 0.5)
    }
}

/// Build the bounding proxy for one candidate: one world-transformed vertex
/// per triangle-index entry of the mesh (the flattened, non-deduplicated
/// triangle list), tagged with the candidate's index.
///
/// A candidate without mesh data produces an empty proxy and a warning; it
/// is still culled by policy, never a fault.
pub fn build_proxy(mesh: Option<&MeshData>, owner: u32) -> Vec<ProxyVertex> {
    let Some(mesh) = mesh else {
        log::warn!("occlusion candidate {owner} has no mesh data, proxy is empty");
        return Vec::new();
    };

    let mut vertices = Vec::with_capacity(mesh.indices.len());
    let mut out_of_range = 0usize;
    for &index in &mesh.indices {
        match mesh.positions.get(index as usize) {
            Some(&local) => {
                let world = mesh.world.transform_point3(local);
                vertices.push(ProxyVertex::new(world, owner));
            }
            None => out_of_range += 1,
        }
    }
    if out_of_range > 0 {
        log::warn!(
            "occlusion candidate {owner}: {out_of_range} triangle indices out of range, skipped"
        );
    }
    vertices
}
