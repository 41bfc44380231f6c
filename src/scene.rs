// src/scene.rs
//! Boundary types and traits between the culling engine and the host scene.
//!
//! The engine never walks a live scene graph: the host hands it a snapshot
//! of renderable nodes at activation and a visibility sink + camera handle
//! every frame. All ids are non-owning; scene-node lifetime stays with the
//! host.

use glam::{Mat4, Vec3};

use crate::proxy::Aabb;

/// Opaque id of a scene node. Stable for the lifetime of one activation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeId(pub u64);

/// Opaque id of a mesh renderer owned by a scene node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RendererId(pub u64);

/// Minimal mesh view consumed by the proxy builder: vertex positions, the
/// flattened triangle index list, and the node's world transform.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub world: Mat4,
}

/// One entry of a scene snapshot.
#[derive(Clone, Debug)]
pub struct SceneEntry {
    pub node: NodeId,
    /// Mesh data for the proxy builder. `None` for nodes without mesh data
    /// (they become empty proxies).
    pub mesh: Option<MeshData>,
    /// Mesh renderers belonging to the node, refreshed each activation.
    pub renderers: Vec<RendererId>,
    /// Exclusion tag: entries carrying it never become occlusion candidates
    /// (always rendered, never tested).
    pub excluded: bool,
}

/// Snapshot registry of renderable nodes, injected at activation.
pub trait SceneSource {
    fn snapshot(&self) -> Vec<SceneEntry>;
}

impl SceneSource for Vec<SceneEntry> {
    fn snapshot(&self) -> Vec<SceneEntry> {
        self.clone()
    }
}

/// Write access to renderer enabled flags plus the per-renderer world
/// bounds the frustum test consumes. The enabled flag is the engine's sole
/// externally observable output.
pub trait VisibilitySink {
    /// Set a renderer's enabled flag. Returns `false` when the renderer no
    /// longer exists (stale handle); callers skip such renderers instead of
    /// faulting.
    fn set_enabled(&mut self, renderer: RendererId, enabled: bool) -> bool;

    /// Current world-space bounds of a renderer, `None` when stale.
    fn world_bounds(&self, renderer: RendererId) -> Option<Aabb>;
}

/// Explicit camera handle passed into the per-frame update. No global
/// main-camera lookup.
pub trait CullingCamera {
    /// Current world-to-view transform.
    fn view_matrix(&self) -> Mat4;

    /// Current view-projection transform, the frustum source. Recomputed
    /// by the host every frame.
    fn view_proj_matrix(&self) -> Mat4;

    /// Override the host pipeline's culling transform.
    fn set_culling_matrix(&mut self, matrix: Mat4);

    /// Restore the host pipeline's default culling behavior.
    fn reset_culling_matrix(&mut self);
}
