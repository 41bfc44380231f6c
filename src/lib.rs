// src/lib.rs
//! GPU-assisted occlusion culling for wgpu renderers.
//!
//! Approximates hardware occlusion queries without a native query API: each
//! renderable gets a coarse bounding proxy built from its mesh, all proxies
//! are drawn against the scene's depth buffer with color writes off, and
//! surviving fragments flag a per-object result slot in a storage buffer.
//! The CPU reads the slots back one sampling interval later and folds them
//! with a frustum test into renderer enabled flags.
//!
//! ```no_run
//! use std::sync::Arc;
//! use depthcull::{CullingConfig, OcclusionCuller, WgpuBackend};
//!
//! # fn demo(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>,
//! #         scene: &dyn depthcull::SceneSource,
//! #         camera: &mut dyn depthcull::CullingCamera,
//! #         sink: &mut dyn depthcull::VisibilitySink,
//! #         depth_view: wgpu::TextureView) -> depthcull::Result<()> {
//! let backend = WgpuBackend::new(device, queue, wgpu::TextureFormat::Depth32Float);
//! let mut culler = OcclusionCuller::new(backend, CullingConfig::default());
//! culler.backend_mut().set_depth_target(depth_view);
//! culler.activate(scene)?;
//! // each frame, after the opaque pass has written depth:
//! culler.update(camera, sink)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod culler;
pub mod error;
pub mod frustum;
pub mod gpu;
pub mod native;
pub mod proxy;
pub mod scene;

pub use config::{CullingConfig, EmptyProxyPolicy};
pub use culler::{Candidate, CullingStats, OcclusionCuller};
pub use error::{Error, Result};
pub use frustum::{Frustum, Plane};
pub use gpu::{slot_magnitude_sq, QueryBackend, ResultSlot, WgpuBackend};
pub use proxy::{build_proxy, Aabb, ProxyVertex};
pub use scene::{
    CullingCamera, MeshData, NodeId, RendererId, SceneEntry, SceneSource, VisibilitySink,
};
