// src/config.rs
//! Configuration knobs for the culling engine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do with a candidate whose bounding proxy has no vertices
/// (typically a node without mesh data). Such a candidate can never receive
/// a GPU write, so left alone it is permanently occluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyProxyPolicy {
    /// Treat the candidate as always occluded. Matches the raw
    /// zero-magnitude rule.
    Occlude,
    /// Exempt the candidate from the occlusion term; only the frustum test
    /// gates it.
    KeepVisible,
}

/// Configuration for [`OcclusionCuller`](crate::culler::OcclusionCuller).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CullingConfig {
    /// Enable the CPU-side frustum test. Disabled, every candidate passes
    /// the frustum term.
    pub frustum_culling: bool,
    /// Enable the GPU occlusion query path. Disabled, the engine degrades
    /// to frustum-only gating and skips all GPU work.
    pub occlusion_culling: bool,
    /// Number of frames between occlusion re-evaluations. `1` = every
    /// frame. Must be >= 1.
    pub sampling_interval: u32,
    /// Occlusion policy for candidates with an empty proxy.
    pub empty_proxy_policy: EmptyProxyPolicy,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            frustum_culling: true,
            occlusion_culling: true,
            sampling_interval: 1,
            empty_proxy_policy: EmptyProxyPolicy::Occlude,
        }
    }
}

impl CullingConfig {
    /// Validate knob values. Called at activation so a bad config never
    /// reaches the per-frame path.
    pub fn validate(&self) -> Result<()> {
        if self.sampling_interval == 0 {
            return Err(Error::Config(
                "sampling_interval must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
