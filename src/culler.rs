// src/culler.rs
//! The occlusion-query culler: candidate set, visibility resolution and
//! per-frame orchestration.
//!
//! Per activation: snapshot the scene, build bounding proxies, allocate the
//! GPU buffer set. Per frame: keep the host's native culling disabled; on
//! sampling frames read back the previous pass's result slots, fold them
//! with the frustum test into each renderer's enabled flag, clear the
//! result buffer and submit the next sampling draw. Visibility decisions
//! lag true occlusion state by one sampling interval; the readback is never
//! made same-frame, which would stall the pipeline every frame.

use crate::config::{CullingConfig, EmptyProxyPolicy};
use crate::context::Context as _;
use crate::error::Result;
use crate::frustum::Frustum;
use crate::gpu::{slot_magnitude_sq, QueryBackend, ResultSlot};
use crate::native;
use crate::proxy::{build_proxy, Aabb};
use crate::scene::{CullingCamera, NodeId, RendererId, SceneSource, VisibilitySink};

/// One occlusion candidate. Holds only non-owning ids; scene-node lifetime
/// stays with the host.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub node: NodeId,
    pub renderers: Vec<RendererId>,
    pub bounds: Aabb,
    /// Proxy vertex count. Zero for candidates without mesh data, whose
    /// occlusion is governed by [`EmptyProxyPolicy`].
    pub proxy_len: usize,
}

/// Counters refreshed by each resolver pass. Counts are per renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct CullingStats {
    pub candidates: usize,
    pub visible: usize,
    pub frustum_culled: usize,
    pub occlusion_culled: usize,
}

/// The culling engine. Generic over the GPU backend so the resolver logic
/// is exercisable without a device.
pub struct OcclusionCuller<B: QueryBackend> {
    config: CullingConfig,
    backend: B,
    candidates: Vec<Candidate>,
    /// CPU copy of the result slots, refilled by each readback.
    elements: Vec<ResultSlot>,
    frame_index: u64,
    active: bool,
    stats: CullingStats,
}

impl<B: QueryBackend> OcclusionCuller<B> {
    pub fn new(backend: B, config: CullingConfig) -> Self {
        Self {
            config,
            backend,
            candidates: Vec::new(),
            elements: Vec::new(),
            frame_index: 0,
            active: false,
            stats: CullingStats::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn config(&self) -> &CullingConfig {
        &self.config
    }

    pub fn stats(&self) -> CullingStats {
        self.stats
    }

    /// Candidate set of the current activation.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Host access to the backend (depth-target updates and the like).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Build the candidate set from a scene snapshot and allocate the GPU
    /// buffer set. Re-activating rebuilds everything; renderer lists are
    /// refreshed since children may have changed.
    pub fn activate(&mut self, scene: &dyn SceneSource) -> Result<()> {
        self.config.validate()?;

        self.backend.release();
        self.candidates.clear();
        self.elements.clear();
        self.frame_index = 0;
        self.stats = CullingStats::default();
        self.active = false;

        let mut bounds_list = Vec::new();
        let mut vertices = Vec::new();
        for entry in scene.snapshot() {
            if entry.excluded {
                continue;
            }
            let owner = self.candidates.len() as u32;
            let proxy = build_proxy(entry.mesh.as_ref(), owner);
            let bounds = Aabb::from_proxy(&proxy);
            bounds_list.push(bounds);
            self.candidates.push(Candidate {
                node: entry.node,
                renderers: entry.renderers,
                bounds,
                proxy_len: proxy.len(),
            });
            vertices.extend(proxy);
        }

        if self.candidates.is_empty() {
            // Nothing to test: skip GPU allocation and all sampling work.
            log::debug!("no occlusion candidates after filtering");
            self.active = true;
            return Ok(());
        }

        if self.config.occlusion_culling {
            if let Err(err) = self
                .backend
                .allocate(&bounds_list, &vertices)
                .context("activating occlusion culler")
            {
                self.candidates.clear();
                return Err(err);
            }
            self.elements = vec![[0.0; 4]; self.candidates.len()];
        }

        self.stats.candidates = self.candidates.len();
        self.active = true;
        log::debug!(
            "occlusion culler active: {} candidates, {} proxy vertices",
            self.candidates.len(),
            vertices.len()
        );
        Ok(())
    }

    /// Per-frame entry point. Call once per frame, after the host has
    /// written opaque scene depth for the previous sampling submission to
    /// test against.
    pub fn update(
        &mut self,
        camera: &mut dyn CullingCamera,
        sink: &mut dyn VisibilitySink,
    ) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        // Keep the host's own frustum culling degenerate every frame,
        // tracking camera movement.
        native::apply(camera);

        let frame = self.frame_index;
        self.frame_index += 1;
        if frame % u64::from(self.config.sampling_interval) != 0 {
            // Off-interval frames leave prior enabled flags untouched.
            return Ok(());
        }
        if self.candidates.is_empty() {
            return Ok(());
        }

        let occlusion_on = self.config.occlusion_culling && self.backend.is_allocated();

        // Consumer side of the handoff: observe the previous sampling
        // pass's writes. A failed readback degrades this interval to
        // frustum-only.
        let mut results_valid = occlusion_on;
        if occlusion_on {
            match self.backend.read_results(&mut self.elements) {
                Ok(()) => {}
                Err(err) if err.is_readback() => {
                    log::warn!("occlusion readback failed, frustum-only this interval: {err}");
                    results_valid = false;
                }
                Err(err) => return Err(err),
            }
        }

        let frustum = self
            .config
            .frustum_culling
            .then(|| Frustum::from_view_proj(camera.view_proj_matrix()));

        let mut stats = CullingStats {
            candidates: self.candidates.len(),
            ..Default::default()
        };
        for (index, candidate) in self.candidates.iter().enumerate() {
            let occluded = results_valid
                && occluded_by_query(
                    &self.elements[index],
                    candidate,
                    self.config.empty_proxy_policy,
                );
            for &renderer in &candidate.renderers {
                let mut enabled = true;
                let mut outside_frustum = false;
                if let Some(frustum) = &frustum {
                    match sink.world_bounds(renderer) {
                        Some(bounds) => {
                            if !frustum.intersects_aabb(&bounds) {
                                enabled = false;
                                outside_frustum = true;
                            }
                        }
                        // Stale handle: skip defensively.
                        None => continue,
                    }
                }
                if enabled && occluded {
                    enabled = false;
                }
                if !sink.set_enabled(renderer, enabled) {
                    continue;
                }
                if enabled {
                    stats.visible += 1;
                } else if outside_frustum {
                    stats.frustum_culled += 1;
                } else {
                    stats.occlusion_culled += 1;
                }
            }
        }
        self.stats = stats;

        if occlusion_on {
            // Clean slate for the producer, then the next sampling draw.
            // Never overlapped: the readback above already waited out every
            // prior submission touching the buffer.
            self.elements.fill([0.0; 4]);
            self.backend
                .clear_results()
                .context("clearing result buffer")?;
            self.backend.submit_sampling(camera.view_proj_matrix())?;
        }
        Ok(())
    }

    /// Restore every renderer, reset the camera's culling behavior and
    /// release the buffer set. Safe to call with nothing allocated.
    pub fn deactivate(
        &mut self,
        camera: &mut dyn CullingCamera,
        sink: &mut dyn VisibilitySink,
    ) {
        let mut stale = 0usize;
        for candidate in &self.candidates {
            for &renderer in &candidate.renderers {
                if !sink.set_enabled(renderer, true) {
                    stale += 1;
                }
            }
        }
        if stale > 0 {
            log::debug!("{stale} renderers already gone during visibility restore");
        }
        native::restore(camera);
        self.backend.release();
        self.candidates.clear();
        self.elements.clear();
        self.frame_index = 0;
        self.active = false;
        log::debug!("occlusion culler deactivated");
    }
}

fn occluded_by_query(
    slot: &ResultSlot,
    candidate: &Candidate,
    policy: EmptyProxyPolicy,
) -> bool {
    if candidate.proxy_len == 0 && policy == EmptyProxyPolicy::KeepVisible {
        return false;
    }
    slot_magnitude_sq(slot) <= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::scene::{MeshData, SceneEntry};
    use glam::{Mat4, Vec3};
    use std::collections::HashMap;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    /// In-memory stand-in for the GPU. `scripted` marks which candidates
    /// the depth test would report visible; a sampling submit applies those
    /// marks, so readbacks observe them one resolver pass later, exactly
    /// like the real producer/consumer handoff.
    #[derive(Default)]
    struct MockBackend {
        slots: Vec<ResultSlot>,
        scripted: Vec<bool>,
        allocated: bool,
        submits: usize,
        calls: Vec<&'static str>,
        fail_allocate: bool,
        fail_read: bool,
    }

    impl QueryBackend for MockBackend {
        fn allocate(&mut self, bounds: &[Aabb], _vertices: &[crate::proxy::ProxyVertex]) -> Result<()> {
            if self.fail_allocate {
                return Err(Error::BufferAllocation("out of memory".into()));
            }
            self.slots = vec![[0.0; 4]; bounds.len()];
            if self.scripted.len() != bounds.len() {
                self.scripted = vec![false; bounds.len()];
            }
            self.allocated = true;
            self.calls.push("allocate");
            Ok(())
        }

        fn release(&mut self) {
            if self.allocated {
                self.calls.push("release");
            }
            self.allocated = false;
        }

        fn is_allocated(&self) -> bool {
            self.allocated
        }

        fn submit_sampling(&mut self, _view_proj: Mat4) -> Result<()> {
            self.calls.push("submit");
            self.submits += 1;
            for (slot, &visible) in self.slots.iter_mut().zip(&self.scripted) {
                if visible {
                    *slot = [1.0, 1.0, 1.0, 1.0];
                }
            }
            Ok(())
        }

        fn read_results(&mut self, out: &mut [ResultSlot]) -> Result<()> {
            self.calls.push("read");
            if self.fail_read {
                return Err(Error::Readback("device lost".into()));
            }
            out.copy_from_slice(&self.slots);
            Ok(())
        }

        fn clear_results(&mut self) -> Result<()> {
            self.calls.push("clear");
            self.slots.fill([0.0; 4]);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockSink {
        renderers: HashMap<RendererId, (bool, Aabb)>,
        set_calls: usize,
    }

    impl MockSink {
        fn insert(&mut self, id: RendererId, bounds: Aabb) {
            self.renderers.insert(id, (true, bounds));
        }

        fn enabled(&self, id: RendererId) -> bool {
            self.renderers[&id].0
        }
    }

    impl VisibilitySink for MockSink {
        fn set_enabled(&mut self, renderer: RendererId, enabled: bool) -> bool {
            self.set_calls += 1;
            match self.renderers.get_mut(&renderer) {
                Some(state) => {
                    state.0 = enabled;
                    true
                }
                None => false,
            }
        }

        fn world_bounds(&self, renderer: RendererId) -> Option<Aabb> {
            self.renderers.get(&renderer).map(|state| state.1)
        }
    }

    struct MockCamera {
        view: Mat4,
        proj: Mat4,
        culling_matrix: Option<Mat4>,
        resets: usize,
    }

    impl MockCamera {
        fn looking_down_neg_z() -> Self {
            Self {
                view: Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y),
                proj: Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 1000.0),
                culling_matrix: None,
                resets: 0,
            }
        }
    }

    impl CullingCamera for MockCamera {
        fn view_matrix(&self) -> Mat4 {
            self.view
        }

        fn view_proj_matrix(&self) -> Mat4 {
            self.proj * self.view
        }

        fn set_culling_matrix(&mut self, matrix: Mat4) {
            self.culling_matrix = Some(matrix);
        }

        fn reset_culling_matrix(&mut self) {
            self.culling_matrix = None;
            self.resets += 1;
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn cube_mesh(center: Vec3) -> MeshData {
        let he = 0.5;
        MeshData {
            positions: vec![
                Vec3::new(-he, -he, -he),
                Vec3::new(he, -he, -he),
                Vec3::new(he, he, -he),
                Vec3::new(-he, he, -he),
                Vec3::new(-he, -he, he),
                Vec3::new(he, -he, he),
                Vec3::new(he, he, he),
                Vec3::new(-he, he, he),
            ],
            indices: vec![
                4, 5, 6, 4, 6, 7, // front
                1, 0, 3, 1, 3, 2, // back
                0, 4, 7, 0, 7, 3, // left
                5, 1, 2, 5, 2, 6, // right
                0, 1, 5, 0, 5, 4, // bottom
                3, 7, 6, 3, 6, 2, // top
            ],
            world: Mat4::from_translation(center),
        }
    }

    fn entry(node: u64, renderer: u64, center: Vec3) -> SceneEntry {
        SceneEntry {
            node: NodeId(node),
            mesh: Some(cube_mesh(center)),
            renderers: vec![RendererId(renderer)],
            excluded: false,
        }
    }

    fn setup(
        config: CullingConfig,
        entries: Vec<SceneEntry>,
    ) -> (OcclusionCuller<MockBackend>, MockSink, MockCamera) {
        let mut sink = MockSink::default();
        for e in &entries {
            for &r in &e.renderers {
                let center = e
                    .mesh
                    .as_ref()
                    .map(|m| m.world.transform_point3(Vec3::ZERO))
                    .unwrap_or(Vec3::ZERO);
                sink.insert(r, Aabb::new(center, Vec3::splat(0.5)));
            }
        }
        let mut culler = OcclusionCuller::new(MockBackend::default(), config);
        culler.activate(&entries).unwrap();
        (culler, sink, MockCamera::looking_down_neg_z())
    }

    const IN_VIEW: Vec3 = Vec3::new(0.0, 0.0, -10.0);
    const OUT_OF_VIEW: Vec3 = Vec3::new(0.0, 0.0, 500.0); // behind the camera

    // ------------------------------------------------------------------
    // Candidate building
    // ------------------------------------------------------------------

    #[test]
    fn excluded_nodes_never_become_candidates() {
        let mut entries = vec![entry(1, 1, IN_VIEW), entry(2, 2, IN_VIEW)];
        entries[1].excluded = true;
        let (culler, _, _) = setup(CullingConfig::default(), entries);

        assert_eq!(culler.candidates().len(), 1);
        assert!(culler.candidates().iter().all(|c| c.node != NodeId(2)));
    }

    #[test]
    fn empty_snapshot_skips_gpu_allocation() {
        let (mut culler, mut sink, mut camera) = setup(CullingConfig::default(), Vec::new());
        assert!(culler.is_active());
        assert!(!culler.backend_mut().is_allocated());

        culler.update(&mut camera, &mut sink).unwrap();
        assert!(culler.backend_mut().calls.is_empty());
    }

    #[test]
    fn allocation_failure_is_fatal_and_leaves_culler_inactive() {
        let mut backend = MockBackend::default();
        backend.fail_allocate = true;
        let mut culler = OcclusionCuller::new(backend, CullingConfig::default());
        let err = culler
            .activate(&vec![entry(1, 1, IN_VIEW)])
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!culler.is_active());
        assert!(culler.candidates().is_empty());
    }

    #[test]
    fn invalid_interval_rejected_at_activation() {
        let config = CullingConfig {
            sampling_interval: 0,
            ..Default::default()
        };
        let mut culler = OcclusionCuller::new(MockBackend::default(), config);
        let entries: Vec<SceneEntry> = Vec::new();
        assert!(culler.activate(&entries).unwrap_err().is_config());
    }

    // ------------------------------------------------------------------
    // End-to-end scenarios
    // ------------------------------------------------------------------

    #[test]
    fn scenario_a_everything_disabled_keeps_renderer_enabled() {
        let config = CullingConfig {
            frustum_culling: false,
            occlusion_culling: false,
            ..Default::default()
        };
        let (mut culler, mut sink, mut camera) =
            setup(config, vec![entry(1, 1, OUT_OF_VIEW)]);

        for _ in 0..5 {
            culler.update(&mut camera, &mut sink).unwrap();
            assert!(sink.enabled(RendererId(1)));
        }
        // No GPU path at all in this mode.
        assert_eq!(culler.backend_mut().submits, 0);
    }

    #[test]
    fn scenario_b_frustum_only_disables_out_of_view_renderer() {
        let config = CullingConfig {
            occlusion_culling: false,
            ..Default::default()
        };
        let (mut culler, mut sink, mut camera) =
            setup(config, vec![entry(1, 1, OUT_OF_VIEW)]);

        for _ in 0..5 {
            culler.update(&mut camera, &mut sink).unwrap();
            assert!(!sink.enabled(RendererId(1)));
        }
    }

    #[test]
    fn scenario_c_zero_slots_disable_within_two_passes() {
        let (mut culler, mut sink, mut camera) =
            setup(CullingConfig::default(), vec![entry(1, 1, IN_VIEW)]);
        // Proxy fragments never survive: scripted stays all-false.

        culler.update(&mut camera, &mut sink).unwrap(); // pass 1
        let after_first = sink.enabled(RendererId(1));
        culler.update(&mut camera, &mut sink).unwrap(); // pass 2
        assert!(!sink.enabled(RendererId(1)), "disabled by the 2nd pass");
        culler.update(&mut camera, &mut sink).unwrap(); // pass 3
        assert!(!sink.enabled(RendererId(1)), "still disabled on the 3rd");
        // The first pass may already have disabled it; it must never have
        // turned it back on.
        assert!(!after_first || !sink.enabled(RendererId(1)));
    }

    #[test]
    fn scenario_d_interval_throttles_sampling_and_resolve() {
        let config = CullingConfig {
            sampling_interval: 4,
            ..Default::default()
        };
        let (mut culler, mut sink, mut camera) = setup(config, vec![entry(1, 1, IN_VIEW)]);

        for frame in 0..9u64 {
            let before = sink.set_calls;
            culler.update(&mut camera, &mut sink).unwrap();
            if frame % 4 == 0 {
                assert!(sink.set_calls > before, "resolver runs on frame {frame}");
            } else {
                assert_eq!(sink.set_calls, before, "frame {frame} leaves flags untouched");
            }
        }
        // Sampling frames 0, 4, 8.
        assert_eq!(culler.backend_mut().submits, 3);
    }

    // ------------------------------------------------------------------
    // Latency and clearing
    // ------------------------------------------------------------------

    #[test]
    fn visibility_flip_lands_one_interval_later() {
        let (mut culler, mut sink, mut camera) =
            setup(CullingConfig::default(), vec![entry(1, 1, IN_VIEW)]);

        // Occluded at first: zero slots.
        culler.update(&mut camera, &mut sink).unwrap();
        culler.update(&mut camera, &mut sink).unwrap();
        assert!(!sink.enabled(RendererId(1)));

        // The object becomes visible on the GPU from now on.
        culler.backend_mut().scripted = vec![true];

        // The pass that *samples* the new state has already read the old
        // zero slots; the renderer stays disabled for this interval.
        culler.update(&mut camera, &mut sink).unwrap();
        assert!(!sink.enabled(RendererId(1)));

        // Next resolver pass observes the write: enabled, one interval late.
        culler.update(&mut camera, &mut sink).unwrap();
        assert!(sink.enabled(RendererId(1)));
    }

    #[test]
    fn resolver_reads_then_clears_then_samples() {
        let (mut culler, mut sink, mut camera) =
            setup(CullingConfig::default(), vec![entry(1, 1, IN_VIEW)]);
        culler.backend_mut().calls.clear();

        culler.update(&mut camera, &mut sink).unwrap();
        assert_eq!(culler.backend_mut().calls, vec!["read", "clear", "submit"]);
    }

    #[test]
    fn result_slots_are_zero_after_resolver_pass() {
        let (mut culler, mut sink, mut camera) =
            setup(CullingConfig::default(), vec![entry(1, 1, IN_VIEW), entry(2, 2, IN_VIEW)]);
        culler.backend_mut().scripted = vec![true, true];

        for _ in 0..3 {
            culler.update(&mut camera, &mut sink).unwrap();
        }
        // scripted writes land after the clear; wipe them to observe the
        // cleared state the resolver left behind.
        culler.backend_mut().scripted = vec![false, false];
        culler.update(&mut camera, &mut sink).unwrap();
        for slot in &culler.backend_mut().slots {
            assert_eq!(slot_magnitude_sq(slot), 0.0);
        }
    }

    // ------------------------------------------------------------------
    // Policies and degradation
    // ------------------------------------------------------------------

    #[test]
    fn empty_proxy_occludes_by_default() {
        let mut e = entry(1, 1, IN_VIEW);
        e.mesh = None;
        let config = CullingConfig {
            frustum_culling: false,
            ..Default::default()
        };
        let (mut culler, mut sink, mut camera) = setup(config, vec![e]);

        culler.update(&mut camera, &mut sink).unwrap();
        assert!(!sink.enabled(RendererId(1)));
    }

    #[test]
    fn empty_proxy_keep_visible_policy() {
        let mut e = entry(1, 1, IN_VIEW);
        e.mesh = None;
        let config = CullingConfig {
            frustum_culling: false,
            empty_proxy_policy: EmptyProxyPolicy::KeepVisible,
            ..Default::default()
        };
        let (mut culler, mut sink, mut camera) = setup(config, vec![e]);

        for _ in 0..3 {
            culler.update(&mut camera, &mut sink).unwrap();
            assert!(sink.enabled(RendererId(1)));
        }
    }

    #[test]
    fn readback_failure_degrades_to_frustum_only() {
        let (mut culler, mut sink, mut camera) =
            setup(CullingConfig::default(), vec![entry(1, 1, IN_VIEW)]);
        culler.backend_mut().fail_read = true;

        // Slots are all zero, which would occlude; the failed readback must
        // leave the in-frustum renderer enabled instead.
        culler.update(&mut camera, &mut sink).unwrap();
        assert!(sink.enabled(RendererId(1)));
    }

    #[test]
    fn stale_renderer_is_skipped_not_faulted() {
        let (mut culler, mut sink, mut camera) = setup(
            CullingConfig::default(),
            vec![entry(1, 1, IN_VIEW), entry(2, 2, IN_VIEW)],
        );
        // Renderer 2 vanished after activation.
        sink.renderers.remove(&RendererId(2));

        culler.update(&mut camera, &mut sink).unwrap();
        assert!(sink.renderers.contains_key(&RendererId(1)));

        // Deactivation restore also skips it without faulting.
        culler.deactivate(&mut camera, &mut sink);
        assert!(sink.enabled(RendererId(1)));
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    #[test]
    fn update_keeps_native_culling_overridden() {
        let (mut culler, mut sink, mut camera) =
            setup(CullingConfig::default(), vec![entry(1, 1, IN_VIEW)]);

        culler.update(&mut camera, &mut sink).unwrap();
        let expected = native::unbounded_culling_matrix(camera.view);
        assert_eq!(camera.culling_matrix, Some(expected));

        // Camera moves; the override tracks the new view.
        camera.view = Mat4::look_at_rh(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z, Vec3::Y);
        culler.update(&mut camera, &mut sink).unwrap();
        assert_eq!(
            camera.culling_matrix,
            Some(native::unbounded_culling_matrix(camera.view))
        );
    }

    #[test]
    fn deactivate_restores_everything() {
        let (mut culler, mut sink, mut camera) = setup(
            CullingConfig::default(),
            vec![entry(1, 1, OUT_OF_VIEW), entry(2, 2, IN_VIEW)],
        );

        culler.update(&mut camera, &mut sink).unwrap();
        assert!(!sink.enabled(RendererId(1)));

        culler.deactivate(&mut camera, &mut sink);
        assert!(sink.enabled(RendererId(1)));
        assert!(sink.enabled(RendererId(2)));
        assert_eq!(camera.culling_matrix, None);
        assert_eq!(camera.resets, 1);
        assert!(!culler.is_active());
        assert!(!culler.backend_mut().is_allocated());

        // Deactivating again with nothing allocated is a no-op.
        culler.deactivate(&mut camera, &mut sink);
    }

    #[test]
    fn reactivation_rebuilds_candidates() {
        let (mut culler, _sink, _camera) =
            setup(CullingConfig::default(), vec![entry(1, 1, IN_VIEW)]);
        assert_eq!(culler.candidates().len(), 1);

        let entries = vec![entry(1, 1, IN_VIEW), entry(2, 2, IN_VIEW)];
        culler.activate(&entries).unwrap();
        assert_eq!(culler.candidates().len(), 2);
        assert_eq!(culler.candidates()[1].node, NodeId(2));
    }

    #[test]
    fn stats_track_resolver_outcome() {
        let (mut culler, mut sink, mut camera) = setup(
            CullingConfig::default(),
            vec![entry(1, 1, IN_VIEW), entry(2, 2, OUT_OF_VIEW)],
        );
        culler.backend_mut().scripted = vec![true, true];

        culler.update(&mut camera, &mut sink).unwrap();
        culler.update(&mut camera, &mut sink).unwrap();

        let stats = culler.stats();
        assert_eq!(stats.candidates, 2);
        assert_eq!(stats.visible, 1);
        assert_eq!(stats.frustum_culled, 1);
        assert_eq!(stats.occlusion_culled, 0);
    }
}
