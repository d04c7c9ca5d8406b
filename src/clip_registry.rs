use crate::axis::{detect_position_up_axis, normalize_clip, AxisSourceHint, NormalizeOptions, UpAxis};
use crate::bone_names::BoneNameResolver;
use crate::clip::gltf_import::load_clips_from_gltf;
use crate::clip::{load_clip_json, mirror_vrm0, retarget_clip, AnimationClip, RetargetOptions};
use crate::state_machine::ClipResidency;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Load state of a clip identifier as seen by playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipStatus {
    Pending,
    Ready,
    Failed(String),
}

impl ClipStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ClipStatus::Ready)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GltfLoadOptions {
    pub hint: AxisSourceHint,
    /// Hips height of the avatar the clip will drive; scales root motion when known.
    pub target_hips_height: Option<f32>,
    pub vrm0: bool,
}

#[derive(Debug)]
struct ClipEntry {
    status: ClipStatus,
    clip: Option<Arc<AnimationClip>>,
    refs: u32,
}

impl ClipEntry {
    fn pending() -> Self {
        Self { status: ClipStatus::Pending, clip: None, refs: 0 }
    }
}

/// Per-engine clip cache. Clips are normalised to Y-up once, at insertion, and
/// shared read-only afterwards.
#[derive(Debug)]
pub struct ClipRegistry {
    resolver: Arc<BoneNameResolver>,
    normalize: NormalizeOptions,
    entries: HashMap<String, ClipEntry>,
}

impl Default for ClipRegistry {
    fn default() -> Self {
        Self::new(Arc::new(BoneNameResolver::new()))
    }
}

impl ClipRegistry {
    pub fn new(resolver: Arc<BoneNameResolver>) -> Self {
        Self { resolver, normalize: NormalizeOptions::default(), entries: HashMap::new() }
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    pub fn resolver(&self) -> &Arc<BoneNameResolver> {
        &self.resolver
    }

    /// Normalise and cache `clip` under `key`, replacing whatever was there.
    pub fn insert(&mut self, key: impl Into<String>, clip: AnimationClip) -> Arc<AnimationClip> {
        self.insert_with_hint(key, clip, self.normalize.hint)
    }

    pub fn insert_with_hint(
        &mut self,
        key: impl Into<String>,
        clip: AnimationClip,
        hint: AxisSourceHint,
    ) -> Arc<AnimationClip> {
        let options = NormalizeOptions { hint, ..self.normalize };
        self.store(key.into(), normalize_clip(&clip, options))
    }

    fn store(&mut self, key: String, normalized: AnimationClip) -> Arc<AnimationClip> {
        let normalized = Arc::new(normalized);
        log::debug!(
            target: "motion::clips",
            "clip '{}' cached as '{}' ({} tracks, {:.2}s)",
            normalized.name,
            key,
            normalized.tracks.len(),
            normalized.duration
        );
        let entry = self.entries.entry(key).or_insert_with(ClipEntry::pending);
        entry.status = ClipStatus::Ready;
        entry.clip = Some(Arc::clone(&normalized));
        normalized
    }

    pub fn load_json(&mut self, key: impl Into<String>, path: impl AsRef<Path>) -> Result<Arc<AnimationClip>> {
        let key = key.into();
        match load_clip_json(path.as_ref(), &self.resolver) {
            Ok(clip) => Ok(self.insert(key, clip)),
            Err(err) => {
                self.mark_failed(&key, format!("{err:#}"));
                Err(err)
            }
        }
    }

    /// Import the first animation of a glTF file, retargeted onto canonical bones.
    /// The VRM 0.x mirror runs after Y-up normalisation; mirroring Z-up data
    /// would flip the vertical axis instead.
    pub fn load_gltf(
        &mut self,
        key: impl Into<String>,
        path: impl AsRef<Path>,
        options: GltfLoadOptions,
    ) -> Result<Arc<AnimationClip>> {
        let key = key.into();
        let path = path.as_ref();
        let result = load_clips_from_gltf(path, &self.resolver).and_then(|import| {
            if import.clips.len() > 1 {
                log::warn!(
                    target: "motion::clips",
                    "GLTF '{}' contains {} animations; only the first is used for '{}'",
                    path.display(),
                    import.clips.len(),
                    key
                );
            }
            let clip = import
                .clips
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("GLTF '{}' contains no usable animations", path.display()))?;

            let detected = import.hips_rest_translation.map(detect_position_up_axis);
            let mut retarget = RetargetOptions { rest: import.rest, ..Default::default() };
            if let (Some(rest), Some(target)) = (import.hips_rest_translation, options.target_hips_height) {
                let source = match detected {
                    Some(UpAxis::Z) => rest.z.abs(),
                    Some(UpAxis::X) => rest.x.abs(),
                    _ => rest.y.abs(),
                };
                retarget = retarget.with_hips_heights(source, target);
            }
            let mut retargeted = retarget_clip(&clip, &retarget);
            if retargeted.root_rotation.is_none() && retargeted.up_axis.is_none() {
                retargeted.up_axis = detected;
            }
            let normalized = normalize_clip(&retargeted, NormalizeOptions { hint: options.hint, ..self.normalize });
            Ok(if options.vrm0 { mirror_vrm0(&normalized) } else { normalized })
        });
        match result {
            Ok(clip) => Ok(self.store(key, clip)),
            Err(err) => {
                self.mark_failed(&key, format!("{err:#}"));
                Err(err)
            }
        }
    }

    /// Record that a load for `key` is in flight. A previously ready clip stays available.
    pub fn mark_pending(&mut self, key: &str) {
        let entry = self.entries.entry(key.to_string()).or_insert_with(ClipEntry::pending);
        if entry.clip.is_none() {
            entry.status = ClipStatus::Pending;
        }
    }

    /// Record a failed load. Data from an earlier successful load is kept as last-known-good.
    pub fn mark_failed(&mut self, key: &str, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!(target: "motion::clips", "clip '{}' failed to load: {}", key, reason);
        let entry = self.entries.entry(key.to_string()).or_insert_with(ClipEntry::pending);
        entry.status = ClipStatus::Failed(reason);
    }

    pub fn status(&self, key: &str) -> Option<&ClipStatus> {
        self.entries.get(key).map(|entry| &entry.status)
    }

    pub fn clip(&self, key: &str) -> Option<Arc<AnimationClip>> {
        self.entries.get(key).and_then(|entry| entry.clip.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Increment the residency count for `key`; returns the new count.
    pub fn retain(&mut self, key: &str) -> u32 {
        let entry = self.entries.entry(key.to_string()).or_insert_with(ClipEntry::pending);
        entry.refs = entry.refs.saturating_add(1);
        entry.refs
    }

    /// Decrement the residency count for `key`; returns the new count. Cached data is kept.
    pub fn release(&mut self, key: &str) -> u32 {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.refs = entry.refs.saturating_sub(1);
                entry.refs
            }
            None => 0,
        }
    }

    /// Move residency counts from `previous` to `current`. Keys present in both stay untouched.
    pub fn sync_residency(&mut self, previous: &ClipResidency, current: &ClipResidency) {
        for key in current.keys() {
            if !previous.keys().any(|old| old == key) {
                self.retain(key);
            }
        }
        for key in previous.keys() {
            if !current.keys().any(|new| new == key) {
                self.release(key);
            }
        }
    }

    pub fn ref_count(&self, key: &str) -> u32 {
        self.entries.get(key).map(|entry| entry.refs).unwrap_or(0)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
