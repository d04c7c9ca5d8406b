use crate::axis::{clip_is_z_up, AxisSourceHint};
use crate::bone_names::BoneNameResolver;
use crate::clip::gltf_import::load_clips_from_gltf;
use crate::clip::{parse_clip_json_bytes, AnimationClip};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipValidationSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for ClipValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipValidationSeverity::Info => write!(f, "info"),
            ClipValidationSeverity::Warning => write!(f, "warning"),
            ClipValidationSeverity::Error => write!(f, "error"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClipValidationEvent {
    pub severity: ClipValidationSeverity,
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ClipValidator {
    resolver: BoneNameResolver,
}

impl ClipValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the clip file at `path` and return any validation events.
    pub fn validate_path(&self, path: &Path) -> Vec<ClipValidationEvent> {
        if !path.exists() {
            return vec![event(path, ClipValidationSeverity::Warning, "File not found (it may have been removed).")];
        }
        let ext = path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => self.validate_json(path),
            Some("gltf") | Some("glb") => self.validate_gltf(path),
            _ => vec![event(path, ClipValidationSeverity::Info, "No validators available for this file type.")],
        }
    }

    fn validate_json(&self, path: &Path) -> Vec<ClipValidationEvent> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                return vec![event(path, ClipValidationSeverity::Error, format!("Failed to read clip: {err}"))];
            }
        };
        let key_hint = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("clip");
        match parse_clip_json_bytes(&bytes, key_hint, &self.resolver) {
            Ok(clip) => clip_events(path, &clip),
            Err(err) => vec![event(path, ClipValidationSeverity::Error, format!("{err:#}"))],
        }
    }

    fn validate_gltf(&self, path: &Path) -> Vec<ClipValidationEvent> {
        match load_clips_from_gltf(path, &self.resolver) {
            Ok(import) if import.clips.is_empty() => {
                vec![event(path, ClipValidationSeverity::Warning, "GLTF contains no usable animations.")]
            }
            Ok(import) => import.clips.iter().flat_map(|clip| clip_events(path, clip)).collect(),
            Err(err) => vec![event(path, ClipValidationSeverity::Error, format!("{err:#}"))],
        }
    }
}

fn clip_events(path: &Path, clip: &AnimationClip) -> Vec<ClipValidationEvent> {
    let mut events = Vec::new();
    for track in clip.tracks.iter().filter(|track| track.canonical.is_none()) {
        events.push(event(
            path,
            ClipValidationSeverity::Warning,
            format!("Clip '{}' track '{}' does not resolve to a humanoid bone; it will pass through.", clip.name, track.bone),
        ));
    }
    if clip.duration <= 0.0 {
        events.push(event(
            path,
            ClipValidationSeverity::Warning,
            "Clip duration is zero; ensure at least one keyframe has time > 0.",
        ));
    }
    if clip.up_axis.is_none() {
        let message = if clip_is_z_up(clip, AxisSourceHint::Auto) {
            format!("Clip '{}' declares no up axis; detected Z-up, will be converted.", clip.name)
        } else {
            format!("Clip '{}' declares no up axis and has no Z-up signature; treated as Y-up.", clip.name)
        };
        events.push(event(path, ClipValidationSeverity::Info, message));
    }
    let resolved = clip.tracks.iter().filter(|track| track.canonical.is_some()).count();
    events.push(event(
        path,
        ClipValidationSeverity::Info,
        format!(
            "Clip '{}' OK: duration {:.3}s, {} tracks ({} resolved)",
            clip.name,
            clip.duration,
            clip.tracks.len(),
            resolved
        ),
    ));
    events
}

fn event(path: &Path, severity: ClipValidationSeverity, message: impl Into<String>) -> ClipValidationEvent {
    ClipValidationEvent { severity, path: path.to_path_buf(), message: message.into() }
}
