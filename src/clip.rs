use crate::axis::UpAxis;
use crate::bone_names::BoneNameResolver;
use crate::skeleton::HumanoidBone;
use anyhow::{anyhow, bail, Context, Result};
use glam::{Quat, Vec3};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub mod gltf_import;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipKeyframe<T> {
    pub time: f32,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipInterpolation {
    Step,
    Linear,
}

#[derive(Debug, Clone)]
pub struct Vec3Track {
    pub interpolation: ClipInterpolation,
    pub keyframes: Arc<[ClipKeyframe<Vec3>]>,
}

#[derive(Debug, Clone)]
pub struct QuatTrack {
    pub interpolation: ClipInterpolation,
    pub keyframes: Arc<[ClipKeyframe<Quat>]>,
}

#[derive(Debug, Clone)]
pub struct BoneTrack {
    /// Bone identifier as authored (or canonical after retargeting).
    pub bone: Arc<str>,
    pub canonical: Option<HumanoidBone>,
    pub translation: Option<Vec3Track>,
    pub rotation: Option<QuatTrack>,
}

/// A parsed clip. Immutable once built; shared as `Arc<AnimationClip>`.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: Arc<str>,
    pub duration: f32,
    pub looped: bool,
    /// Declared convention; `None` when the source did not say.
    pub up_axis: Option<UpAxis>,
    /// Root transform rotation the source loader applied, if any.
    pub root_rotation: Option<Quat>,
    pub tracks: Arc<[BoneTrack]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BonePose {
    pub bone: Arc<str>,
    pub canonical: Option<HumanoidBone>,
    pub translation: Option<Vec3>,
    pub rotation: Option<Quat>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipPose {
    pub time: f32,
    pub bones: Vec<BonePose>,
}

impl ClipPose {
    pub fn rotation(&self, bone: HumanoidBone) -> Option<Quat> {
        self.bones.iter().find(|pose| pose.canonical == Some(bone)).and_then(|pose| pose.rotation)
    }

    pub fn translation(&self, bone: HumanoidBone) -> Option<Vec3> {
        self.bones.iter().find(|pose| pose.canonical == Some(bone)).and_then(|pose| pose.translation)
    }
}

impl Vec3Track {
    pub fn sample(&self, time: f32) -> Option<Vec3> {
        sample_keyframes(&self.keyframes, self.interpolation, time, |a, b, t| a.lerp(b, t))
    }
}

impl QuatTrack {
    pub fn sample(&self, time: f32) -> Option<Quat> {
        sample_keyframes(&self.keyframes, self.interpolation, time, |a, b, t| a.slerp(b, t).normalize())
    }
}

fn sample_keyframes<T: Copy>(
    frames: &[ClipKeyframe<T>],
    interpolation: ClipInterpolation,
    time: f32,
    blend: impl Fn(T, T, f32) -> T,
) -> Option<T> {
    let first = frames.first()?;
    if frames.len() == 1 || time <= first.time {
        return Some(first.value);
    }
    let next = frames.partition_point(|kf| kf.time <= time);
    if next >= frames.len() {
        return frames.last().map(|kf| kf.value);
    }
    let start = &frames[next - 1];
    let end = &frames[next];
    match interpolation {
        ClipInterpolation::Step => Some(start.value),
        ClipInterpolation::Linear => {
            let span = (end.time - start.time).max(f32::EPSILON);
            let t = ((time - start.time) / span).clamp(0.0, 1.0);
            Some(blend(start.value, end.value, t))
        }
    }
}

impl AnimationClip {
    pub fn track(&self, bone: HumanoidBone) -> Option<&BoneTrack> {
        self.tracks.iter().find(|track| track.canonical == Some(bone))
    }

    pub fn track_named(&self, name: &str) -> Option<&BoneTrack> {
        self.tracks.iter().find(|track| track.bone.as_ref() == name)
    }

    /// First translation sample of the hips, or of any track when there is no hips track.
    pub fn rest_position(&self) -> Option<Vec3> {
        let hips = self.track(HumanoidBone::Hips).and_then(|track| track.translation.as_ref());
        let any = || self.tracks.iter().find_map(|track| track.translation.as_ref());
        hips.or_else(any).and_then(|track| track.keyframes.first()).map(|kf| kf.value)
    }

    /// Map a playback time onto clip-local time (wrapping when looped, clamping otherwise).
    pub fn local_time(&self, time: f32) -> f32 {
        if self.duration <= 0.0 || !time.is_finite() {
            return 0.0;
        }
        if self.looped {
            time.rem_euclid(self.duration.max(f32::EPSILON))
        } else {
            time.clamp(0.0, self.duration)
        }
    }

    pub fn sample(&self, time: f32) -> ClipPose {
        let local = self.local_time(time);
        let bones = self
            .tracks
            .iter()
            .map(|track| BonePose {
                bone: Arc::clone(&track.bone),
                canonical: track.canonical,
                translation: track.translation.as_ref().and_then(|t| t.sample(local)),
                rotation: track.rotation.as_ref().and_then(|t| t.sample(local)),
            })
            .collect();
        ClipPose { time: local, bones }
    }
}

#[derive(Debug, Deserialize)]
struct ClipFile {
    version: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_clip_loop")]
    looped: bool,
    #[serde(default)]
    up_axis: Option<UpAxis>,
    #[serde(default)]
    root_rotation: Option<[f32; 4]>,
    #[serde(default)]
    tracks: BTreeMap<String, BoneTrackFile>,
}

#[derive(Debug, Default, Deserialize)]
struct BoneTrackFile {
    #[serde(default)]
    translation: Option<Vec3TrackFile>,
    #[serde(default)]
    rotation: Option<QuatTrackFile>,
}

#[derive(Debug, Deserialize)]
struct Vec3TrackFile {
    #[serde(default = "default_clip_interpolation")]
    interpolation: ClipInterpolationFile,
    keyframes: Vec<Vec3KeyframeFile>,
}

#[derive(Debug, Deserialize)]
struct QuatTrackFile {
    #[serde(default = "default_clip_interpolation")]
    interpolation: ClipInterpolationFile,
    keyframes: Vec<QuatKeyframeFile>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ClipInterpolationFile {
    Linear,
    Step,
}

#[derive(Debug, Deserialize)]
struct Vec3KeyframeFile {
    time: f32,
    value: [f32; 3],
}

#[derive(Debug, Deserialize)]
struct QuatKeyframeFile {
    time: f32,
    value: [f32; 4],
}

const fn default_clip_loop() -> bool {
    true
}

fn default_clip_interpolation() -> ClipInterpolationFile {
    ClipInterpolationFile::Linear
}

fn convert_interpolation(file: ClipInterpolationFile) -> ClipInterpolation {
    match file {
        ClipInterpolationFile::Linear => ClipInterpolation::Linear,
        ClipInterpolationFile::Step => ClipInterpolation::Step,
    }
}

pub fn load_clip_json(path: impl AsRef<Path>, resolver: &BoneNameResolver) -> Result<AnimationClip> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read clip file {}", path.display()))?;
    let fallback_name = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("clip");
    parse_clip_json_bytes(&bytes, fallback_name, resolver)
        .with_context(|| format!("Failed to parse clip file {}", path.display()))
}

pub fn parse_clip_json_bytes(
    bytes: &[u8],
    fallback_name: &str,
    resolver: &BoneNameResolver,
) -> Result<AnimationClip> {
    let clip_file: ClipFile = serde_json::from_slice(bytes)?;
    if clip_file.version == 0 {
        bail!("Clip '{fallback_name}' has unsupported version 0 (expected >= 1)");
    }
    if clip_file.tracks.is_empty() {
        bail!("Clip '{fallback_name}' contains no tracks");
    }
    let root_rotation = match clip_file.root_rotation {
        Some([x, y, z, w]) => {
            let quat = Quat::from_xyzw(x, y, z, w);
            if !quat.is_finite() || quat.length_squared() <= f32::EPSILON {
                bail!("Clip '{fallback_name}' root rotation must be a finite non-zero quaternion");
            }
            Some(quat.normalize())
        }
        None => None,
    };

    let mut duration = 0.0_f32;
    let mut tracks = Vec::with_capacity(clip_file.tracks.len());
    for (bone, raw) in clip_file.tracks {
        let translation = match raw.translation {
            Some(track) => {
                let (parsed, track_duration) = build_vec3_track(track)
                    .with_context(|| format!("Invalid translation track for '{bone}'"))?;
                duration = duration.max(track_duration);
                Some(parsed)
            }
            None => None,
        };
        let rotation = match raw.rotation {
            Some(track) => {
                let (parsed, track_duration) = build_quat_track(track)
                    .with_context(|| format!("Invalid rotation track for '{bone}'"))?;
                duration = duration.max(track_duration);
                Some(parsed)
            }
            None => None,
        };
        if translation.is_none() && rotation.is_none() {
            continue;
        }
        let canonical = resolver.resolve_bone(&bone);
        tracks.push(BoneTrack { bone: Arc::from(bone), canonical, translation, rotation });
    }
    if tracks.is_empty() {
        bail!("Clip '{fallback_name}' contains no keyframed tracks");
    }

    let name = clip_file.name.unwrap_or_else(|| fallback_name.to_string());
    Ok(AnimationClip {
        name: Arc::from(name),
        duration,
        looped: clip_file.looped,
        up_axis: clip_file.up_axis,
        root_rotation,
        tracks: Arc::from(tracks.into_boxed_slice()),
    })
}

fn build_vec3_track(raw: Vec3TrackFile) -> Result<(Vec3Track, f32)> {
    if raw.keyframes.is_empty() {
        return Err(anyhow!("Clip vec3 track must contain at least one keyframe"));
    }
    let interpolation = convert_interpolation(raw.interpolation);
    let (keyframes, duration) = build_keyframes(raw.keyframes, |kf| {
        let value = Vec3::from_array(kf.value);
        if !value.is_finite() {
            return Err(anyhow!("Clip keyframe contains non-finite translation value"));
        }
        Ok(ClipKeyframe { time: kf.time, value })
    })?;
    Ok((Vec3Track { interpolation, keyframes }, duration))
}

fn build_quat_track(raw: QuatTrackFile) -> Result<(QuatTrack, f32)> {
    if raw.keyframes.is_empty() {
        return Err(anyhow!("Clip rotation track must contain at least one keyframe"));
    }
    let interpolation = convert_interpolation(raw.interpolation);
    let (keyframes, duration) = build_keyframes(raw.keyframes, |kf| {
        let [x, y, z, w] = kf.value;
        let value = Quat::from_xyzw(x, y, z, w);
        if !value.is_finite() {
            return Err(anyhow!("Clip keyframe contains non-finite rotation value"));
        }
        let value = if value.length_squared() > 0.0 { value.normalize() } else { Quat::IDENTITY };
        Ok(ClipKeyframe { time: kf.time, value })
    })?;
    Ok((QuatTrack { interpolation, keyframes }, duration))
}

/// Sort by time (stable on ties), reject bad times, and keep the last of any coincident keyframes.
pub(crate) fn build_keyframes<T, F, R>(raw_frames: Vec<R>, mut convert: F) -> Result<(Arc<[ClipKeyframe<T>]>, f32)>
where
    T: Clone,
    F: FnMut(R) -> Result<ClipKeyframe<T>>,
{
    let mut frames: Vec<(usize, ClipKeyframe<T>)> = Vec::new();
    for (index, raw) in raw_frames.into_iter().enumerate() {
        let frame = convert(raw)?;
        if !frame.time.is_finite() {
            return Err(anyhow!("Clip keyframe time must be finite"));
        }
        if frame.time < 0.0 {
            return Err(anyhow!("Clip keyframe time cannot be negative"));
        }
        frames.push((index, frame));
    }
    frames.sort_by(|a, b| {
        let time_order = a.1.time.partial_cmp(&b.1.time).unwrap_or(Ordering::Equal);
        if time_order == Ordering::Equal {
            a.0.cmp(&b.0)
        } else {
            time_order
        }
    });
    let mut deduped: Vec<ClipKeyframe<T>> = Vec::with_capacity(frames.len());
    for (_, frame) in frames {
        if let Some(last) = deduped.last_mut() {
            if (frame.time - last.time).abs() <= f32::EPSILON {
                *last = frame;
                continue;
            }
        }
        deduped.push(frame);
    }
    let duration = deduped.last().map(|kf| kf.time).unwrap_or(0.0);
    Ok((Arc::from(deduped.into_boxed_slice()), duration))
}

/// Rest-pose world rotations of a source rig bone and its parent.
#[derive(Debug, Clone, Copy)]
pub struct RestRotation {
    pub world: Quat,
    pub parent_world: Quat,
}

#[derive(Debug, Clone)]
pub struct RetargetOptions {
    /// Rest rotations of the source rig keyed by source bone name.
    pub rest: HashMap<String, RestRotation>,
    /// Target hips height divided by source hips height.
    pub hips_height_scale: f32,
}

impl Default for RetargetOptions {
    fn default() -> Self {
        Self { rest: HashMap::new(), hips_height_scale: 1.0 }
    }
}

impl RetargetOptions {
    pub fn with_hips_heights(mut self, source: f32, target: f32) -> Self {
        self.hips_height_scale = if source > 0.0 && target.is_finite() && target > 0.0 { target / source } else { 1.0 };
        self
    }
}

/// Rename tracks onto canonical bones and bake the source rest pose into the rotations.
///
/// Tracks whose names do not resolve keep their authored names so partial rigs
/// still animate whatever is recognised downstream.
pub fn retarget_clip(clip: &AnimationClip, options: &RetargetOptions) -> AnimationClip {
    let tracks: Vec<BoneTrack> = clip
        .tracks
        .iter()
        .map(|track| {
            let rest = options.rest.get(track.bone.as_ref()).copied();
            let rotation = track.rotation.as_ref().map(|source| {
                let keyframes: Vec<ClipKeyframe<Quat>> = source
                    .keyframes
                    .iter()
                    .map(|kf| {
                        let value = match rest {
                            Some(rest) => (rest.parent_world * kf.value * rest.world.inverse()).normalize(),
                            None => kf.value,
                        };
                        ClipKeyframe { time: kf.time, value }
                    })
                    .collect();
                QuatTrack { interpolation: source.interpolation, keyframes: Arc::from(keyframes.into_boxed_slice()) }
            });
            let translation = track.translation.as_ref().map(|source| {
                let keyframes: Vec<ClipKeyframe<Vec3>> = source
                    .keyframes
                    .iter()
                    .map(|kf| ClipKeyframe { time: kf.time, value: kf.value * options.hips_height_scale })
                    .collect();
                Vec3Track { interpolation: source.interpolation, keyframes: Arc::from(keyframes.into_boxed_slice()) }
            });
            let bone = match track.canonical {
                Some(bone) => Arc::from(bone.as_str()),
                None => Arc::clone(&track.bone),
            };
            BoneTrack { bone, canonical: track.canonical, translation, rotation }
        })
        .collect();

    AnimationClip {
        name: Arc::clone(&clip.name),
        duration: clip.duration,
        looped: clip.looped,
        up_axis: clip.up_axis,
        root_rotation: clip.root_rotation,
        tracks: Arc::from(tracks.into_boxed_slice()),
    }
}

/// Mirror a Y-up clip into the VRM 0.x convention (forward -Z): a half turn about
/// Y, which negates x and z of every position and rotation axis. Only valid once
/// the clip is in Y-up space.
pub fn mirror_vrm0(clip: &AnimationClip) -> AnimationClip {
    let tracks: Vec<BoneTrack> = clip
        .tracks
        .iter()
        .map(|track| {
            let rotation = track.rotation.as_ref().map(|source| {
                let keyframes: Vec<ClipKeyframe<Quat>> = source
                    .keyframes
                    .iter()
                    .map(|kf| {
                        let q = kf.value;
                        ClipKeyframe { time: kf.time, value: Quat::from_xyzw(-q.x, q.y, -q.z, q.w) }
                    })
                    .collect();
                QuatTrack { interpolation: source.interpolation, keyframes: Arc::from(keyframes.into_boxed_slice()) }
            });
            let translation = track.translation.as_ref().map(|source| {
                let keyframes: Vec<ClipKeyframe<Vec3>> = source
                    .keyframes
                    .iter()
                    .map(|kf| ClipKeyframe { time: kf.time, value: Vec3::new(-kf.value.x, kf.value.y, -kf.value.z) })
                    .collect();
                Vec3Track { interpolation: source.interpolation, keyframes: Arc::from(keyframes.into_boxed_slice()) }
            });
            BoneTrack { bone: Arc::clone(&track.bone), canonical: track.canonical, translation, rotation }
        })
        .collect();

    AnimationClip { tracks: Arc::from(tracks.into_boxed_slice()), ..clip.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_track_clip(frames: &[(f32, Quat)], looped: bool) -> AnimationClip {
        let keyframes: Vec<ClipKeyframe<Quat>> =
            frames.iter().map(|(time, value)| ClipKeyframe { time: *time, value: *value }).collect();
        AnimationClip {
            name: Arc::from("test"),
            duration: frames.last().map(|(t, _)| *t).unwrap_or(0.0),
            looped,
            up_axis: Some(UpAxis::Y),
            root_rotation: None,
            tracks: Arc::from(vec![BoneTrack {
                bone: Arc::from("spine"),
                canonical: Some(HumanoidBone::Spine),
                translation: None,
                rotation: Some(QuatTrack {
                    interpolation: ClipInterpolation::Linear,
                    keyframes: Arc::from(keyframes.into_boxed_slice()),
                }),
            }]),
        }
    }

    #[test]
    fn linear_rotation_sampling_hits_midpoint() {
        let end = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let clip = single_track_clip(&[(0.0, Quat::IDENTITY), (1.0, end)], false);
        let mid = clip.sample(0.5).rotation(HumanoidBone::Spine).expect("spine rotation");
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(mid.dot(expected).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn looped_clips_wrap_and_oneshots_clamp() {
        let clip = single_track_clip(&[(0.0, Quat::IDENTITY), (2.0, Quat::IDENTITY)], true);
        assert!((clip.local_time(5.0) - 1.0).abs() < 1e-6);
        let once = single_track_clip(&[(0.0, Quat::IDENTITY), (2.0, Quat::IDENTITY)], false);
        assert_eq!(once.local_time(5.0), 2.0);
        assert_eq!(once.local_time(f32::NAN), 0.0);
    }

    #[test]
    fn vrm0_mirror_is_a_half_turn_about_y() {
        let authored = Quat::from_rotation_x(0.4) * Quat::from_rotation_z(0.3);
        let clip = single_track_clip(&[(0.0, authored)], false);
        let mirrored = mirror_vrm0(&clip);
        let got = mirrored.sample(0.0).rotation(HumanoidBone::Spine).expect("spine rotation");
        let half_turn = Quat::from_rotation_y(std::f32::consts::PI);
        let expected = half_turn * authored * half_turn.inverse();
        assert!(got.dot(expected).abs() > 1.0 - 1e-5);
        assert_eq!(mirrored.up_axis, Some(UpAxis::Y));
        assert_eq!(mirrored.duration, clip.duration);
    }

    #[test]
    fn coincident_keyframes_keep_the_last() {
        let raw = vec![(0.5_f32, 1.0_f32), (0.0, 0.0), (0.5, 2.0)];
        let (frames, duration) =
            build_keyframes(raw, |(time, value)| Ok(ClipKeyframe { time, value })).expect("keyframes");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].value, 2.0);
        assert_eq!(duration, 0.5);
    }
}
