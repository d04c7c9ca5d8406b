//! Up-axis detection and Z-up → Y-up conversion for authored clips.
//!
//! The engine's canonical space is Y-up, right-handed, forward +Z. Z-up sources
//! (KAWAII/Unreal style rigs) keep their track data in Z-up even when the loader
//! compensates at the scene root with a -90° X rotation, so their tracks must be
//! rewritten before sampling. Y-up sources (Mixamo) pass through untouched.

use crate::clip::{AnimationClip, BoneTrack, ClipKeyframe, QuatTrack, Vec3Track};
use crate::skeleton::HumanoidBone;
use glam::{Quat, Vec3};
use serde::Deserialize;
use std::f32::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

/// Root rotation a loader applies to compensate Z-up authoring (-90° about X).
pub const Z_UP_ROOT_SIGNATURE: Quat = Quat::from_xyzw(-FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
const ROOT_SIGNATURE_TOLERANCE: f32 = 0.05;

/// +90° about X (maps Y to Z and Z to -Y); rotations are conjugated by it.
const Z_UP_TO_Y_UP: Quat = Quat::from_xyzw(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
const Z_UP_TO_Y_UP_INV: Quat = Quat::from_xyzw(-FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

/// Convention hint supplied alongside a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AxisSourceHint {
    /// Y-up authoring (Mixamo); never converted.
    YUp,
    /// Z-up authoring (KAWAII/Unreal); always converted.
    ZUp,
    /// Decide from the declared axis, the root signature, or the rest pose.
    #[default]
    Auto,
}

/// The component with the largest magnitude is "up". Without a strictly dominant
/// component (including the zero vector) the sample is ambiguous and reads as Y.
pub fn detect_position_up_axis(rest_position: Vec3) -> UpAxis {
    let abs = rest_position.abs();
    if abs.z > abs.x && abs.z > abs.y {
        UpAxis::Z
    } else if abs.x > abs.y && abs.x > abs.z {
        UpAxis::X
    } else {
        UpAxis::Y
    }
}

/// Whether a root rotation matches the corrective rotation loaders apply to Z-up files.
pub fn is_z_up_root_signature(root_rotation: Quat) -> bool {
    (root_rotation.x - Z_UP_ROOT_SIGNATURE.x).abs() < ROOT_SIGNATURE_TOLERANCE
        && (root_rotation.w - Z_UP_ROOT_SIGNATURE.w).abs() < ROOT_SIGNATURE_TOLERANCE
}

/// (x, y, z) → (x, z, -y). Exact; involves no arithmetic beyond a sign flip.
#[inline]
pub fn position_z_up_to_y_up(position: Vec3) -> Vec3 {
    Vec3::new(position.x, position.z, -position.y)
}

/// (x, y, z) → (x, -z, y); inverse of [`position_z_up_to_y_up`].
#[inline]
pub fn position_y_up_to_z_up(position: Vec3) -> Vec3 {
    Vec3::new(position.x, -position.z, position.y)
}

/// q' = R · q · R⁻¹ with R = +90° about X.
#[inline]
pub fn quat_z_up_to_y_up(rotation: Quat) -> Quat {
    Z_UP_TO_Y_UP * rotation * Z_UP_TO_Y_UP_INV
}

/// q' = R⁻¹ · q · R; inverse of [`quat_z_up_to_y_up`].
#[inline]
pub fn quat_y_up_to_z_up(rotation: Quat) -> Quat {
    Z_UP_TO_Y_UP_INV * rotation * Z_UP_TO_Y_UP
}

/// Per-component sign corrections for Z-up sources, in quaternion xyzw order.
pub fn kawaii_sign_flip(bone: HumanoidBone) -> Option<[f32; 4]> {
    use HumanoidBone::*;
    match bone {
        LeftShoulder | LeftUpperArm | LeftLowerArm | LeftHand => Some([-1.0, 1.0, -1.0, 1.0]),
        RightShoulder | RightUpperArm | RightLowerArm | RightHand => Some([1.0, -1.0, 1.0, 1.0]),
        LeftUpperLeg => Some([-1.0, -1.0, 1.0, 1.0]),
        RightUpperLeg => Some([-1.0, -1.0, -1.0, 1.0]),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub hint: AxisSourceHint,
    /// Apply [`kawaii_sign_flip`] to tracks whose bone resolves canonically.
    pub apply_sign_flips: bool,
}

/// Decide whether a clip needs Z-up conversion. Ambiguity means "no conversion".
pub fn clip_is_z_up(clip: &AnimationClip, hint: AxisSourceHint) -> bool {
    match hint {
        // A clip already declared Y-up has been normalised once; never apply twice.
        AxisSourceHint::ZUp => clip.up_axis != Some(UpAxis::Y),
        AxisSourceHint::YUp => false,
        AxisSourceHint::Auto => match clip.up_axis {
            Some(axis) => axis == UpAxis::Z,
            None => {
                if let Some(root) = clip.root_rotation {
                    return is_z_up_root_signature(root);
                }
                clip.rest_position().map(detect_position_up_axis) == Some(UpAxis::Z)
            }
        },
    }
}

/// Produce a Y-up copy of `clip`. The input is never mutated, and a clip already
/// declared Y-up comes back as a plain copy whatever the hint says.
pub fn normalize_clip(clip: &AnimationClip, options: NormalizeOptions) -> AnimationClip {
    if !clip_is_z_up(clip, options.hint) {
        if clip.up_axis == Some(UpAxis::X) {
            log::warn!(
                target: "motion::axis",
                "clip '{}' reports X-up; no conversion available, treating as Y-up",
                clip.name
            );
        } else if clip.up_axis.is_none() && clip.root_rotation.is_none() {
            log::debug!(target: "motion::axis", "clip '{}' has no axis signature; assuming Y-up", clip.name);
        }
        let mut copy = clip.clone();
        copy.up_axis = Some(UpAxis::Y);
        copy.root_rotation = None;
        return copy;
    }

    let tracks: Vec<BoneTrack> = clip
        .tracks
        .iter()
        .map(|track| {
            let flip = if options.apply_sign_flips { track.canonical.and_then(kawaii_sign_flip) } else { None };
            BoneTrack {
                bone: Arc::clone(&track.bone),
                canonical: track.canonical,
                translation: track.translation.as_ref().map(|t| map_vec3_track(t, position_z_up_to_y_up)),
                rotation: track.rotation.as_ref().map(|t| {
                    map_quat_track(t, |q| {
                        let converted = quat_z_up_to_y_up(q);
                        match flip {
                            Some(signs) => apply_sign_flip(converted, signs),
                            None => converted,
                        }
                    })
                }),
            }
        })
        .collect();

    AnimationClip {
        name: Arc::clone(&clip.name),
        duration: clip.duration,
        looped: clip.looped,
        up_axis: Some(UpAxis::Y),
        root_rotation: None,
        tracks: Arc::from(tracks.into_boxed_slice()),
    }
}

fn apply_sign_flip(rotation: Quat, signs: [f32; 4]) -> Quat {
    Quat::from_xyzw(rotation.x * signs[0], rotation.y * signs[1], rotation.z * signs[2], rotation.w * signs[3])
}

fn map_vec3_track(track: &Vec3Track, f: impl Fn(Vec3) -> Vec3) -> Vec3Track {
    let keyframes: Vec<ClipKeyframe<Vec3>> =
        track.keyframes.iter().map(|kf| ClipKeyframe { time: kf.time, value: f(kf.value) }).collect();
    Vec3Track { interpolation: track.interpolation, keyframes: Arc::from(keyframes.into_boxed_slice()) }
}

fn map_quat_track(track: &QuatTrack, f: impl Fn(Quat) -> Quat) -> QuatTrack {
    let keyframes: Vec<ClipKeyframe<Quat>> =
        track.keyframes.iter().map(|kf| ClipKeyframe { time: kf.time, value: f(kf.value) }).collect();
    QuatTrack { interpolation: track.interpolation, keyframes: Arc::from(keyframes.into_boxed_slice()) }
}
