use super::{
    build_keyframes, AnimationClip, BoneTrack, ClipInterpolation, ClipKeyframe, QuatTrack, RestRotation, Vec3Track,
};
use crate::bone_names::BoneNameResolver;
use crate::skeleton::HumanoidBone;
use anyhow::{anyhow, Context, Result};
use glam::{Quat, Vec3};
use gltf::animation::util::{ReadOutputs, Rotations};
use gltf::animation::{Interpolation, Property};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Everything a glTF file contributes to retargeting: its clips plus the rest pose they were authored against.
#[derive(Debug, Clone)]
pub struct GltfClipImport {
    pub clips: Vec<AnimationClip>,
    /// Rest-pose world rotations keyed by node name.
    pub rest: HashMap<String, RestRotation>,
    /// Rest translation of the node that resolves to hips, if any.
    pub hips_rest_translation: Option<Vec3>,
    /// Rotation of the first scene root; Z-up exports carry a -90° X correction here.
    pub root_rotation: Option<Quat>,
}

pub fn load_clips_from_gltf(path: impl AsRef<Path>, resolver: &BoneNameResolver) -> Result<GltfClipImport> {
    let path_ref = path.as_ref();
    let (document, buffers, _) = gltf::import(path_ref)
        .with_context(|| format!("Failed to import GLTF animation from {}", path_ref.display()))?;

    let node_names: HashMap<usize, String> = document
        .nodes()
        .map(|node| {
            let name = node.name().map(str::to_string).unwrap_or_else(|| format!("node_{}", node.index()));
            (node.index(), name)
        })
        .collect();

    let mut local_rotation: HashMap<usize, Quat> = HashMap::new();
    let mut local_translation: HashMap<usize, Vec3> = HashMap::new();
    let mut parent_of_node: HashMap<usize, usize> = HashMap::new();
    for node in document.nodes() {
        let (t, r, _) = node.transform().decomposed();
        local_translation.insert(node.index(), Vec3::from_array(t));
        local_rotation.insert(node.index(), normalized_or_identity(Quat::from_xyzw(r[0], r[1], r[2], r[3])));
        for child in node.children() {
            parent_of_node.insert(child.index(), node.index());
        }
    }

    let scene = document.default_scene().or_else(|| document.scenes().next());
    let root_index = scene.and_then(|scene| scene.nodes().next()).map(|root| root.index());
    let root_rotation = root_index
        .and_then(|index| local_rotation.get(&index).copied())
        .filter(|rotation| !rotation.abs_diff_eq(Quat::IDENTITY, 1e-4));
    // Rest rotations are measured below the scene-root correction; axis
    // normalisation owns that conversion.
    if let (Some(index), Some(_)) = (root_index, root_rotation) {
        local_rotation.insert(index, Quat::IDENTITY);
    }

    let mut world_cache: HashMap<usize, Quat> = HashMap::new();
    let mut rest = HashMap::new();
    let mut hips_rest_translation = None;
    for (index, name) in &node_names {
        let world = compute_world_rotation(*index, &local_rotation, &parent_of_node, &mut world_cache);
        let parent_world = parent_of_node
            .get(index)
            .map(|parent| compute_world_rotation(*parent, &local_rotation, &parent_of_node, &mut world_cache))
            .unwrap_or(Quat::IDENTITY);
        rest.insert(name.clone(), RestRotation { world, parent_world });
        if resolver.resolve_bone(name) == Some(HumanoidBone::Hips) {
            hips_rest_translation = local_translation.get(index).copied();
        }
    }

    let fallback_stem = path_ref.file_stem().and_then(|stem| stem.to_str()).unwrap_or("animation");
    let mut clips = Vec::new();
    for (anim_index, animation) in document.animations().enumerate() {
        let clip_name: Arc<str> = animation
            .name()
            .map(|n| Arc::<str>::from(n.to_string()))
            .unwrap_or_else(|| Arc::<str>::from(format!("{fallback_stem}_{anim_index}")));

        let mut builders: BTreeMap<String, TrackBuilder> = BTreeMap::new();
        for channel in animation.channels() {
            let target_node = channel.target().node();
            let Some(bone_name) = node_names.get(&target_node.index()) else {
                continue;
            };

            let interpolation = match channel.sampler().interpolation() {
                Interpolation::Linear => ClipInterpolation::Linear,
                Interpolation::Step => ClipInterpolation::Step,
                Interpolation::CubicSpline => {
                    log::warn!(
                        target: "motion::clips",
                        "animation '{}' uses CubicSpline interpolation; skipping channel on '{}'",
                        clip_name,
                        bone_name
                    );
                    continue;
                }
            };

            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();
            if times.is_empty() {
                continue;
            }
            let Some(outputs) = reader.read_outputs() else {
                continue;
            };

            let builder = builders.entry(bone_name.clone()).or_default();
            match (channel.target().property(), outputs) {
                (Property::Translation, ReadOutputs::Translations(values)) => {
                    let values: Vec<Vec3> = values.map(Vec3::from_array).collect();
                    if values.len() != times.len() {
                        return Err(anyhow!(
                            "Animation '{}' translation channel count mismatch on '{}'",
                            clip_name,
                            bone_name
                        ));
                    }
                    let (keyframes, _) = paired_keyframes(&times, values)?;
                    builder.translation = Some(Vec3Track { interpolation, keyframes });
                }
                (Property::Rotation, ReadOutputs::Rotations(rotations)) => {
                    let values = convert_rotations(rotations);
                    if values.len() != times.len() {
                        return Err(anyhow!(
                            "Animation '{}' rotation channel count mismatch on '{}'",
                            clip_name,
                            bone_name
                        ));
                    }
                    let (keyframes, _) = paired_keyframes(&times, values)?;
                    builder.rotation = Some(QuatTrack { interpolation, keyframes });
                }
                _ => {}
            }
        }

        let mut duration = 0.0_f32;
        let mut tracks = Vec::new();
        for (bone, builder) in builders {
            if builder.translation.is_none() && builder.rotation.is_none() {
                continue;
            }
            if let Some(track) = &builder.translation {
                duration = duration.max(track.keyframes.last().map(|kf| kf.time).unwrap_or(0.0));
            }
            if let Some(track) = &builder.rotation {
                duration = duration.max(track.keyframes.last().map(|kf| kf.time).unwrap_or(0.0));
            }
            let canonical = resolver.resolve_bone(&bone);
            tracks.push(BoneTrack {
                bone: Arc::from(bone),
                canonical,
                translation: builder.translation,
                rotation: builder.rotation,
            });
        }
        if tracks.is_empty() {
            log::warn!(target: "motion::clips", "animation '{}' has no usable channels; skipped", clip_name);
            continue;
        }

        clips.push(AnimationClip {
            name: clip_name,
            duration,
            looped: true,
            up_axis: None,
            root_rotation,
            tracks: Arc::from(tracks.into_boxed_slice()),
        });
    }

    Ok(GltfClipImport { clips, rest, hips_rest_translation, root_rotation })
}

#[derive(Default)]
struct TrackBuilder {
    translation: Option<Vec3Track>,
    rotation: Option<QuatTrack>,
}

fn paired_keyframes<T: Clone>(times: &[f32], values: Vec<T>) -> Result<(Arc<[ClipKeyframe<T>]>, f32)> {
    let pairs: Vec<(f32, T)> = times.iter().copied().zip(values).collect();
    build_keyframes(pairs, |(time, value)| Ok(ClipKeyframe { time, value }))
}

fn convert_rotations(rotations: Rotations) -> Vec<Quat> {
    rotations
        .into_f32()
        .map(|c| normalized_or_identity(Quat::from_xyzw(c[0], c[1], c[2], c[3])))
        .collect()
}

fn normalized_or_identity(quat: Quat) -> Quat {
    if quat.is_finite() && quat.length_squared() > 0.0 {
        quat.normalize()
    } else {
        Quat::IDENTITY
    }
}

fn compute_world_rotation(
    node_index: usize,
    local: &HashMap<usize, Quat>,
    parent_map: &HashMap<usize, usize>,
    cache: &mut HashMap<usize, Quat>,
) -> Quat {
    if let Some(world) = cache.get(&node_index) {
        return *world;
    }
    let own = local.get(&node_index).copied().unwrap_or(Quat::IDENTITY);
    let world = match parent_map.get(&node_index) {
        Some(parent) => (compute_world_rotation(*parent, local, parent_map, cache) * own).normalize(),
        None => own,
    };
    cache.insert(node_index, world);
    world
}
