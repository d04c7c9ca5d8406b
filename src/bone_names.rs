use crate::skeleton::HumanoidBone;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Source naming family a lookup table entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingFamily {
    Canonical,
    Mixamo,
    LandmarkSolver,
    Kawaii,
}

/// Result of a name lookup. Unknown names are carried through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBone<'a> {
    Known(HumanoidBone),
    Passthrough(&'a str),
}

impl<'a> ResolvedBone<'a> {
    pub fn bone(&self) -> Option<HumanoidBone> {
        match self {
            ResolvedBone::Known(bone) => Some(*bone),
            ResolvedBone::Passthrough(_) => None,
        }
    }

    pub fn as_str(&self) -> &'a str {
        match self {
            ResolvedBone::Known(bone) => bone.as_str(),
            ResolvedBone::Passthrough(name) => *name,
        }
    }
}

impl fmt::Display for ResolvedBone<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MIXAMO_PREFIX: &str = "mixamorig";

const MIXAMO_NAMES: &[(&str, HumanoidBone)] = &[
    ("Hips", HumanoidBone::Hips),
    ("Spine", HumanoidBone::Spine),
    ("Spine1", HumanoidBone::Chest),
    ("Spine2", HumanoidBone::UpperChest),
    ("Neck", HumanoidBone::Neck),
    ("Head", HumanoidBone::Head),
    ("LeftShoulder", HumanoidBone::LeftShoulder),
    ("LeftArm", HumanoidBone::LeftUpperArm),
    ("LeftForeArm", HumanoidBone::LeftLowerArm),
    ("LeftHand", HumanoidBone::LeftHand),
    ("LeftHandThumb1", HumanoidBone::LeftThumbMetacarpal),
    ("LeftHandThumb2", HumanoidBone::LeftThumbProximal),
    ("LeftHandThumb3", HumanoidBone::LeftThumbDistal),
    ("LeftHandIndex1", HumanoidBone::LeftIndexProximal),
    ("LeftHandIndex2", HumanoidBone::LeftIndexIntermediate),
    ("LeftHandIndex3", HumanoidBone::LeftIndexDistal),
    ("LeftHandMiddle1", HumanoidBone::LeftMiddleProximal),
    ("LeftHandMiddle2", HumanoidBone::LeftMiddleIntermediate),
    ("LeftHandMiddle3", HumanoidBone::LeftMiddleDistal),
    ("LeftHandRing1", HumanoidBone::LeftRingProximal),
    ("LeftHandRing2", HumanoidBone::LeftRingIntermediate),
    ("LeftHandRing3", HumanoidBone::LeftRingDistal),
    ("LeftHandPinky1", HumanoidBone::LeftLittleProximal),
    ("LeftHandPinky2", HumanoidBone::LeftLittleIntermediate),
    ("LeftHandPinky3", HumanoidBone::LeftLittleDistal),
    ("RightShoulder", HumanoidBone::RightShoulder),
    ("RightArm", HumanoidBone::RightUpperArm),
    ("RightForeArm", HumanoidBone::RightLowerArm),
    ("RightHand", HumanoidBone::RightHand),
    ("RightHandThumb1", HumanoidBone::RightThumbMetacarpal),
    ("RightHandThumb2", HumanoidBone::RightThumbProximal),
    ("RightHandThumb3", HumanoidBone::RightThumbDistal),
    ("RightHandIndex1", HumanoidBone::RightIndexProximal),
    ("RightHandIndex2", HumanoidBone::RightIndexIntermediate),
    ("RightHandIndex3", HumanoidBone::RightIndexDistal),
    ("RightHandMiddle1", HumanoidBone::RightMiddleProximal),
    ("RightHandMiddle2", HumanoidBone::RightMiddleIntermediate),
    ("RightHandMiddle3", HumanoidBone::RightMiddleDistal),
    ("RightHandRing1", HumanoidBone::RightRingProximal),
    ("RightHandRing2", HumanoidBone::RightRingIntermediate),
    ("RightHandRing3", HumanoidBone::RightRingDistal),
    ("RightHandPinky1", HumanoidBone::RightLittleProximal),
    ("RightHandPinky2", HumanoidBone::RightLittleIntermediate),
    ("RightHandPinky3", HumanoidBone::RightLittleDistal),
    ("LeftUpLeg", HumanoidBone::LeftUpperLeg),
    ("LeftLeg", HumanoidBone::LeftLowerLeg),
    ("LeftFoot", HumanoidBone::LeftFoot),
    ("LeftToeBase", HumanoidBone::LeftToes),
    ("RightUpLeg", HumanoidBone::RightUpperLeg),
    ("RightLeg", HumanoidBone::RightLowerLeg),
    ("RightFoot", HumanoidBone::RightFoot),
    ("RightToeBase", HumanoidBone::RightToes),
];

// Flat mixed-case names emitted by the landmark solver. Its thumb chain is
// shifted by one segment relative to the canonical set.
const SOLVER_NAMES: &[(&str, HumanoidBone)] = &[
    ("Hips", HumanoidBone::Hips),
    ("Spine", HumanoidBone::Spine),
    ("Chest", HumanoidBone::Chest),
    ("Neck", HumanoidBone::Neck),
    ("Head", HumanoidBone::Head),
    ("LeftShoulder", HumanoidBone::LeftShoulder),
    ("LeftUpperArm", HumanoidBone::LeftUpperArm),
    ("LeftLowerArm", HumanoidBone::LeftLowerArm),
    ("LeftHand", HumanoidBone::LeftHand),
    ("LeftWrist", HumanoidBone::LeftHand),
    ("RightShoulder", HumanoidBone::RightShoulder),
    ("RightUpperArm", HumanoidBone::RightUpperArm),
    ("RightLowerArm", HumanoidBone::RightLowerArm),
    ("RightHand", HumanoidBone::RightHand),
    ("RightWrist", HumanoidBone::RightHand),
    ("LeftUpperLeg", HumanoidBone::LeftUpperLeg),
    ("LeftLowerLeg", HumanoidBone::LeftLowerLeg),
    ("LeftFoot", HumanoidBone::LeftFoot),
    ("RightUpperLeg", HumanoidBone::RightUpperLeg),
    ("RightLowerLeg", HumanoidBone::RightLowerLeg),
    ("RightFoot", HumanoidBone::RightFoot),
    ("LeftThumbProximal", HumanoidBone::LeftThumbProximal),
    ("LeftThumbIntermediate", HumanoidBone::LeftThumbMetacarpal),
    ("LeftThumbDistal", HumanoidBone::LeftThumbDistal),
    ("LeftIndexProximal", HumanoidBone::LeftIndexProximal),
    ("LeftIndexIntermediate", HumanoidBone::LeftIndexIntermediate),
    ("LeftIndexDistal", HumanoidBone::LeftIndexDistal),
    ("LeftMiddleProximal", HumanoidBone::LeftMiddleProximal),
    ("LeftMiddleIntermediate", HumanoidBone::LeftMiddleIntermediate),
    ("LeftMiddleDistal", HumanoidBone::LeftMiddleDistal),
    ("LeftRingProximal", HumanoidBone::LeftRingProximal),
    ("LeftRingIntermediate", HumanoidBone::LeftRingIntermediate),
    ("LeftRingDistal", HumanoidBone::LeftRingDistal),
    ("LeftLittleProximal", HumanoidBone::LeftLittleProximal),
    ("LeftLittleIntermediate", HumanoidBone::LeftLittleIntermediate),
    ("LeftLittleDistal", HumanoidBone::LeftLittleDistal),
    ("RightThumbProximal", HumanoidBone::RightThumbProximal),
    ("RightThumbIntermediate", HumanoidBone::RightThumbMetacarpal),
    ("RightThumbDistal", HumanoidBone::RightThumbDistal),
    ("RightIndexProximal", HumanoidBone::RightIndexProximal),
    ("RightIndexIntermediate", HumanoidBone::RightIndexIntermediate),
    ("RightIndexDistal", HumanoidBone::RightIndexDistal),
    ("RightMiddleProximal", HumanoidBone::RightMiddleProximal),
    ("RightMiddleIntermediate", HumanoidBone::RightMiddleIntermediate),
    ("RightMiddleDistal", HumanoidBone::RightMiddleDistal),
    ("RightRingProximal", HumanoidBone::RightRingProximal),
    ("RightRingIntermediate", HumanoidBone::RightRingIntermediate),
    ("RightRingDistal", HumanoidBone::RightRingDistal),
    ("RightLittleProximal", HumanoidBone::RightLittleProximal),
    ("RightLittleIntermediate", HumanoidBone::RightLittleIntermediate),
    ("RightLittleDistal", HumanoidBone::RightLittleDistal),
];

// KAWAII has no metacarpal naming; its first thumb joint is the canonical metacarpal.
const KAWAII_NAMES: &[(&str, HumanoidBone)] = &[
    ("Upper_Chest", HumanoidBone::UpperChest),
    ("Shoulder_L", HumanoidBone::LeftShoulder),
    ("Upper_Arm_L", HumanoidBone::LeftUpperArm),
    ("Lower_Arm_L", HumanoidBone::LeftLowerArm),
    ("Hand_L", HumanoidBone::LeftHand),
    ("Shoulder_R", HumanoidBone::RightShoulder),
    ("Upper_Arm_R", HumanoidBone::RightUpperArm),
    ("Lower_Arm_R", HumanoidBone::RightLowerArm),
    ("Hand_R", HumanoidBone::RightHand),
    ("Upper_Leg_L", HumanoidBone::LeftUpperLeg),
    ("Lower_Leg_L", HumanoidBone::LeftLowerLeg),
    ("Foot_L", HumanoidBone::LeftFoot),
    ("Toes_L", HumanoidBone::LeftToes),
    ("Upper_Leg_R", HumanoidBone::RightUpperLeg),
    ("Lower_Leg_R", HumanoidBone::RightLowerLeg),
    ("Foot_R", HumanoidBone::RightFoot),
    ("Toes_R", HumanoidBone::RightToes),
    ("Thumb_Proximal_L", HumanoidBone::LeftThumbMetacarpal),
    ("Thumb_Intermediate_L", HumanoidBone::LeftThumbProximal),
    ("Thumb_Distal_L", HumanoidBone::LeftThumbDistal),
    ("Index_Proximal_L", HumanoidBone::LeftIndexProximal),
    ("Index_Intermediate_L", HumanoidBone::LeftIndexIntermediate),
    ("Index_Distal_L", HumanoidBone::LeftIndexDistal),
    ("Middle_Proximal_L", HumanoidBone::LeftMiddleProximal),
    ("Middle_Intermediate_L", HumanoidBone::LeftMiddleIntermediate),
    ("Middle_Distal_L", HumanoidBone::LeftMiddleDistal),
    ("Ring_Proximal_L", HumanoidBone::LeftRingProximal),
    ("Ring_Intermediate_L", HumanoidBone::LeftRingIntermediate),
    ("Ring_Distal_L", HumanoidBone::LeftRingDistal),
    ("Little_Proximal_L", HumanoidBone::LeftLittleProximal),
    ("Little_Intermediate_L", HumanoidBone::LeftLittleIntermediate),
    ("Little_Distal_L", HumanoidBone::LeftLittleDistal),
    ("Thumb_Proximal_R", HumanoidBone::RightThumbMetacarpal),
    ("Thumb_Intermediate_R", HumanoidBone::RightThumbProximal),
    ("Thumb_Distal_R", HumanoidBone::RightThumbDistal),
    ("Index_Proximal_R", HumanoidBone::RightIndexProximal),
    ("Index_Intermediate_R", HumanoidBone::RightIndexIntermediate),
    ("Index_Distal_R", HumanoidBone::RightIndexDistal),
    ("Middle_Proximal_R", HumanoidBone::RightMiddleProximal),
    ("Middle_Intermediate_R", HumanoidBone::RightMiddleIntermediate),
    ("Middle_Distal_R", HumanoidBone::RightMiddleDistal),
    ("Ring_Proximal_R", HumanoidBone::RightRingProximal),
    ("Ring_Intermediate_R", HumanoidBone::RightRingIntermediate),
    ("Ring_Distal_R", HumanoidBone::RightRingDistal),
    ("Little_Proximal_R", HumanoidBone::RightLittleProximal),
    ("Little_Intermediate_R", HumanoidBone::RightLittleIntermediate),
    ("Little_Distal_R", HumanoidBone::RightLittleDistal),
];

/// Table-driven mapping from every supported source naming family onto [`HumanoidBone`].
///
/// Construct once and share by reference; lookups are a single hash probe and
/// have no side effects.
#[derive(Debug, Clone)]
pub struct BoneNameResolver {
    table: HashMap<String, (HumanoidBone, NamingFamily)>,
}

impl Default for BoneNameResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BoneNameResolver {
    pub fn new() -> Self {
        let mut table = HashMap::new();
        // Later families never shadow earlier ones; the solver and KAWAII tables
        // share a few plain names ("Hips", "Spine") that agree anyway.
        for bone in HumanoidBone::ALL {
            table.insert(bone.as_str().to_string(), (*bone, NamingFamily::Canonical));
        }
        for (suffix, bone) in MIXAMO_NAMES {
            table.entry(format!("{MIXAMO_PREFIX}{suffix}")).or_insert((*bone, NamingFamily::Mixamo));
            table.entry(format!("{MIXAMO_PREFIX}:{suffix}")).or_insert((*bone, NamingFamily::Mixamo));
        }
        for (name, bone) in SOLVER_NAMES {
            table.entry((*name).to_string()).or_insert((*bone, NamingFamily::LandmarkSolver));
        }
        for (name, bone) in KAWAII_NAMES {
            table.entry((*name).to_string()).or_insert((*bone, NamingFamily::Kawaii));
        }
        Self { table }
    }

    /// Resolve a bone identifier. Unrecognised names come back unchanged.
    pub fn resolve<'a>(&self, name: &'a str) -> ResolvedBone<'a> {
        match self.table.get(name) {
            Some((bone, _)) => ResolvedBone::Known(*bone),
            None => ResolvedBone::Passthrough(name),
        }
    }

    pub fn resolve_bone(&self, name: &str) -> Option<HumanoidBone> {
        self.table.get(name).map(|(bone, _)| *bone)
    }

    pub fn family_of(&self, name: &str) -> Option<NamingFamily> {
        self.table.get(name).map(|(_, family)| *family)
    }

    /// Resolve the node part of a `node.property` track name and return the property alongside.
    pub fn resolve_track<'a>(&self, track_name: &'a str) -> (ResolvedBone<'a>, Option<&'a str>) {
        let (node, property) = split_track_name(track_name);
        (self.resolve(node), property)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

pub fn split_track_name(track_name: &str) -> (&str, Option<&str>) {
    match track_name.rsplit_once('.') {
        Some((node, property)) if !node.is_empty() => (node, Some(property)),
        _ => (track_name, None),
    }
}

/// Bones present on a loaded avatar, with the standard fallback chain for missing ones.
#[derive(Debug, Clone, Default)]
pub struct RigCapabilities {
    available: HashSet<HumanoidBone>,
}

impl RigCapabilities {
    pub fn full() -> Self {
        Self { available: HumanoidBone::ALL.iter().copied().collect() }
    }

    pub fn from_bones(bones: impl IntoIterator<Item = HumanoidBone>) -> Self {
        Self { available: bones.into_iter().collect() }
    }

    pub fn has(&self, bone: HumanoidBone) -> bool {
        self.available.contains(&bone)
    }

    pub fn has_finger_bones(&self) -> bool {
        self.available.iter().any(|bone| bone.group() == crate::skeleton::BoneGroup::Finger)
    }

    /// Bone that should receive a rotation aimed at `bone`, walking the fallback chain.
    pub fn target_for(&self, bone: HumanoidBone) -> Option<HumanoidBone> {
        if self.has(bone) {
            return Some(bone);
        }
        fallback_chain(bone).iter().copied().find(|candidate| self.has(*candidate))
    }
}

fn fallback_chain(bone: HumanoidBone) -> &'static [HumanoidBone] {
    match bone {
        HumanoidBone::Chest => &[HumanoidBone::Spine],
        HumanoidBone::UpperChest => &[HumanoidBone::Chest, HumanoidBone::Spine],
        HumanoidBone::LeftShoulder => &[HumanoidBone::LeftUpperArm],
        HumanoidBone::RightShoulder => &[HumanoidBone::RightUpperArm],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_names_split_on_last_dot() {
        assert_eq!(split_track_name("mixamorigHips.position"), ("mixamorigHips", Some("position")));
        assert_eq!(split_track_name("hips"), ("hips", None));
        assert_eq!(split_track_name(".quaternion"), (".quaternion", None));
    }

    #[test]
    fn fallback_prefers_nearest_available() {
        let caps = RigCapabilities::from_bones([HumanoidBone::Spine, HumanoidBone::LeftUpperArm]);
        assert_eq!(caps.target_for(HumanoidBone::UpperChest), Some(HumanoidBone::Spine));
        assert_eq!(caps.target_for(HumanoidBone::LeftShoulder), Some(HumanoidBone::LeftUpperArm));
        assert_eq!(caps.target_for(HumanoidBone::RightShoulder), None);
        assert!(!caps.has_finger_bones());
    }
}
