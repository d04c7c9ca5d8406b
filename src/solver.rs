//! Landmark positions to per-bone local rotations.
//!
//! Each segment's rotation is the arc from +Y to the direction between two
//! landmarks, read back as XYZ Euler angles, scaled by a per-category gain,
//! mirrored for the left side, and clamped against [`JointLimitTable`]. A limb
//! whose landmarks are missing, non-finite or below the visibility threshold
//! keeps whatever it produced last.

use crate::landmarks::{hand, pose, Landmark, LandmarkFrame};
use crate::limits::{JointCategory, JointLimitTable};
use crate::skeleton::{Finger, HumanoidBone, Side};
use glam::{EulerRot, Quat, Vec3};
use std::collections::BTreeMap;
use std::f32::consts::PI;

pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.5;
pub const DEFAULT_NECK_ATTENUATION: f32 = 0.7;

const HAND_LANDMARK_COUNT: usize = 21;

/// A local rotation for one canonical bone. Always finite; `rotation` is normalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneRotation {
    pub bone: HumanoidBone,
    /// Clamped XYZ Euler angles the quaternion was built from.
    pub euler: Vec3,
    pub rotation: Quat,
}

impl BoneRotation {
    pub fn from_euler(bone: HumanoidBone, euler: Vec3) -> Option<Self> {
        if !euler.is_finite() {
            return None;
        }
        let rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z).normalize();
        rotation.is_finite().then_some(Self { bone, euler, rotation })
    }

    pub fn from_quat(bone: HumanoidBone, rotation: Quat) -> Option<Self> {
        if !rotation.is_finite() || rotation.length_squared() <= f32::EPSILON {
            return None;
        }
        let rotation = rotation.normalize();
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        Some(Self { bone, euler: Vec3::new(x, y, z), rotation })
    }
}

/// Independently solved body regions. A skipped limb keeps all of its bones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limb {
    Neck,
    Arm(Side),
    Hand(Side),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub visibility_threshold: f32,
    pub arm_amplitude: f32,
    pub hand_amplitude: f32,
    pub neck_attenuation: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            arm_amplitude: 1.0,
            hand_amplitude: 1.0,
            neck_attenuation: DEFAULT_NECK_ATTENUATION,
        }
    }
}

/// What one call to [`PoseSolver::solve`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveReport {
    pub updated: Vec<BoneRotation>,
    pub skipped: Vec<Limb>,
}

#[derive(Debug, Clone)]
pub struct PoseSolver {
    limits: JointLimitTable,
    settings: SolverSettings,
    current: BTreeMap<HumanoidBone, BoneRotation>,
}

impl PoseSolver {
    pub fn new(limits: JointLimitTable, settings: SolverSettings) -> Self {
        Self { limits, settings, current: BTreeMap::new() }
    }

    pub fn limits(&self) -> &JointLimitTable {
        &self.limits
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Last emitted rotation per bone, including bones retained from earlier frames.
    pub fn rotations(&self) -> impl Iterator<Item = &BoneRotation> {
        self.current.values()
    }

    pub fn rotation(&self, bone: HumanoidBone) -> Option<&BoneRotation> {
        self.current.get(&bone)
    }

    pub fn reset(&mut self) {
        self.current.clear();
    }

    pub fn solve(&mut self, frame: &LandmarkFrame) -> SolveReport {
        let mut report = SolveReport::default();
        let limbs = [
            Limb::Neck,
            Limb::Arm(Side::Left),
            Limb::Arm(Side::Right),
            Limb::Hand(Side::Left),
            Limb::Hand(Side::Right),
        ];
        for limb in limbs {
            let solved = match limb {
                Limb::Neck => self.solve_neck(frame),
                Limb::Arm(side) => self.solve_arm(frame, side),
                Limb::Hand(side) => self.solve_hand(frame, side),
            };
            match solved {
                Some(rotations) => {
                    for rotation in rotations {
                        self.current.insert(rotation.bone, rotation);
                        report.updated.push(rotation);
                    }
                }
                None => report.skipped.push(limb),
            }
        }
        report
    }

    fn usable_pose(&self, frame: &LandmarkFrame, index: usize) -> Option<Vec3> {
        frame
            .pose(index)
            .filter(|point| point.is_usable(self.settings.visibility_threshold))
            .map(Landmark::position)
    }

    fn solve_neck(&self, frame: &LandmarkFrame) -> Option<Vec<BoneRotation>> {
        let nose = self.usable_pose(frame, pose::NOSE)?;
        let left = self.usable_pose(frame, pose::LEFT_SHOULDER)?;
        let right = self.usable_pose(frame, pose::RIGHT_SHOULDER)?;
        let raw = find_rotation((left + right) * 0.5, nose)?;
        let euler = self.limits.clamp(JointCategory::Neck, raw * self.settings.neck_attenuation);
        Some(vec![BoneRotation::from_euler(HumanoidBone::Neck, euler)?])
    }

    fn solve_arm(&self, frame: &LandmarkFrame, side: Side) -> Option<Vec<BoneRotation>> {
        let (shoulder, elbow, wrist) = match side {
            Side::Left => (pose::LEFT_SHOULDER, pose::LEFT_ELBOW, pose::LEFT_WRIST),
            _ => (pose::RIGHT_SHOULDER, pose::RIGHT_ELBOW, pose::RIGHT_WRIST),
        };
        let shoulder = self.usable_pose(frame, shoulder)?;
        let elbow = self.usable_pose(frame, elbow)?;
        let wrist = self.usable_pose(frame, wrist)?;

        let amplitude = self.settings.arm_amplitude;
        let upper = find_rotation(shoulder, elbow)?;
        let lower = find_rotation(elbow, wrist)?;
        let upper = self.constrain(JointCategory::UpperArm, upper, side, amplitude);
        let lower = self.constrain(JointCategory::LowerArm, lower, side, amplitude);
        Some(vec![
            BoneRotation::from_euler(HumanoidBone::upper_arm(side), upper)?,
            BoneRotation::from_euler(HumanoidBone::lower_arm(side), lower)?,
        ])
    }

    fn solve_hand(&self, frame: &LandmarkFrame, side: Side) -> Option<Vec<BoneRotation>> {
        let (points, wrist) = match side {
            Side::Left => (frame.left_hand_landmarks.as_ref()?, pose::LEFT_WRIST),
            _ => (frame.right_hand_landmarks.as_ref()?, pose::RIGHT_WRIST),
        };
        if points.len() < HAND_LANDMARK_COUNT
            || points.iter().any(|point| !point.is_usable(self.settings.visibility_threshold))
        {
            return None;
        }
        let wrist = self.usable_pose(frame, wrist)?;

        let palm = hand::PALM.iter().map(|index| points[*index].position()).sum::<Vec3>() / hand::PALM.len() as f32;
        let amplitude = self.settings.hand_amplitude;
        let wrist_euler = self.constrain(JointCategory::Hand, palm - wrist, side, amplitude);

        let thumb = points[hand::THUMB_BASE].position();
        let index = points[hand::INDEX_BASE].position();
        let pinky = points[hand::PINKY_BASE].position();
        let normal = (index - thumb).cross(pinky - thumb).normalize_or_zero();
        if normal == Vec3::ZERO {
            return None;
        }
        let finger_euler = self.constrain(JointCategory::Hand, normal, side, amplitude);

        let mut rotations = Vec::with_capacity(16);
        rotations.push(BoneRotation::from_euler(HumanoidBone::hand(side), wrist_euler)?);
        let base = BoneRotation::from_euler(HumanoidBone::hand(side), finger_euler)?;
        for finger in Finger::ALL {
            for bone in HumanoidBone::finger_segments(side, finger) {
                rotations.push(BoneRotation { bone, ..base });
            }
        }
        Some(rotations)
    }

    fn constrain(&self, category: JointCategory, raw: Vec3, side: Side, amplitude: f32) -> Vec3 {
        self.limits.clamp(category, apply_gains(category, raw, side) * amplitude)
    }
}

impl Default for PoseSolver {
    fn default() -> Self {
        Self::new(JointLimitTable::default(), SolverSettings::default())
    }
}

/// XYZ Euler angles of the shortest arc from +Y to `end - start`.
pub fn find_rotation(start: Vec3, end: Vec3) -> Option<Vec3> {
    let direction = (end - start).normalize_or_zero();
    if direction == Vec3::ZERO {
        return None;
    }
    let (x, y, z) = Quat::from_rotation_arc(Vec3::Y, direction).to_euler(EulerRot::XYZ);
    let euler = Vec3::new(x, y, z);
    euler.is_finite().then_some(euler)
}

/// Per-category gains; the right side is the reference and the left mirrors it.
pub fn apply_gains(category: JointCategory, raw: Vec3, side: Side) -> Vec3 {
    let inv = side.mirror_sign();
    match category {
        JointCategory::UpperArm => Vec3::new(raw.x * -2.3 * inv, raw.y * PI * inv, raw.z * -2.3 * inv),
        JointCategory::LowerArm => Vec3::new(raw.x * 2.14 * inv, raw.y * 2.14 * inv, raw.z * -2.14 * inv),
        JointCategory::Hand => Vec3::new(raw.x * 2.0 * inv, raw.y * 2.3, raw.z * -2.3 * inv),
        JointCategory::Neck => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_up_segment_has_no_rotation() {
        let euler = find_rotation(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)).expect("direction");
        assert!(euler.length() < 1e-5);
        assert!(find_rotation(Vec3::ONE, Vec3::ONE).is_none());
    }

    #[test]
    fn left_side_mirrors_asymmetric_axes() {
        let raw = Vec3::new(0.1, 0.2, 0.3);
        let right = apply_gains(JointCategory::Hand, raw, Side::Right);
        let left = apply_gains(JointCategory::Hand, raw, Side::Left);
        assert_eq!(left.x, -right.x);
        assert_eq!(left.y, right.y);
        assert_eq!(left.z, -right.z);
    }
}
