use crate::skeleton::{BoneGroup, HumanoidBone};
use glam::Quat;
use std::collections::HashMap;

const MIN_FACTOR: f32 = 1e-3;

/// Damping coefficient per bone group. Values are the per-tick blend toward the
/// raw target, so smaller means smoother and laggier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupDamping {
    pub neck: f32,
    pub arm: f32,
    pub hand: f32,
    pub finger: f32,
}

impl Default for GroupDamping {
    fn default() -> Self {
        Self { neck: 0.3, arm: 0.2, hand: 0.1, finger: 0.05 }
    }
}

impl GroupDamping {
    /// Blend factor for `group`, forced into (0, 1].
    pub fn factor(&self, group: BoneGroup) -> f32 {
        let raw = match group {
            BoneGroup::Neck | BoneGroup::Torso => self.neck,
            BoneGroup::Arm | BoneGroup::Leg => self.arm,
            BoneGroup::Hand => self.hand,
            BoneGroup::Finger => self.finger,
        };
        clamp_factor(raw)
    }
}

pub fn clamp_factor(raw: f32) -> f32 {
    if raw.is_finite() {
        raw.clamp(MIN_FACTOR, 1.0)
    } else {
        1.0
    }
}

/// Per-bone exponential smoothing. State starts at the rest pose and persists
/// across ticks until [`SmoothingFilter::reset`].
#[derive(Debug, Clone, Default)]
pub struct SmoothingFilter {
    damping: GroupDamping,
    state: HashMap<HumanoidBone, Quat>,
}

impl SmoothingFilter {
    pub fn new(damping: GroupDamping) -> Self {
        Self { damping, state: HashMap::new() }
    }

    pub fn damping(&self) -> &GroupDamping {
        &self.damping
    }

    /// Blend the stored rotation for `bone` toward `target` and return the result.
    /// A non-finite target or blend leaves the stored rotation unchanged.
    pub fn apply(&mut self, bone: HumanoidBone, target: Quat) -> Quat {
        let previous = self.state.get(&bone).copied().unwrap_or(Quat::IDENTITY);
        if !target.is_finite() || target.length_squared() <= f32::EPSILON {
            return previous;
        }
        let factor = self.damping.factor(bone.group());
        let next = previous.slerp(target.normalize(), factor).normalize();
        if !next.is_finite() {
            return previous;
        }
        self.state.insert(bone, next);
        next
    }

    pub fn get(&self, bone: HumanoidBone) -> Option<Quat> {
        self.state.get(&bone).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HumanoidBone, Quat)> + '_ {
        self.state.iter().map(|(bone, rotation)| (*bone, *rotation))
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn reset(&mut self) {
        self.state.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_is_forced_into_unit_interval() {
        let damping = GroupDamping { neck: 0.0, arm: 4.0, hand: f32::NAN, finger: 0.05 };
        assert_eq!(damping.factor(BoneGroup::Neck), MIN_FACTOR);
        assert_eq!(damping.factor(BoneGroup::Arm), 1.0);
        assert_eq!(damping.factor(BoneGroup::Hand), 1.0);
        assert_eq!(damping.factor(BoneGroup::Finger), 0.05);
    }

    #[test]
    fn unit_damping_snaps_to_target() {
        let mut filter = SmoothingFilter::new(GroupDamping { neck: 1.0, ..Default::default() });
        let target = Quat::from_rotation_y(0.8);
        let out = filter.apply(HumanoidBone::Neck, target);
        assert!(out.dot(target).abs() > 1.0 - 1e-6);
    }
}
