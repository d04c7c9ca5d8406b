use glam::Vec3;
use serde::Deserialize;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Inclusive range on one local Euler axis, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisRange {
    pub min: f32,
    pub max: f32,
}

impl AxisRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Swap inverted bounds; replace non-finite bounds with `fallback`.
    pub fn repaired(self, fallback: AxisRange) -> AxisRange {
        if !self.min.is_finite() || !self.max.is_finite() {
            return fallback;
        }
        if self.min > self.max {
            AxisRange::new(self.max, self.min)
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct JointLimits {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
}

impl JointLimits {
    pub const fn new(x: AxisRange, y: AxisRange, z: AxisRange) -> Self {
        Self { x, y, z }
    }

    pub fn clamp(&self, euler: Vec3) -> Vec3 {
        Vec3::new(self.x.clamp(euler.x), self.y.clamp(euler.y), self.z.clamp(euler.z))
    }

    pub fn contains(&self, euler: Vec3) -> bool {
        self.x.contains(euler.x) && self.y.contains(euler.y) && self.z.contains(euler.z)
    }

    pub fn repaired(self, fallback: JointLimits) -> JointLimits {
        JointLimits::new(self.x.repaired(fallback.x), self.y.repaired(fallback.y), self.z.repaired(fallback.z))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointCategory {
    Neck,
    UpperArm,
    LowerArm,
    Hand,
}

pub const NECK_LIMITS: JointLimits = JointLimits::new(
    AxisRange::new(-FRAC_PI_4, FRAC_PI_4),
    AxisRange::new(-FRAC_PI_2, FRAC_PI_2),
    AxisRange::new(-FRAC_PI_4, FRAC_PI_4),
);

pub const UPPER_ARM_LIMITS: JointLimits = JointLimits::new(
    AxisRange::new(-0.5, PI),
    AxisRange::new(-FRAC_PI_2, FRAC_PI_2),
    AxisRange::new(-FRAC_PI_2, FRAC_PI_2),
);

pub const LOWER_ARM_LIMITS: JointLimits = JointLimits::new(
    AxisRange::new(-0.3, 0.3),
    AxisRange::new(-FRAC_PI_2, FRAC_PI_2),
    AxisRange::new(-2.14, 0.0),
);

pub const HAND_LIMITS: JointLimits = JointLimits::new(
    AxisRange::new(-0.3, 0.3),
    AxisRange::new(-1.2, 1.6),
    AxisRange::new(-FRAC_PI_2, FRAC_PI_2),
);

/// Static per-category limits. Built once from configuration and never mutated while ticking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimitTable {
    pub neck: JointLimits,
    pub upper_arm: JointLimits,
    pub lower_arm: JointLimits,
    pub hand: JointLimits,
}

impl Default for JointLimitTable {
    fn default() -> Self {
        Self { neck: NECK_LIMITS, upper_arm: UPPER_ARM_LIMITS, lower_arm: LOWER_ARM_LIMITS, hand: HAND_LIMITS }
    }
}

impl JointLimitTable {
    pub fn get(&self, category: JointCategory) -> &JointLimits {
        match category {
            JointCategory::Neck => &self.neck,
            JointCategory::UpperArm => &self.upper_arm,
            JointCategory::LowerArm => &self.lower_arm,
            JointCategory::Hand => &self.hand,
        }
    }

    pub fn clamp(&self, category: JointCategory, euler: Vec3) -> Vec3 {
        self.get(category).clamp(euler)
    }
}
