use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Center,
}

impl Side {
    /// Sign applied to mirror-asymmetric axes: the right side is the reference.
    pub fn mirror_sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right | Side::Center => 1.0,
        }
    }
}

/// Smoothing groups; each carries its own damping coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoneGroup {
    Torso,
    Neck,
    Arm,
    Hand,
    Finger,
    Leg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    pub const ALL: [Finger; 5] = [Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Little];
}

macro_rules! humanoid_bones {
    ($($variant:ident => $name:literal, $side:ident, $group:ident;)*) => {
        /// The canonical humanoid bone set. Every name the engine handles internally is one of these.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum HumanoidBone {
            $($variant,)*
        }

        impl HumanoidBone {
            pub const ALL: &'static [HumanoidBone] = &[$(HumanoidBone::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(HumanoidBone::$variant => $name,)*
                }
            }

            pub fn side(self) -> Side {
                match self {
                    $(HumanoidBone::$variant => Side::$side,)*
                }
            }

            pub fn group(self) -> BoneGroup {
                match self {
                    $(HumanoidBone::$variant => BoneGroup::$group,)*
                }
            }

            /// Exact lookup by canonical camelCase name.
            pub fn from_canonical(name: &str) -> Option<HumanoidBone> {
                match name {
                    $($name => Some(HumanoidBone::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

humanoid_bones! {
    Hips => "hips", Center, Torso;
    Spine => "spine", Center, Torso;
    Chest => "chest", Center, Torso;
    UpperChest => "upperChest", Center, Torso;
    Neck => "neck", Center, Neck;
    Head => "head", Center, Neck;
    LeftShoulder => "leftShoulder", Left, Arm;
    LeftUpperArm => "leftUpperArm", Left, Arm;
    LeftLowerArm => "leftLowerArm", Left, Arm;
    LeftHand => "leftHand", Left, Hand;
    RightShoulder => "rightShoulder", Right, Arm;
    RightUpperArm => "rightUpperArm", Right, Arm;
    RightLowerArm => "rightLowerArm", Right, Arm;
    RightHand => "rightHand", Right, Hand;
    LeftUpperLeg => "leftUpperLeg", Left, Leg;
    LeftLowerLeg => "leftLowerLeg", Left, Leg;
    LeftFoot => "leftFoot", Left, Leg;
    LeftToes => "leftToes", Left, Leg;
    RightUpperLeg => "rightUpperLeg", Right, Leg;
    RightLowerLeg => "rightLowerLeg", Right, Leg;
    RightFoot => "rightFoot", Right, Leg;
    RightToes => "rightToes", Right, Leg;
    LeftThumbMetacarpal => "leftThumbMetacarpal", Left, Finger;
    LeftThumbProximal => "leftThumbProximal", Left, Finger;
    LeftThumbDistal => "leftThumbDistal", Left, Finger;
    LeftIndexProximal => "leftIndexProximal", Left, Finger;
    LeftIndexIntermediate => "leftIndexIntermediate", Left, Finger;
    LeftIndexDistal => "leftIndexDistal", Left, Finger;
    LeftMiddleProximal => "leftMiddleProximal", Left, Finger;
    LeftMiddleIntermediate => "leftMiddleIntermediate", Left, Finger;
    LeftMiddleDistal => "leftMiddleDistal", Left, Finger;
    LeftRingProximal => "leftRingProximal", Left, Finger;
    LeftRingIntermediate => "leftRingIntermediate", Left, Finger;
    LeftRingDistal => "leftRingDistal", Left, Finger;
    LeftLittleProximal => "leftLittleProximal", Left, Finger;
    LeftLittleIntermediate => "leftLittleIntermediate", Left, Finger;
    LeftLittleDistal => "leftLittleDistal", Left, Finger;
    RightThumbMetacarpal => "rightThumbMetacarpal", Right, Finger;
    RightThumbProximal => "rightThumbProximal", Right, Finger;
    RightThumbDistal => "rightThumbDistal", Right, Finger;
    RightIndexProximal => "rightIndexProximal", Right, Finger;
    RightIndexIntermediate => "rightIndexIntermediate", Right, Finger;
    RightIndexDistal => "rightIndexDistal", Right, Finger;
    RightMiddleProximal => "rightMiddleProximal", Right, Finger;
    RightMiddleIntermediate => "rightMiddleIntermediate", Right, Finger;
    RightMiddleDistal => "rightMiddleDistal", Right, Finger;
    RightRingProximal => "rightRingProximal", Right, Finger;
    RightRingIntermediate => "rightRingIntermediate", Right, Finger;
    RightRingDistal => "rightRingDistal", Right, Finger;
    RightLittleProximal => "rightLittleProximal", Right, Finger;
    RightLittleIntermediate => "rightLittleIntermediate", Right, Finger;
    RightLittleDistal => "rightLittleDistal", Right, Finger;
}

impl HumanoidBone {
    pub fn upper_arm(side: Side) -> HumanoidBone {
        match side {
            Side::Left => HumanoidBone::LeftUpperArm,
            _ => HumanoidBone::RightUpperArm,
        }
    }

    pub fn lower_arm(side: Side) -> HumanoidBone {
        match side {
            Side::Left => HumanoidBone::LeftLowerArm,
            _ => HumanoidBone::RightLowerArm,
        }
    }

    pub fn hand(side: Side) -> HumanoidBone {
        match side {
            Side::Left => HumanoidBone::LeftHand,
            _ => HumanoidBone::RightHand,
        }
    }

    /// The three segments of one finger, base to tip.
    pub fn finger_segments(side: Side, finger: Finger) -> [HumanoidBone; 3] {
        use HumanoidBone::*;
        let left = matches!(side, Side::Left);
        match (finger, left) {
            (Finger::Thumb, true) => [LeftThumbMetacarpal, LeftThumbProximal, LeftThumbDistal],
            (Finger::Index, true) => [LeftIndexProximal, LeftIndexIntermediate, LeftIndexDistal],
            (Finger::Middle, true) => [LeftMiddleProximal, LeftMiddleIntermediate, LeftMiddleDistal],
            (Finger::Ring, true) => [LeftRingProximal, LeftRingIntermediate, LeftRingDistal],
            (Finger::Little, true) => [LeftLittleProximal, LeftLittleIntermediate, LeftLittleDistal],
            (Finger::Thumb, false) => [RightThumbMetacarpal, RightThumbProximal, RightThumbDistal],
            (Finger::Index, false) => [RightIndexProximal, RightIndexIntermediate, RightIndexDistal],
            (Finger::Middle, false) => [RightMiddleProximal, RightMiddleIntermediate, RightMiddleDistal],
            (Finger::Ring, false) => [RightRingProximal, RightRingIntermediate, RightRingDistal],
            (Finger::Little, false) => [RightLittleProximal, RightLittleIntermediate, RightLittleDistal],
        }
    }
}

impl fmt::Display for HumanoidBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
