pub mod axis;
pub mod bone_names;
pub mod cli;
pub mod clip;
pub mod clip_registry;
pub mod clip_validation;
pub mod config;
pub mod engine;
pub mod expression;
pub mod landmarks;
pub mod limits;
pub mod skeleton;
pub mod smoothing;
pub mod solver;
pub mod state_machine;
pub mod time;

pub use engine::{FrameInput, FrameOutput, MotionEngine};
pub use skeleton::HumanoidBone;
