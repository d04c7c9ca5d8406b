use crate::bone_names::RigCapabilities;
use crate::clip::ClipPose;
use crate::clip_registry::{ClipRegistry, ClipStatus};
use crate::config::MotionConfig;
use crate::expression::{ExpressionChannelSet, ExpressionDriver, PerformanceCue};
use crate::landmarks::LandmarkFrame;
use crate::skeleton::HumanoidBone;
use crate::smoothing::SmoothingFilter;
use crate::solver::PoseSolver;
use crate::state_machine::{AnimationStateMachine, ClipPools, ClipResidency, PlaybackState};
use crate::time::SessionClock;
use glam::Quat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything the host hands the engine for one tick.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInput {
    /// Seconds since the previous tick.
    #[serde(default)]
    pub dt: f32,
    /// Latest tracker frame, if one arrived since the previous tick.
    #[serde(default)]
    pub landmarks: Option<LandmarkFrame>,
    #[serde(default)]
    pub cue: Option<PerformanceCue>,
    #[serde(default)]
    pub audio_playing: bool,
}

#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub session: u64,
    pub time: f64,
    /// Smoothed tracked rotations, keyed by the rig bone that receives them.
    pub bones: BTreeMap<HumanoidBone, Quat>,
    /// Pose of the displayed clip at this tick.
    pub clip_pose: Option<ClipPose>,
    pub expressions: ExpressionChannelSet,
    pub playback: Arc<PlaybackState>,
    pub residency: ClipResidency,
    pub clip_status: Option<ClipStatus>,
}

/// One avatar's motion pipeline. Not shared between sessions or avatars.
pub struct MotionEngine {
    solver: PoseSolver,
    smoothing: SmoothingFilter,
    state_machine: AnimationStateMachine,
    expression: ExpressionDriver,
    clock: SessionClock,
    rig: RigCapabilities,
    bones: BTreeMap<HumanoidBone, Quat>,
    session: u64,
}

impl MotionEngine {
    pub fn new(config: &MotionConfig) -> Self {
        let pools = ClipPools::new(config.idle.clips.iter().map(String::as_str), config.idle.speaking_clip.as_str());
        let state_machine = match config.idle.seed {
            Some(seed) => AnimationStateMachine::seeded(pools, config.idle.interval_seconds, seed),
            None => AnimationStateMachine::new(pools, config.idle.interval_seconds),
        };
        Self {
            solver: PoseSolver::new(config.limits.table(), config.tracking.solver_settings()),
            smoothing: SmoothingFilter::new(config.smoothing.damping()),
            state_machine,
            expression: ExpressionDriver::new(config.expression.settings()),
            clock: SessionClock::new(),
            rig: RigCapabilities::full(),
            bones: BTreeMap::new(),
            session: 0,
        }
    }

    pub fn with_rig(mut self, rig: RigCapabilities) -> Self {
        self.rig = rig;
        self
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.clock.elapsed_seconds()
    }

    pub fn playback(&self) -> Arc<PlaybackState> {
        self.state_machine.snapshot()
    }

    pub fn rotation(&self, bone: HumanoidBone) -> Option<Quat> {
        self.bones.get(&bone).copied()
    }

    /// Run one synchronous frame: solve, smooth, advance playback, drive expressions.
    pub fn tick(&mut self, input: FrameInput, registry: &ClipRegistry) -> FrameOutput {
        self.clock.tick(input.dt);
        let now = self.clock.elapsed_seconds();

        if let Some(frame) = &input.landmarks {
            let report = self.solver.solve(frame);
            if !report.skipped.is_empty() {
                log::trace!(target: "motion::engine", "limbs held this tick: {:?}", report.skipped);
            }
            for rotation in &report.updated {
                let Some(target) = self.rig.target_for(rotation.bone) else {
                    continue;
                };
                let smoothed = self.smoothing.apply(target, rotation.rotation);
                self.bones.insert(target, smoothed);
            }
        }

        let playback = self.state_machine.update(input.audio_playing, now, registry);
        let clip_pose = playback
            .displayed_clip
            .as_deref()
            .and_then(|key| registry.clip(key))
            .map(|clip| clip.sample(playback.displayed_time(now)));

        let expressions =
            *self.expression.update(input.cue.as_ref(), input.audio_playing, now, self.clock.delta_seconds());

        FrameOutput {
            session: self.session,
            time: now,
            bones: self.bones.clone(),
            clip_pose,
            expressions,
            residency: playback.residency(),
            clip_status: playback.active_status.clone(),
            playback,
        }
    }

    /// Drop every piece of per-session state in one step so nothing from the old
    /// skeleton leaks into the next tick.
    pub fn reset_session(&mut self) {
        self.solver.reset();
        self.smoothing.reset();
        self.bones.clear();
        self.state_machine.shutdown();
        self.expression.reset();
        self.clock.reset();
        self.session = self.session.wrapping_add(1);
        log::info!(target: "motion::engine", "session reset; now session {}", self.session);
    }

    /// Switch to a different avatar rig. Implies a session reset.
    pub fn change_rig(&mut self, rig: RigCapabilities) {
        self.rig = rig;
        self.reset_session();
    }
}
