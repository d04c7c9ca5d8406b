use anyhow::{Context, Result};
use kestrel_motion::bone_names::RigCapabilities;
use kestrel_motion::clip_registry::{ClipRegistry, ClipStatus};
use kestrel_motion::config::MotionConfig;
use kestrel_motion::expression::Emotion;
use kestrel_motion::landmarks::pose;
use kestrel_motion::skeleton::{BoneGroup, HumanoidBone};
use kestrel_motion::state_machine::PerformanceState;
use kestrel_motion::{FrameInput, MotionEngine};
use serde::Deserialize;
use std::fs;

const DT: f32 = 1.0 / 30.0;

#[derive(Deserialize)]
struct Recording {
    frames: Vec<FrameInput>,
}

fn recorded_frames() -> Result<Vec<FrameInput>> {
    let bytes = fs::read("fixtures/recordings/short_take.json").context("read recording")?;
    let recording: Recording = serde_json::from_slice(&bytes).context("parse recording")?;
    Ok(recording
        .frames
        .into_iter()
        .map(|mut frame| {
            frame.dt = DT;
            frame
        })
        .collect())
}

fn fixture_registry() -> Result<ClipRegistry> {
    let mut registry = ClipRegistry::default();
    registry.load_json("breathe", "fixtures/clips/breathe.json")?;
    registry.load_json("idle_sway", "fixtures/clips/idle_kawaii_z_up.json")?;
    registry.load_json("wave", "fixtures/clips/wave_y_up.json")?;
    Ok(registry)
}

fn fixture_config() -> MotionConfig {
    let mut config = MotionConfig::default();
    config.idle.clips = vec!["breathe".to_string(), "idle_sway".to_string()];
    config.idle.speaking_clip = "wave".to_string();
    config.idle.seed = Some(3);
    config
}

#[test]
fn recorded_take_drives_every_subsystem() -> Result<()> {
    let registry = fixture_registry()?;
    let mut engine = MotionEngine::new(&fixture_config());
    let frames = recorded_frames()?;
    assert_eq!(frames.len(), 12);

    let mut outputs = Vec::new();
    for frame in frames {
        outputs.push(engine.tick(frame, &registry));
    }

    let first = &outputs[0];
    assert_eq!(first.session, 0);
    assert_eq!(first.playback.state, PerformanceState::Resting);
    assert!(!first.bones.is_empty(), "tracked bones appear on the first frame");
    assert!(first.bones.values().all(|rotation| rotation.is_finite() && rotation.is_normalized()));
    assert!(first.clip_pose.is_some());
    assert_eq!(first.clip_status, Some(ClipStatus::Ready));
    let idle = first.playback.displayed_clip.as_deref().expect("idle clip displayed");
    assert!(idle == "breathe" || idle == "idle_sway");

    let speaking = &outputs[8];
    assert_eq!(speaking.playback.state, PerformanceState::Speaking);
    assert_eq!(speaking.playback.displayed_clip.as_deref(), Some("wave"));
    assert_eq!(speaking.residency.active.as_deref(), Some("wave"));
    assert_ne!(speaking.residency.next.as_deref(), Some("wave"));

    // frame 10 carries no landmarks, so tracked bones hold
    assert_eq!(outputs[10].bones, outputs[9].bones);

    let last = &outputs[11];
    assert!(last.expressions.emotion(Emotion::Relaxed) > 0.0);
    assert!(last.expressions.iter().any(|(name, value)| ["aa", "ih", "ee", "oh", "ou"].contains(&name) && value > 0.0));
    assert!((last.time - 12.0 * f64::from(DT)).abs() < 1e-6);
    Ok(())
}

#[test]
fn low_confidence_arm_holds_engine_output_bit_for_bit() -> Result<()> {
    let registry = fixture_registry()?;
    let mut engine = MotionEngine::new(&fixture_config());
    let mut frames = recorded_frames()?.into_iter();
    let visible = frames.next().context("first frame")?;
    let mut occluded = frames.next().context("second frame")?;
    let points = occluded
        .landmarks
        .as_mut()
        .and_then(|frame| frame.pose_landmarks.as_mut())
        .context("pose landmarks")?;
    for index in [pose::LEFT_ELBOW, pose::LEFT_WRIST] {
        points[index].visibility = Some(0.1);
    }

    let before = engine.tick(visible, &registry);
    let after = engine.tick(occluded, &registry);
    for bone in [HumanoidBone::LeftUpperArm, HumanoidBone::LeftLowerArm] {
        let held = before.bones.get(&bone).with_context(|| format!("{bone:?} after visible frame"))?;
        let now = after.bones.get(&bone).with_context(|| format!("{bone:?} after occluded frame"))?;
        assert_eq!(now.to_array().map(f32::to_bits), held.to_array().map(f32::to_bits), "{bone:?} must hold");
    }
    Ok(())
}

#[test]
fn reset_session_clears_all_per_session_state() -> Result<()> {
    let registry = fixture_registry()?;
    let mut engine = MotionEngine::new(&fixture_config());
    for frame in recorded_frames()? {
        engine.tick(frame, &registry);
    }
    assert!(engine.rotation(HumanoidBone::Neck).is_some());
    assert!(engine.elapsed_seconds() > 0.0);

    engine.reset_session();
    assert_eq!(engine.session(), 1);
    assert_eq!(engine.elapsed_seconds(), 0.0);
    assert!(engine.rotation(HumanoidBone::Neck).is_none());
    assert!(engine.playback().active_clip.is_none());

    let output = engine.tick(FrameInput { dt: DT, ..Default::default() }, &registry);
    assert_eq!(output.session, 1);
    assert!(output.bones.is_empty());
    assert!(output.expressions.iter().all(|(_, value)| value == 0.0));
    assert_eq!(output.playback.state, PerformanceState::Resting);
    assert!(output.playback.active_clip.is_some());
    Ok(())
}

#[test]
fn rig_without_fingers_receives_no_finger_rotations() -> Result<()> {
    let registry = fixture_registry()?;
    let mut engine = MotionEngine::new(&fixture_config());
    let frames = recorded_frames()?;
    let rig = RigCapabilities::from_bones(
        HumanoidBone::ALL.iter().copied().filter(|bone| bone.group() != BoneGroup::Finger),
    );
    engine.change_rig(rig);
    assert_eq!(engine.session(), 1);

    for frame in frames {
        let output = engine.tick(frame, &registry);
        assert!(output.bones.keys().all(|bone| bone.group() != BoneGroup::Finger));
    }
    Ok(())
}

#[test]
fn missing_clip_never_blocks_the_tick() {
    let registry = ClipRegistry::default();
    let mut engine = MotionEngine::new(&fixture_config());
    let output = engine.tick(FrameInput { dt: DT, audio_playing: true, ..Default::default() }, &registry);
    assert_eq!(output.playback.state, PerformanceState::Speaking);
    assert_eq!(output.playback.active_clip.as_deref(), Some("wave"));
    assert!(output.playback.displayed_clip.is_none());
    assert!(output.clip_pose.is_none());
    assert_eq!(output.clip_status, None);
}
