use glam::Quat;
use kestrel_motion::clip::{AnimationClip, BoneTrack, ClipInterpolation, ClipKeyframe, QuatTrack};
use kestrel_motion::clip_registry::{ClipRegistry, ClipStatus};
use kestrel_motion::skeleton::HumanoidBone;
use kestrel_motion::state_machine::{AnimationStateMachine, ClipPools, PerformanceState};
use std::collections::HashSet;
use std::sync::Arc;

const IDLE: [&str; 3] = ["idle_a", "idle_b", "idle_c"];

fn still_clip(name: &str) -> AnimationClip {
    let rotation = QuatTrack {
        interpolation: ClipInterpolation::Linear,
        keyframes: Arc::from(
            vec![ClipKeyframe { time: 0.0, value: Quat::IDENTITY }, ClipKeyframe { time: 1.0, value: Quat::IDENTITY }]
                .into_boxed_slice(),
        ),
    };
    AnimationClip {
        name: Arc::from(name),
        duration: 1.0,
        looped: true,
        up_axis: None,
        root_rotation: None,
        tracks: Arc::from(
            vec![BoneTrack {
                bone: Arc::from("hips"),
                canonical: Some(HumanoidBone::Hips),
                translation: None,
                rotation: Some(rotation),
            }]
            .into_boxed_slice(),
        ),
    }
}

fn loaded_registry() -> ClipRegistry {
    let mut registry = ClipRegistry::default();
    for key in IDLE.iter().chain(["talk"].iter()) {
        registry.insert(*key, still_clip(key));
    }
    registry
}

fn machine(seed: u64) -> AnimationStateMachine {
    AnimationStateMachine::seeded(ClipPools::new(IDLE, "talk"), 20.0, seed)
}

#[test]
fn starts_resting_on_an_idle_clip() {
    let registry = loaded_registry();
    let mut machine = machine(7);
    let state = machine.update(false, 0.0, &registry);

    assert_eq!(state.state, PerformanceState::Resting);
    let active = state.active_clip.as_deref().expect("active clip");
    assert!(IDLE.contains(&active));
    assert_eq!(state.displayed_clip.as_deref(), Some(active));
    assert_eq!(state.active_status, Some(ClipStatus::Ready));
    assert!(machine.timer().is_armed());
}

#[test]
fn audio_switches_to_speaking_and_back() {
    let registry = loaded_registry();
    let mut machine = machine(3);
    machine.update(false, 0.0, &registry);

    let speaking = machine.update(true, 1.0, &registry);
    assert_eq!(speaking.state, PerformanceState::Speaking);
    assert_eq!(speaking.active_clip.as_deref(), Some("talk"));
    assert_eq!(speaking.active_clip_start, 1.0);
    assert!(!machine.timer().is_armed());

    let resting = machine.update(false, 5.0, &registry);
    assert_eq!(resting.state, PerformanceState::Resting);
    assert!(IDLE.contains(&resting.active_clip.as_deref().unwrap_or_default()));
    assert_eq!(resting.active_clip_start, 5.0);
    assert_eq!(machine.timer().next_due(), Some(25.0));
}

#[test]
fn idle_clip_is_repicked_every_interval() {
    let registry = loaded_registry();
    let mut machine = machine(11);
    let first = machine.update(false, 0.0, &registry);

    let before = machine.update(false, 19.9, &registry);
    assert_eq!(before.generation, first.generation);

    let after = machine.update(false, 20.0, &registry);
    assert_eq!(after.generation, first.generation + 1);
    assert_eq!(after.active_clip_start, 20.0);
    assert_eq!(machine.timer().next_due(), Some(40.0));
}

#[test]
fn missed_intervals_fire_once() {
    let registry = loaded_registry();
    let mut machine = machine(5);
    let first = machine.update(false, 0.0, &registry);
    let late = machine.update(false, 100.0, &registry);
    assert_eq!(late.generation, first.generation + 1);
    assert_eq!(machine.timer().next_due(), Some(120.0));
}

#[test]
fn every_idle_clip_is_eventually_chosen() {
    let registry = loaded_registry();
    let mut machine = machine(42);
    let mut seen = HashSet::new();
    for interval in 0..60 {
        let state = machine.update(false, f64::from(interval) * 20.0, &registry);
        if let Some(active) = &state.active_clip {
            seen.insert(active.to_string());
        }
    }
    for key in IDLE {
        assert!(seen.contains(key), "{key} never played");
    }
    assert!(!seen.contains("talk"));
}

#[test]
fn next_clip_differs_from_active() {
    let registry = loaded_registry();
    let mut machine = machine(9);
    for step in 0..40 {
        let audio = step % 5 == 0;
        let state = machine.update(audio, f64::from(step) * 20.0, &registry);
        let residency = state.residency();
        assert!(residency.next.is_some());
        assert_ne!(residency.active, residency.next, "step {step}");
    }
}

#[test]
fn unready_speaking_clip_keeps_last_good_clip_displayed() {
    let mut registry = ClipRegistry::default();
    registry.insert("idle_a", still_clip("idle_a"));
    registry.mark_pending("talk");
    let mut machine = AnimationStateMachine::seeded(ClipPools::new(["idle_a"], "talk"), 20.0, 1);

    let resting = machine.update(false, 0.0, &registry);
    assert_eq!(resting.displayed_clip.as_deref(), Some("idle_a"));

    let pending = machine.update(true, 2.0, &registry);
    assert_eq!(pending.active_clip.as_deref(), Some("talk"));
    assert_eq!(pending.active_status, Some(ClipStatus::Pending));
    assert_eq!(pending.displayed_clip.as_deref(), Some("idle_a"));
    assert_eq!(pending.displayed_clip_start, 0.0);

    registry.mark_failed("talk", "decode error");
    let failed = machine.update(true, 3.0, &registry);
    assert!(matches!(failed.active_status, Some(ClipStatus::Failed(_))));
    assert_eq!(failed.displayed_clip.as_deref(), Some("idle_a"));

    registry.insert("talk", still_clip("talk"));
    let ready = machine.update(true, 4.0, &registry);
    assert_eq!(ready.displayed_clip.as_deref(), Some("talk"));
    assert_eq!(ready.displayed_clip_start, 2.0);
}

#[test]
fn snapshots_are_never_mutated_in_place() {
    let registry = loaded_registry();
    let mut machine = machine(2);
    let resting = machine.update(false, 0.0, &registry);
    let copy = (*resting).clone();
    let speaking = machine.update(true, 1.0, &registry);
    assert_eq!(*resting, copy);
    assert!(!Arc::ptr_eq(&resting, &speaking));

    let unchanged = machine.update(true, 1.5, &registry);
    assert!(Arc::ptr_eq(&speaking, &unchanged));
}

#[test]
fn shutdown_cancels_timer_and_clears_playback() {
    let registry = loaded_registry();
    let mut machine = machine(4);
    machine.update(false, 0.0, &registry);
    assert!(machine.timer().is_armed());

    machine.shutdown();
    assert!(!machine.timer().is_armed());
    assert_eq!(machine.snapshot().active_clip, None);
    assert_eq!(machine.state(), PerformanceState::Resting);

    let restarted = machine.update(false, 0.0, &registry);
    assert!(restarted.active_clip.is_some());
    assert!(machine.timer().is_armed());
}

#[test]
fn empty_idle_pool_falls_back_to_speaking_clip() {
    let registry = loaded_registry();
    let mut machine = AnimationStateMachine::seeded(ClipPools::new(Vec::<String>::new(), "talk"), 20.0, 8);
    let state = machine.update(false, 0.0, &registry);
    assert_eq!(state.state, PerformanceState::Resting);
    assert_eq!(state.active_clip.as_deref(), Some("talk"));
}
