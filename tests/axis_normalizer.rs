use glam::{Quat, Vec3};
use kestrel_motion::axis::{
    clip_is_z_up, normalize_clip, position_y_up_to_z_up, position_z_up_to_y_up, quat_y_up_to_z_up,
    quat_z_up_to_y_up, AxisSourceHint, NormalizeOptions, UpAxis, Z_UP_ROOT_SIGNATURE,
};
use kestrel_motion::clip::{AnimationClip, BoneTrack, ClipInterpolation, ClipKeyframe, QuatTrack, Vec3Track};
use kestrel_motion::skeleton::HumanoidBone;
use proptest::prelude::*;
use std::sync::Arc;

fn approx_vec3(actual: Vec3, expected: Vec3) {
    assert!(actual.abs_diff_eq(expected, 1e-5), "expected {expected:?}, got {actual:?}");
}

fn same_rotation(a: Quat, b: Quat, eps: f32) -> bool {
    a.dot(b).abs() > 1.0 - eps
}

fn hips_clip(up_axis: Option<UpAxis>, root_rotation: Option<Quat>, hips: Vec3, rotation: Quat) -> AnimationClip {
    let translation = Vec3Track {
        interpolation: ClipInterpolation::Linear,
        keyframes: Arc::from(vec![ClipKeyframe { time: 0.0, value: hips }].into_boxed_slice()),
    };
    let rotation = QuatTrack {
        interpolation: ClipInterpolation::Linear,
        keyframes: Arc::from(
            vec![ClipKeyframe { time: 0.0, value: Quat::IDENTITY }, ClipKeyframe { time: 1.0, value: rotation }]
                .into_boxed_slice(),
        ),
    };
    AnimationClip {
        name: Arc::from("probe"),
        duration: 1.0,
        looped: true,
        up_axis,
        root_rotation,
        tracks: Arc::from(
            vec![BoneTrack {
                bone: Arc::from("hips"),
                canonical: Some(HumanoidBone::Hips),
                translation: Some(translation),
                rotation: Some(rotation),
            }]
            .into_boxed_slice(),
        ),
    }
}

#[test]
fn z_up_position_maps_onto_y_up() {
    approx_vec3(position_z_up_to_y_up(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(1.0, 3.0, -2.0));
    approx_vec3(position_y_up_to_z_up(Vec3::new(1.0, 3.0, -2.0)), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn identity_rotation_survives_conversion() {
    let converted = quat_z_up_to_y_up(Quat::IDENTITY);
    assert!((converted.w - 1.0).abs() < 1e-6);
    assert!(converted.xyz().length() < 1e-6);
}

#[test]
fn rotation_is_conjugated_by_quarter_turn_about_x() {
    let turn = Quat::from_rotation_z(0.8);
    let converted = quat_z_up_to_y_up(turn);
    assert!(same_rotation(converted, Quat::from_axis_angle(Vec3::NEG_Y, 0.8), 1e-5), "got {converted:?}");
    let heading = Quat::from_rotation_x(0.6);
    assert!(same_rotation(quat_z_up_to_y_up(heading), heading, 1e-6));
}

#[test]
fn root_signature_marks_clip_as_z_up() {
    let clip = hips_clip(None, Some(Z_UP_ROOT_SIGNATURE), Vec3::new(0.0, 0.0, 0.9), Quat::IDENTITY);
    assert!(clip_is_z_up(&clip, AxisSourceHint::Auto));
    let mixamo = hips_clip(None, None, Vec3::new(0.0, 0.95, 0.0), Quat::IDENTITY);
    assert!(!clip_is_z_up(&mixamo, AxisSourceHint::Auto));
}

#[test]
fn rest_pose_decides_when_no_signature_is_present() {
    let clip = hips_clip(None, None, Vec3::new(0.0, 0.0, 95.0), Quat::IDENTITY);
    assert!(clip_is_z_up(&clip, AxisSourceHint::Auto));
    assert!(!clip_is_z_up(&clip, AxisSourceHint::YUp));
}

#[test]
fn normalization_leaves_input_untouched() {
    let clip = hips_clip(Some(UpAxis::Z), None, Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(0.5));
    let normalized = normalize_clip(&clip, NormalizeOptions::default());

    assert_eq!(clip.up_axis, Some(UpAxis::Z));
    let original = clip.tracks[0].translation.as_ref().and_then(|t| t.sample(0.0)).expect("input sample");
    approx_vec3(original, Vec3::new(1.0, 2.0, 3.0));

    assert_eq!(normalized.up_axis, Some(UpAxis::Y));
    assert!(normalized.root_rotation.is_none());
    let converted = normalized.tracks[0].translation.as_ref().and_then(|t| t.sample(0.0)).expect("output sample");
    approx_vec3(converted, Vec3::new(1.0, 3.0, -2.0));
}

#[test]
fn normalizing_twice_is_a_no_op() {
    let clip = hips_clip(None, Some(Z_UP_ROOT_SIGNATURE), Vec3::new(0.0, 0.0, 0.9), Quat::from_rotation_z(0.4));
    let forced = NormalizeOptions { hint: AxisSourceHint::ZUp, ..Default::default() };
    let once = normalize_clip(&clip, forced);
    let twice = normalize_clip(&once, forced);

    let first = once.tracks[0].translation.as_ref().and_then(|t| t.sample(0.0)).expect("first");
    let second = twice.tracks[0].translation.as_ref().and_then(|t| t.sample(0.0)).expect("second");
    approx_vec3(second, first);
    let first = once.tracks[0].rotation.as_ref().and_then(|t| t.sample(1.0)).expect("first");
    let second = twice.tracks[0].rotation.as_ref().and_then(|t| t.sample(1.0)).expect("second");
    assert!(same_rotation(first, second, 1e-6));
}

#[test]
fn y_up_clip_passes_through_unchanged() {
    let rotation = Quat::from_rotation_x(0.3);
    let clip = hips_clip(Some(UpAxis::Y), None, Vec3::new(0.0, 0.95, 0.0), rotation);
    let normalized = normalize_clip(&clip, NormalizeOptions::default());
    let sampled = normalized.tracks[0].rotation.as_ref().and_then(|t| t.sample(1.0)).expect("sample");
    assert!(same_rotation(sampled, rotation, 1e-6));
}

fn unit_quat() -> impl Strategy<Value = Quat> {
    (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0)
        .prop_filter("non-degenerate", |(x, y, z, w)| x * x + y * y + z * z + w * w > 0.01)
        .prop_map(|(x, y, z, w)| Quat::from_xyzw(x, y, z, w).normalize())
}

proptest! {
    #[test]
    fn position_round_trip_is_exact(x in -100.0f32..100.0, y in -100.0f32..100.0, z in -100.0f32..100.0) {
        let p = Vec3::new(x, y, z);
        prop_assert_eq!(position_y_up_to_z_up(position_z_up_to_y_up(p)), p);
    }

    #[test]
    fn rotation_round_trip_stays_within_tolerance(q in unit_quat()) {
        let back = quat_y_up_to_z_up(quat_z_up_to_y_up(q));
        prop_assert!((back.x - q.x).abs() < 1e-5);
        prop_assert!((back.y - q.y).abs() < 1e-5);
        prop_assert!((back.z - q.z).abs() < 1e-5);
        prop_assert!((back.w - q.w).abs() < 1e-5);
    }
}
