use anyhow::{bail, Context, Result};
use kestrel_motion::cli::CliOverrides;
use kestrel_motion::clip_registry::{ClipRegistry, GltfLoadOptions};
use kestrel_motion::config::MotionConfig;
use kestrel_motion::engine::{FrameInput, FrameOutput, MotionEngine};
use kestrel_motion::state_machine::{ClipResidency, PerformanceState};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const DEFAULT_TIMESTEP: f32 = 1.0 / 30.0;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("motion_replay error: {err:?}");
        process::exit(1);
    }
}

/// A captured take: frames plus the clips the state machine may choose from.
#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default = "default_timestep")]
    dt: f32,
    #[serde(default)]
    clips: BTreeMap<String, PathBuf>,
    frames: Vec<FrameInput>,
}

fn default_timestep() -> f32 {
    DEFAULT_TIMESTEP
}

fn run() -> Result<()> {
    let cli = CliOverrides::parse_from_env()?;
    let Some(recording_path) = cli.positional().first().map(PathBuf::from) else {
        print_usage();
        bail!("missing recording path");
    };
    let mut config = match cli.config_path() {
        Some(path) => MotionConfig::load_or_default(path),
        None => MotionConfig::default(),
    };
    let overrides = cli.clone().into_config_overrides();
    if !overrides.is_empty() {
        log::info!(target: "motion::config", "CLI overrides applied: {}", overrides.applied_fields().join(", "));
        config.apply_overrides(&overrides);
    }

    let recording = load_recording(&recording_path)?;
    let base_dir = recording_path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut registry = ClipRegistry::default();
    for (key, clip_path) in &recording.clips {
        let resolved = if clip_path.exists() { clip_path.clone() } else { base_dir.join(clip_path) };
        if let Err(err) = load_clip(&mut registry, key, &resolved) {
            log::warn!(target: "motion::clips", "clip '{}' unavailable: {err:#}", key);
        }
    }
    if config.idle.clips.is_empty() {
        config.idle.clips =
            recording.clips.keys().filter(|key| **key != config.idle.speaking_clip).cloned().collect();
    }

    let timestep = if recording.dt.is_finite() && recording.dt > 0.0 { recording.dt } else { DEFAULT_TIMESTEP };
    let mut engine = MotionEngine::new(&config);
    let mut residency = ClipResidency::default();
    for (tick, mut input) in recording.frames.into_iter().enumerate() {
        if input.dt <= 0.0 {
            input.dt = timestep;
        }
        let output = engine.tick(input, &registry);
        registry.sync_residency(&residency, &output.residency);
        residency = output.residency.clone();
        println!("{}", tick_json(tick, &output));
    }
    Ok(())
}

fn load_recording(path: &Path) -> Result<Recording> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read recording {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse recording {}", path.display()))
}

fn load_clip(registry: &mut ClipRegistry, key: &str, path: &Path) -> Result<()> {
    let ext = path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("gltf") | Some("glb") => registry.load_gltf(key, path, GltfLoadOptions::default()).map(|_| ()),
        _ => registry.load_json(key, path).map(|_| ()),
    }
}

fn tick_json(tick: usize, output: &FrameOutput) -> Value {
    let bones: Map<String, Value> = output
        .bones
        .iter()
        .map(|(bone, rotation)| (bone.as_str().to_string(), json!(rotation.to_array())))
        .collect();
    let expressions: Map<String, Value> = output
        .expressions
        .iter()
        .filter(|(_, value)| *value > 0.0)
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();
    let state = match output.playback.state {
        PerformanceState::Resting => "resting",
        PerformanceState::Speaking => "speaking",
    };
    json!({
        "tick": tick,
        "session": output.session,
        "time": output.time,
        "state": state,
        "active": output.residency.active.as_deref(),
        "next": output.residency.next.as_deref(),
        "displayed": output.playback.displayed_clip.as_deref(),
        "clip_status": output.clip_status.as_ref().map(|status| format!("{status:?}")),
        "clip_bones": output.clip_pose.as_ref().map(|pose| pose.bones.len()).unwrap_or(0),
        "bones": bones,
        "expressions": expressions,
    })
}

fn print_usage() {
    eprintln!(
        "Motion Replay

Usage:
  motion_replay <recording.json> [--config motion.json] [--idle-interval SECS]
                [--visibility 0..1] [--arm-damping (0,1]] [--hand-damping (0,1]] [--seed N]

Replays recorded landmark frames and cues through the motion engine at the
recording's fixed timestep and prints one JSON line per tick.
"
    );
}
