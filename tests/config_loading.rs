use anyhow::Result;
use kestrel_motion::cli::CliOverrides;
use kestrel_motion::config::MotionConfig;
use kestrel_motion::limits::{HAND_LIMITS, NECK_LIMITS};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn repository_config_loads() -> Result<()> {
    let config = MotionConfig::load("config/motion.json")?;
    assert_eq!(config.idle.clips, vec!["breathe", "idle_sway"]);
    assert_eq!(config.idle.speaking_clip, "wave");
    assert_eq!(config.smoothing.finger, 0.05);
    assert_eq!(config.tracking.neck_attenuation, 0.7);
    Ok(())
}

#[test]
fn missing_sections_take_defaults() -> Result<()> {
    let file = write_config(r#"{ "smoothing": { "arm": 0.4 } }"#)?;
    let config = MotionConfig::load(file.path())?;
    assert_eq!(config.smoothing.arm, 0.4);
    assert_eq!(config.smoothing.neck, 0.3);
    assert_eq!(config.tracking.visibility_threshold, 0.5);
    assert_eq!(config.idle.interval_seconds, 20.0);
    assert_eq!(config.idle.speaking_clip, "talking");
    assert!(config.idle.seed.is_none());
    assert_eq!(config.limits.table().lower_arm.z.min, -2.14);
    Ok(())
}

#[test]
fn out_of_range_values_are_repaired_on_load() -> Result<()> {
    let file = write_config(
        r#"{
            "smoothing": { "hand": 0.0, "finger": 3.0 },
            "tracking": { "visibility_threshold": 1.5 },
            "limits": { "neck": { "x": { "min": 0.5, "max": -0.5 },
                                   "y": { "min": -1.0, "max": 1.0 },
                                   "z": { "min": -0.5, "max": 0.5 } } },
            "idle": { "interval_seconds": -3.0 }
        }"#,
    )?;
    let config = MotionConfig::load(file.path())?;
    assert_eq!(config.smoothing.hand, 0.1);
    assert_eq!(config.smoothing.finger, 1.0);
    assert_eq!(config.tracking.visibility_threshold, 1.0);
    assert_eq!(config.limits.neck.x.min, -0.5);
    assert_eq!(config.limits.neck.x.max, 0.5);
    assert_eq!(config.idle.interval_seconds, 20.0);
    Ok(())
}

#[test]
fn partial_limit_axes_keep_bone_defaults() -> Result<()> {
    let file = write_config(r#"{ "limits": { "hand": { "x": { "min": -0.2, "max": 0.2 } }, "neck": {} } }"#)?;
    let config = MotionConfig::load(file.path())?;
    let hand = config.limits.hand;
    assert_eq!((hand.x.min, hand.x.max), (-0.2, 0.2));
    assert_eq!(hand.y, HAND_LIMITS.y);
    assert_eq!(hand.z, HAND_LIMITS.z);
    assert_eq!(config.limits.neck, NECK_LIMITS);
    assert_eq!(config.limits.table().lower_arm.z.min, -2.14);
    Ok(())
}

#[test]
fn unreadable_config_falls_back_to_defaults() -> Result<()> {
    let file = write_config("{ not json")?;
    assert!(MotionConfig::load(file.path()).is_err());
    let config = MotionConfig::load_or_default(file.path());
    assert_eq!(config.smoothing.arm, 0.2);
    assert!(config.idle.clips.is_empty());
    Ok(())
}

#[test]
fn command_line_overrides_win_over_file() -> Result<()> {
    let file = write_config(r#"{ "idle": { "interval_seconds": 30.0 }, "smoothing": { "arm": 0.4 } }"#)?;
    let path = file.path().to_string_lossy().into_owned();
    let cli = CliOverrides::parse(vec![
        "motion_replay".to_string(),
        "--config".to_string(),
        path,
        "--idle-interval".to_string(),
        "5".to_string(),
        "--seed".to_string(),
        "17".to_string(),
    ])?;

    let mut config = MotionConfig::load(cli.config_path().expect("config path"))?;
    let overrides = cli.into_config_overrides();
    assert_eq!(overrides.applied_fields(), vec!["idle_interval", "seed"]);
    config.apply_overrides(&overrides);

    assert_eq!(config.idle.interval_seconds, 5.0);
    assert_eq!(config.idle.seed, Some(17));
    assert_eq!(config.smoothing.arm, 0.4);
    Ok(())
}
