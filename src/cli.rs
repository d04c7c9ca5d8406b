use crate::config::MotionConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

const SUPPORTED_FLAGS: &str = "--config, --idle-interval, --visibility, --arm-damping, --hand-damping, --seed";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    config_path: Option<PathBuf>,
    idle_interval: Option<f32>,
    visibility: Option<f32>,
    arm_damping: Option<f32>,
    hand_damping: Option<f32>,
    seed: Option<u64>,
    positional: Vec<String>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    /// Parse `--flag value` pairs. Arguments without a leading `--` are kept as positionals.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw) = iter.next() {
            let flag = raw.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                overrides.positional.push(flag.to_string());
                continue;
            };
            let value = iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config_path = Some(PathBuf::from(value)),
                "idle-interval" => {
                    let seconds = parse_f32("idle interval", &value)?;
                    if seconds <= 0.0 {
                        bail!("Idle interval must be positive, got {seconds}");
                    }
                    overrides.idle_interval = Some(seconds);
                }
                "visibility" => {
                    let threshold = parse_f32("visibility", &value)?;
                    if !(0.0..=1.0).contains(&threshold) {
                        bail!("Visibility threshold must be within [0, 1], got {threshold}");
                    }
                    overrides.visibility = Some(threshold);
                }
                "arm-damping" => overrides.arm_damping = Some(parse_damping("arm damping", &value)?),
                "hand-damping" => overrides.hand_damping = Some(parse_damping("hand damping", &value)?),
                "seed" => {
                    overrides.seed = Some(value.parse::<u64>().with_context(|| format!("Invalid seed '{value}'"))?);
                }
                _ => bail!("Unknown flag '{flag}'. Supported flags: {SUPPORTED_FLAGS}."),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn into_config_overrides(self) -> MotionConfigOverrides {
        MotionConfigOverrides {
            idle_interval: self.idle_interval,
            visibility_threshold: self.visibility,
            arm_damping: self.arm_damping,
            hand_damping: self.hand_damping,
            seed: self.seed,
        }
    }
}

fn parse_f32(label: &str, value: &str) -> Result<f32> {
    let parsed = value.parse::<f32>().with_context(|| format!("Invalid {label} '{value}'"))?;
    if !parsed.is_finite() {
        bail!("Invalid {label} '{value}': must be finite");
    }
    Ok(parsed)
}

fn parse_damping(label: &str, value: &str) -> Result<f32> {
    let damping = parse_f32(label, value)?;
    if damping <= 0.0 || damping > 1.0 {
        bail!("{label} must be in (0, 1], got {damping}");
    }
    Ok(damping)
}
