use crate::expression::ExpressionSettings;
use crate::limits::{AxisRange, JointLimitTable, JointLimits, HAND_LIMITS, LOWER_ARM_LIMITS, NECK_LIMITS, UPPER_ARM_LIMITS};
use crate::smoothing::GroupDamping;
use crate::solver::{SolverSettings, DEFAULT_NECK_ATTENUATION, DEFAULT_VISIBILITY_THRESHOLD};
use crate::state_machine::DEFAULT_IDLE_INTERVAL_SECONDS;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "SmoothingConfig::default_neck")]
    pub neck: f32,
    #[serde(default = "SmoothingConfig::default_arm")]
    pub arm: f32,
    #[serde(default = "SmoothingConfig::default_hand")]
    pub hand: f32,
    #[serde(default = "SmoothingConfig::default_finger")]
    pub finger: f32,
}

/// Per-bone Euler limits. A bone object may name only some axes; the rest keep
/// that bone's built-in range.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "LimitsConfig::default_neck", deserialize_with = "LimitsConfig::neck_axes")]
    pub neck: JointLimits,
    #[serde(default = "LimitsConfig::default_upper_arm", deserialize_with = "LimitsConfig::upper_arm_axes")]
    pub upper_arm: JointLimits,
    #[serde(default = "LimitsConfig::default_lower_arm", deserialize_with = "LimitsConfig::lower_arm_axes")]
    pub lower_arm: JointLimits,
    #[serde(default = "LimitsConfig::default_hand", deserialize_with = "LimitsConfig::hand_axes")]
    pub hand: JointLimits,
}

#[derive(Debug, Default, Deserialize)]
struct JointLimitsFile {
    #[serde(default)]
    x: Option<AxisRange>,
    #[serde(default)]
    y: Option<AxisRange>,
    #[serde(default)]
    z: Option<AxisRange>,
}

impl JointLimitsFile {
    fn or_defaults(self, defaults: JointLimits) -> JointLimits {
        JointLimits {
            x: self.x.unwrap_or(defaults.x),
            y: self.y.unwrap_or(defaults.y),
            z: self.z.unwrap_or(defaults.z),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "TrackingConfig::default_visibility_threshold")]
    pub visibility_threshold: f32,
    #[serde(default = "TrackingConfig::default_amplitude")]
    pub arm_amplitude: f32,
    #[serde(default = "TrackingConfig::default_amplitude")]
    pub hand_amplitude: f32,
    #[serde(default = "TrackingConfig::default_neck_attenuation")]
    pub neck_attenuation: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdleConfig {
    #[serde(default = "IdleConfig::default_interval_seconds")]
    pub interval_seconds: f32,
    /// Idle pool clip identifiers.
    #[serde(default)]
    pub clips: Vec<String>,
    /// Clip held for the whole speaking state.
    #[serde(default = "IdleConfig::default_speaking_clip")]
    pub speaking_clip: String,
    /// Fixed seed for clip selection; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpressionConfig {
    #[serde(default = "ExpressionConfig::default_rate")]
    pub attack_rate: f32,
    #[serde(default = "ExpressionConfig::default_rate")]
    pub release_rate: f32,
    #[serde(default = "ExpressionConfig::default_viseme_frequency")]
    pub viseme_frequency: f32,
    #[serde(default = "ExpressionConfig::default_viseme_modulation")]
    pub viseme_modulation: f32,
    #[serde(default = "ExpressionConfig::default_viseme_floor")]
    pub viseme_floor: f32,
    #[serde(default = "ExpressionConfig::default_viseme_swing")]
    pub viseme_swing: f32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MotionConfig {
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub idle: IdleConfig,
    #[serde(default)]
    pub expression: ExpressionConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionConfigOverrides {
    pub idle_interval: Option<f32>,
    pub visibility_threshold: Option<f32>,
    pub arm_damping: Option<f32>,
    pub hand_damping: Option<f32>,
    pub seed: Option<u64>,
}

impl SmoothingConfig {
    const fn default_neck() -> f32 {
        0.3
    }

    const fn default_arm() -> f32 {
        0.2
    }

    const fn default_hand() -> f32 {
        0.1
    }

    const fn default_finger() -> f32 {
        0.05
    }

    pub fn damping(&self) -> GroupDamping {
        GroupDamping { neck: self.neck, arm: self.arm, hand: self.hand, finger: self.finger }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            neck: Self::default_neck(),
            arm: Self::default_arm(),
            hand: Self::default_hand(),
            finger: Self::default_finger(),
        }
    }
}

impl LimitsConfig {
    const fn default_neck() -> JointLimits {
        NECK_LIMITS
    }

    const fn default_upper_arm() -> JointLimits {
        UPPER_ARM_LIMITS
    }

    const fn default_lower_arm() -> JointLimits {
        LOWER_ARM_LIMITS
    }

    const fn default_hand() -> JointLimits {
        HAND_LIMITS
    }

    fn neck_axes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JointLimits, D::Error> {
        JointLimitsFile::deserialize(deserializer).map(|file| file.or_defaults(NECK_LIMITS))
    }

    fn upper_arm_axes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JointLimits, D::Error> {
        JointLimitsFile::deserialize(deserializer).map(|file| file.or_defaults(UPPER_ARM_LIMITS))
    }

    fn lower_arm_axes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JointLimits, D::Error> {
        JointLimitsFile::deserialize(deserializer).map(|file| file.or_defaults(LOWER_ARM_LIMITS))
    }

    fn hand_axes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JointLimits, D::Error> {
        JointLimitsFile::deserialize(deserializer).map(|file| file.or_defaults(HAND_LIMITS))
    }

    pub fn table(&self) -> JointLimitTable {
        JointLimitTable { neck: self.neck, upper_arm: self.upper_arm, lower_arm: self.lower_arm, hand: self.hand }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            neck: Self::default_neck(),
            upper_arm: Self::default_upper_arm(),
            lower_arm: Self::default_lower_arm(),
            hand: Self::default_hand(),
        }
    }
}

impl TrackingConfig {
    const fn default_visibility_threshold() -> f32 {
        DEFAULT_VISIBILITY_THRESHOLD
    }

    const fn default_amplitude() -> f32 {
        1.0
    }

    const fn default_neck_attenuation() -> f32 {
        DEFAULT_NECK_ATTENUATION
    }

    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            visibility_threshold: self.visibility_threshold,
            arm_amplitude: self.arm_amplitude,
            hand_amplitude: self.hand_amplitude,
            neck_attenuation: self.neck_attenuation,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: Self::default_visibility_threshold(),
            arm_amplitude: Self::default_amplitude(),
            hand_amplitude: Self::default_amplitude(),
            neck_attenuation: Self::default_neck_attenuation(),
        }
    }
}

impl IdleConfig {
    const fn default_interval_seconds() -> f32 {
        DEFAULT_IDLE_INTERVAL_SECONDS
    }

    fn default_speaking_clip() -> String {
        "talking".to_string()
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            interval_seconds: Self::default_interval_seconds(),
            clips: Vec::new(),
            speaking_clip: Self::default_speaking_clip(),
            seed: None,
        }
    }
}

impl ExpressionConfig {
    const fn default_rate() -> f32 {
        6.0
    }

    const fn default_viseme_frequency() -> f32 {
        8.0
    }

    const fn default_viseme_modulation() -> f32 {
        12.0
    }

    const fn default_viseme_floor() -> f32 {
        0.6
    }

    const fn default_viseme_swing() -> f32 {
        0.3
    }

    pub fn settings(&self) -> ExpressionSettings {
        ExpressionSettings {
            attack_rate: self.attack_rate,
            release_rate: self.release_rate,
            viseme_frequency: self.viseme_frequency,
            viseme_modulation: self.viseme_modulation,
            viseme_floor: self.viseme_floor,
            viseme_swing: self.viseme_swing,
        }
    }
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            attack_rate: Self::default_rate(),
            release_rate: Self::default_rate(),
            viseme_frequency: Self::default_viseme_frequency(),
            viseme_modulation: Self::default_viseme_modulation(),
            viseme_floor: Self::default_viseme_floor(),
            viseme_swing: Self::default_viseme_swing(),
        }
    }
}

impl MotionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut cfg: MotionConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        for fix in cfg.validate() {
            log::warn!(target: "motion::config", "{}: {}", path.display(), fix);
        }
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!(target: "motion::config", "Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &MotionConfigOverrides) {
        if let Some(interval) = overrides.idle_interval {
            self.idle.interval_seconds = interval;
        }
        if let Some(threshold) = overrides.visibility_threshold {
            self.tracking.visibility_threshold = threshold;
        }
        if let Some(damping) = overrides.arm_damping {
            self.smoothing.arm = damping;
        }
        if let Some(damping) = overrides.hand_damping {
            self.smoothing.hand = damping;
        }
        if let Some(seed) = overrides.seed {
            self.idle.seed = Some(seed);
        }
        for fix in self.validate() {
            log::warn!(target: "motion::config", "override: {}", fix);
        }
    }

    /// Repair out-of-range values in place and describe each repair.
    pub fn validate(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();

        let defaults = SmoothingConfig::default();
        let damping = [
            ("smoothing.neck", &mut self.smoothing.neck, defaults.neck),
            ("smoothing.arm", &mut self.smoothing.arm, defaults.arm),
            ("smoothing.hand", &mut self.smoothing.hand, defaults.hand),
            ("smoothing.finger", &mut self.smoothing.finger, defaults.finger),
        ];
        for (name, value, fallback) in damping {
            if !value.is_finite() || *value <= 0.0 {
                fixes.push(format!("{name} {value} must be in (0, 1]; using {fallback}"));
                *value = fallback;
            } else if *value > 1.0 {
                fixes.push(format!("{name} {value} exceeds 1; clamped"));
                *value = 1.0;
            }
        }

        let limit_defaults = LimitsConfig::default();
        let limits = [
            ("limits.neck", &mut self.limits.neck, limit_defaults.neck),
            ("limits.upper_arm", &mut self.limits.upper_arm, limit_defaults.upper_arm),
            ("limits.lower_arm", &mut self.limits.lower_arm, limit_defaults.lower_arm),
            ("limits.hand", &mut self.limits.hand, limit_defaults.hand),
        ];
        for (name, value, fallback) in limits {
            let repaired = value.repaired(fallback);
            if repaired != *value {
                fixes.push(format!("{name} had inverted or non-finite ranges; repaired"));
                *value = repaired;
            }
        }

        let threshold = &mut self.tracking.visibility_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(threshold) {
            let fallback = if threshold.is_finite() { threshold.clamp(0.0, 1.0) } else { DEFAULT_VISIBILITY_THRESHOLD };
            fixes.push(format!("tracking.visibility_threshold {threshold} outside [0, 1]; using {fallback}"));
            *threshold = fallback;
        }
        let tracking_defaults = TrackingConfig::default();
        let gains = [
            ("tracking.arm_amplitude", &mut self.tracking.arm_amplitude, tracking_defaults.arm_amplitude),
            ("tracking.hand_amplitude", &mut self.tracking.hand_amplitude, tracking_defaults.hand_amplitude),
            ("tracking.neck_attenuation", &mut self.tracking.neck_attenuation, tracking_defaults.neck_attenuation),
        ];
        for (name, value, fallback) in gains {
            if !value.is_finite() || *value < 0.0 {
                fixes.push(format!("{name} {value} must be finite and non-negative; using {fallback}"));
                *value = fallback;
            }
        }

        let interval = &mut self.idle.interval_seconds;
        if !interval.is_finite() || *interval <= 0.0 {
            fixes.push(format!("idle.interval_seconds {interval} must be positive; using {DEFAULT_IDLE_INTERVAL_SECONDS}"));
            *interval = DEFAULT_IDLE_INTERVAL_SECONDS;
        }

        let expression_defaults = ExpressionConfig::default();
        let rates = [
            ("expression.attack_rate", &mut self.expression.attack_rate, expression_defaults.attack_rate),
            ("expression.release_rate", &mut self.expression.release_rate, expression_defaults.release_rate),
            ("expression.viseme_frequency", &mut self.expression.viseme_frequency, expression_defaults.viseme_frequency),
            (
                "expression.viseme_modulation",
                &mut self.expression.viseme_modulation,
                expression_defaults.viseme_modulation,
            ),
        ];
        for (name, value, fallback) in rates {
            if !value.is_finite() || *value <= 0.0 {
                fixes.push(format!("{name} {value} must be positive; using {fallback}"));
                *value = fallback;
            }
        }
        let floor = self.expression.viseme_floor;
        let swing = self.expression.viseme_swing;
        if !floor.is_finite() || !swing.is_finite() || floor < 0.0 || swing < 0.0 || floor + swing > 1.0 {
            fixes.push(format!("expression viseme floor {floor} + swing {swing} must stay within [0, 1]; using defaults"));
            self.expression.viseme_floor = expression_defaults.viseme_floor;
            self.expression.viseme_swing = expression_defaults.viseme_swing;
        }

        fixes
    }
}

impl MotionConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.idle_interval.is_none()
            && self.visibility_threshold.is_none()
            && self.arm_damping.is_none()
            && self.hand_damping.is_none()
            && self.seed.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.idle_interval.is_some() {
            fields.push("idle_interval");
        }
        if self.visibility_threshold.is_some() {
            fields.push("visibility");
        }
        if self.arm_damping.is_some() {
            fields.push("arm_damping");
        }
        if self.hand_damping.is_some() {
            fields.push("hand_damping");
        }
        if self.seed.is_some() {
            fields.push("seed");
        }
        fields
    }
}
