use serde::Deserialize;
use std::fmt;

/// Channels within this distance of their target snap onto it.
const SETTLE_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Happy,
    Angry,
    Sad,
    Surprised,
    Relaxed,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 6] =
        [Emotion::Happy, Emotion::Angry, Emotion::Sad, Emotion::Surprised, Emotion::Relaxed, Emotion::Neutral];

    /// Map a cue key onto a channel. Legacy keys alias; anything unknown is neutral.
    pub fn from_key(key: &str) -> Emotion {
        match key.trim().to_ascii_lowercase().as_str() {
            "happy" => Emotion::Happy,
            "angry" => Emotion::Angry,
            "sad" | "sorrow" => Emotion::Sad,
            "surprised" => Emotion::Surprised,
            "relaxed" | "fun" => Emotion::Relaxed,
            _ => Emotion::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Angry => "angry",
            Emotion::Sad => "sad",
            Emotion::Surprised => "surprised",
            Emotion::Relaxed => "relaxed",
            Emotion::Neutral => "neutral",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viseme {
    Aa,
    Ih,
    Ee,
    Oh,
    Ou,
}

impl Viseme {
    /// Cycle order.
    pub const ALL: [Viseme; 5] = [Viseme::Aa, Viseme::Ih, Viseme::Ee, Viseme::Oh, Viseme::Ou];

    pub fn as_str(self) -> &'static str {
        match self {
            Viseme::Aa => "aa",
            Viseme::Ih => "ih",
            Viseme::Ee => "ee",
            Viseme::Oh => "oh",
            Viseme::Ou => "ou",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Viseme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmotionCue {
    pub key: String,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    /// Rise rate per second; overrides the configured emotion rate while rising.
    #[serde(default)]
    pub attack: Option<f32>,
    /// Fall rate per second; overrides the configured emotion rate while falling.
    #[serde(default)]
    pub release: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LipsyncCue {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub aa: Option<f32>,
    #[serde(default)]
    pub ih: Option<f32>,
    #[serde(default)]
    pub ee: Option<f32>,
    #[serde(default)]
    pub oh: Option<f32>,
    #[serde(default)]
    pub ou: Option<f32>,
}

impl LipsyncCue {
    pub fn weight(&self, viseme: Viseme) -> f32 {
        let raw = match viseme {
            Viseme::Aa => self.aa,
            Viseme::Ih => self.ih,
            Viseme::Ee => self.ee,
            Viseme::Oh => self.oh,
            Viseme::Ou => self.ou,
        };
        sanitize_weight(raw.unwrap_or(0.0))
    }
}

/// Transient per-frame performance instruction.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PerformanceCue {
    #[serde(default)]
    pub emotion: Option<EmotionCue>,
    #[serde(default)]
    pub lipsync: Option<LipsyncCue>,
}

const fn default_intensity() -> f32 {
    1.0
}

fn sanitize_weight(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Emotion and viseme blendshape weights, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExpressionChannelSet {
    emotions: [f32; 6],
    visemes: [f32; 5],
}

impl ExpressionChannelSet {
    pub fn emotion(&self, emotion: Emotion) -> f32 {
        self.emotions[emotion.index()]
    }

    pub fn viseme(&self, viseme: Viseme) -> f32 {
        self.visemes[viseme.index()]
    }

    /// Channel lookup by blendshape name.
    pub fn get(&self, name: &str) -> Option<f32> {
        Emotion::ALL
            .iter()
            .find(|emotion| emotion.as_str() == name)
            .map(|emotion| self.emotion(*emotion))
            .or_else(|| Viseme::ALL.iter().find(|v| v.as_str() == name).map(|v| self.viseme(*v)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        let emotions = Emotion::ALL.iter().map(|e| (e.as_str(), self.emotion(*e)));
        let visemes = Viseme::ALL.iter().map(|v| (v.as_str(), self.viseme(*v)));
        emotions.chain(visemes)
    }

    /// Emotion channels currently above zero.
    pub fn active_emotions(&self) -> impl Iterator<Item = Emotion> + '_ {
        Emotion::ALL.into_iter().filter(|emotion| self.emotion(*emotion) > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpressionSettings {
    /// Blend rate per second for an emotion channel rising toward its target.
    pub attack_rate: f32,
    /// Blend rate per second for a channel falling; decay without a cue runs at half this.
    pub release_rate: f32,
    /// Viseme cycle steps per second.
    pub viseme_frequency: f32,
    /// Angular frequency of the weight modulation term.
    pub viseme_modulation: f32,
    pub viseme_floor: f32,
    pub viseme_swing: f32,
}

impl Default for ExpressionSettings {
    fn default() -> Self {
        Self {
            attack_rate: 6.0,
            release_rate: 6.0,
            viseme_frequency: 8.0,
            viseme_modulation: 12.0,
            viseme_floor: 0.6,
            viseme_swing: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpressionDriver {
    settings: ExpressionSettings,
    channels: ExpressionChannelSet,
}

impl ExpressionDriver {
    pub fn new(settings: ExpressionSettings) -> Self {
        Self { settings, channels: ExpressionChannelSet::default() }
    }

    pub fn channels(&self) -> &ExpressionChannelSet {
        &self.channels
    }

    pub fn reset(&mut self) {
        self.channels = ExpressionChannelSet::default();
    }

    /// Advance one frame. `time` is the session clock in seconds, `dt` the frame delta.
    pub fn update(
        &mut self,
        cue: Option<&PerformanceCue>,
        audio_playing: bool,
        time: f64,
        dt: f32,
    ) -> &ExpressionChannelSet {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.update_emotions(cue.and_then(|cue| cue.emotion.as_ref()), dt);

        let lipsync = cue.and_then(|cue| cue.lipsync.as_ref()).filter(|lipsync| lipsync.enabled);
        let base = blend_factor(dt, self.settings.attack_rate);
        self.update_visemes(lipsync, audio_playing, time, base);
        &self.channels
    }

    fn update_emotions(&mut self, cue: Option<&EmotionCue>, dt: f32) {
        let Some(cue) = cue else {
            let factor = blend_factor(dt, self.settings.release_rate) * 0.5;
            for value in &mut self.channels.emotions {
                *value = settle(lerp(*value, 0.0, factor), 0.0);
            }
            return;
        };
        let target_emotion = Emotion::from_key(&cue.key);
        let intensity = sanitize_weight(cue.intensity);
        for emotion in Emotion::ALL {
            let current = self.channels.emotions[emotion.index()];
            let target = if emotion == target_emotion { intensity } else { 0.0 };
            let rate = if target > current {
                cue.attack.unwrap_or(self.settings.attack_rate)
            } else {
                cue.release.unwrap_or(self.settings.release_rate)
            };
            self.channels.emotions[emotion.index()] = settle(lerp(current, target, blend_factor(dt, rate)), target);
        }
    }

    fn update_visemes(&mut self, lipsync: Option<&LipsyncCue>, audio_playing: bool, time: f64, base: f32) {
        if !audio_playing {
            for value in &mut self.channels.visemes {
                *value = settle(lerp(*value, 0.0, base), 0.0);
            }
            return;
        }
        let factor = (base * 2.0).min(1.0);
        let active = viseme_cycle_index(time, self.settings.viseme_frequency);
        for viseme in Viseme::ALL {
            let target = match lipsync {
                Some(lipsync) => lipsync.weight(viseme),
                None if viseme.index() == active => {
                    let swing = (time * f64::from(self.settings.viseme_modulation)).sin().abs() as f32;
                    sanitize_weight(self.settings.viseme_floor + self.settings.viseme_swing * swing)
                }
                None => 0.0,
            };
            let current = self.channels.visemes[viseme.index()];
            self.channels.visemes[viseme.index()] = settle(lerp(current, target, factor), target);
        }
    }
}

/// floor(t · frequency) mod 5; non-finite or negative time reads as the first viseme.
/// Time stays f64 so long sessions keep sub-frame resolution.
pub fn viseme_cycle_index(time: f64, frequency: f32) -> usize {
    let step = (time * f64::from(frequency)).floor();
    if !step.is_finite() || step < 0.0 {
        return 0;
    }
    (step as u64 % Viseme::ALL.len() as u64) as usize
}

/// min(dt · rate, 1); a negative or non-finite rate blends nothing.
fn blend_factor(dt: f32, rate: f32) -> f32 {
    if rate.is_finite() && rate > 0.0 {
        (dt * rate).min(1.0)
    } else {
        0.0
    }
}

fn lerp(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

fn settle(value: f32, target: f32) -> f32 {
    if !value.is_finite() || (value - target).abs() < SETTLE_EPSILON {
        target
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_aliases_resolve() {
        assert_eq!(Emotion::from_key("fun"), Emotion::Relaxed);
        assert_eq!(Emotion::from_key("sorrow"), Emotion::Sad);
        assert_eq!(Emotion::from_key("Happy"), Emotion::Happy);
        assert_eq!(Emotion::from_key("smug"), Emotion::Neutral);
    }

    #[test]
    fn cycle_index_follows_frequency() {
        assert_eq!(viseme_cycle_index(0.0, 8.0), 0);
        assert_eq!(viseme_cycle_index(0.13, 8.0), 1);
        assert_eq!(viseme_cycle_index(0.626, 8.0), 0);
        assert_eq!(viseme_cycle_index(f64::NAN, 8.0), 0);
        assert_eq!(viseme_cycle_index(100_000.124, 8.0), 0);
    }
}
