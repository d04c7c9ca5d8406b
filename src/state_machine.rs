use crate::clip_registry::{ClipRegistry, ClipStatus};
use crate::time::IntervalTimer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

pub const DEFAULT_IDLE_INTERVAL_SECONDS: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerformanceState {
    #[default]
    Resting,
    Speaking,
}

/// Clip identifiers the state machine chooses from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipPools {
    pub idle: Vec<Arc<str>>,
    pub speaking: Arc<str>,
}

impl ClipPools {
    pub fn new<I, S>(idle: I, speaking: impl Into<Arc<str>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self { idle: idle.into_iter().map(Into::into).collect(), speaking: speaking.into() }
    }

    /// Idle pool plus the speaking clip, first occurrence wins.
    pub fn preload_pool(&self) -> Vec<Arc<str>> {
        let mut pool: Vec<Arc<str>> = Vec::with_capacity(self.idle.len() + 1);
        for key in self.idle.iter().chain(std::iter::once(&self.speaking)) {
            if !pool.iter().any(|existing| existing == key) {
                pool.push(Arc::clone(key));
            }
        }
        pool
    }
}

/// The two identifiers a host should keep resident.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipResidency {
    pub active: Option<Arc<str>>,
    pub next: Option<Arc<str>>,
}

impl ClipResidency {
    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.active.iter().chain(self.next.iter())
    }
}

/// Immutable snapshot of playback. The state machine swaps in a whole new
/// snapshot per change, so a reader never sees one clip's id with another's start time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub state: PerformanceState,
    /// Clip the machine has chosen.
    pub active_clip: Option<Arc<str>>,
    pub active_clip_start: f64,
    pub next_clip: Option<Arc<str>>,
    /// Clip actually shown: the active clip once ready, otherwise the last one that was.
    pub displayed_clip: Option<Arc<str>>,
    pub displayed_clip_start: f64,
    /// Registry status of the active clip; `None` when the registry has never heard of it.
    pub active_status: Option<ClipStatus>,
    /// Bumped on every selection, including an idle re-pick of the same clip.
    pub generation: u64,
}

impl PlaybackState {
    pub fn residency(&self) -> ClipResidency {
        ClipResidency { active: self.active_clip.clone(), next: self.next_clip.clone() }
    }

    /// Seconds into the displayed clip at `now`.
    pub fn displayed_time(&self, now: f64) -> f32 {
        (now - self.displayed_clip_start).max(0.0) as f32
    }
}

pub struct AnimationStateMachine<R: Rng = StdRng> {
    pools: ClipPools,
    rng: R,
    timer: IntervalTimer,
    started: bool,
    playback: Arc<PlaybackState>,
}

impl AnimationStateMachine<StdRng> {
    pub fn new(pools: ClipPools, idle_interval_seconds: f32) -> Self {
        Self::with_rng(pools, idle_interval_seconds, StdRng::from_entropy())
    }

    pub fn seeded(pools: ClipPools, idle_interval_seconds: f32, seed: u64) -> Self {
        Self::with_rng(pools, idle_interval_seconds, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> AnimationStateMachine<R> {
    pub fn with_rng(pools: ClipPools, idle_interval_seconds: f32, rng: R) -> Self {
        Self {
            pools,
            rng,
            timer: IntervalTimer::new(idle_interval_seconds),
            started: false,
            playback: Arc::new(PlaybackState::default()),
        }
    }

    pub fn pools(&self) -> &ClipPools {
        &self.pools
    }

    pub fn timer(&self) -> &IntervalTimer {
        &self.timer
    }

    pub fn snapshot(&self) -> Arc<PlaybackState> {
        Arc::clone(&self.playback)
    }

    pub fn state(&self) -> PerformanceState {
        self.playback.state
    }

    /// Advance to `now` (session seconds). Never blocks on clip availability.
    pub fn update(&mut self, audio_playing: bool, now: f64, registry: &ClipRegistry) -> Arc<PlaybackState> {
        let mut next = (*self.playback).clone();
        let mut changed = false;

        let wanted = if audio_playing { PerformanceState::Speaking } else { PerformanceState::Resting };
        if !self.started || wanted != next.state {
            self.started = true;
            match wanted {
                PerformanceState::Speaking => self.enter_speaking(&mut next, now),
                PerformanceState::Resting => self.enter_resting(&mut next, now),
            }
            changed = true;
        } else if next.state == PerformanceState::Resting && self.timer.poll(now) {
            let clip = self.pick_idle();
            log::debug!(target: "motion::state", "idle interval elapsed; playing {:?}", clip);
            self.select(&mut next, clip, now);
            changed = true;
        }

        let status = next.active_clip.as_deref().and_then(|key| registry.status(key)).cloned();
        if status != next.active_status {
            if let Some(ClipStatus::Failed(reason)) = &status {
                log::warn!(
                    target: "motion::state",
                    "active clip {:?} failed ({}); holding {:?}",
                    next.active_clip,
                    reason,
                    next.displayed_clip
                );
            }
            next.active_status = status;
            changed = true;
        }
        let ready = next.active_status.as_ref().is_some_and(ClipStatus::is_ready);
        if ready
            && (next.displayed_clip != next.active_clip || next.displayed_clip_start != next.active_clip_start)
        {
            next.displayed_clip = next.active_clip.clone();
            next.displayed_clip_start = next.active_clip_start;
            changed = true;
        }

        if changed {
            self.playback = Arc::new(next);
        }
        self.snapshot()
    }

    /// Cancel the idle timer and forget all playback; the next update starts fresh.
    pub fn shutdown(&mut self) {
        self.timer.cancel();
        self.started = false;
        self.playback = Arc::new(PlaybackState::default());
    }

    fn enter_speaking(&mut self, next: &mut PlaybackState, now: f64) {
        self.timer.cancel();
        next.state = PerformanceState::Speaking;
        log::debug!(target: "motion::state", "entering speaking with {}", self.pools.speaking);
        let clip = Some(Arc::clone(&self.pools.speaking));
        self.select(next, clip, now);
    }

    fn enter_resting(&mut self, next: &mut PlaybackState, now: f64) {
        next.state = PerformanceState::Resting;
        let clip = self.pick_idle();
        log::debug!(target: "motion::state", "entering resting with {:?}", clip);
        self.select(next, clip, now);
        self.timer.arm(now);
    }

    fn select(&mut self, next: &mut PlaybackState, clip: Option<Arc<str>>, now: f64) {
        next.next_clip = self.pick_next(clip.as_ref());
        next.active_clip = clip;
        next.active_clip_start = now;
        next.generation = next.generation.wrapping_add(1);
    }

    /// Uniform pick from the idle pool; an empty idle pool falls back to the speaking clip.
    fn pick_idle(&mut self) -> Option<Arc<str>> {
        match self.pools.idle.choose(&mut self.rng) {
            Some(clip) => Some(Arc::clone(clip)),
            None => Some(Arc::clone(&self.pools.speaking)),
        }
    }

    /// Uniform pick from the preload pool excluding `active`; only a single-clip pool repeats it.
    fn pick_next(&mut self, active: Option<&Arc<str>>) -> Option<Arc<str>> {
        let pool = self.pools.preload_pool();
        let candidates: Vec<&Arc<str>> = pool.iter().filter(|key| Some(*key) != active).collect();
        match candidates.choose(&mut self.rng) {
            Some(key) => Some(Arc::clone(key)),
            None => pool.first().cloned(),
        }
    }
}
