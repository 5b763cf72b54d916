//! Playback controller for binary search traces.
//!
//! A single-owner state machine over one [`Trace`]:
//!
//! ```text
//! idle ──start──▶ searching ──step/timer──▶ found | not-found
//!                     ▲                          │
//!                     └──────step backward───────┘
//! ```
//!
//! User actions apply synchronously. Timed behaviour (auto-advance, the
//! loop cooldown and the restart delay) goes through the virtual
//! [`Scheduler`]; nothing happens until the owner moves the clock with
//! [`Playback::advance_by`] or [`Playback::advance_to`].
//!
//! # Invariants
//!
//! 1. At most one timer per [`TimerKind`] is armed.
//! 2. A timer armed before a reset, retarget or regeneration never fires:
//!    it is cancelled, and its epoch no longer matches if it somehow does.
//! 3. `current_step` is `None` or a valid index into the trace.

use std::collections::VecDeque;

use bisect_search::{
    generate, middle, search_trace, Direction, SeededRng, Sequence, Step, Target, Trace,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{SettingChange, Settings};
use crate::error::{Error, Result};
use crate::events::{PlaybackEvent, RetargetCause, SearchSnapshot};
use crate::scheduler::{Scheduler, TimerId, TimerKind};

/// Search status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStatus {
    /// No step selected.
    #[default]
    Idle,
    /// Somewhere before the terminal step.
    Searching,
    /// On a `found` step.
    Found,
    /// On the terminal `miss` step, or started with nothing to search.
    NotFound,
}

impl SearchStatus {
    /// Whether the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchStatus::Found | SearchStatus::NotFound)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchStatus::Idle => "Awaiting input",
            SearchStatus::Searching => "Searching…",
            SearchStatus::Found => "Target located!",
            SearchStatus::NotFound => "Target not present",
        }
    }
}

/// Mutable playback state, owned by [`Playback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    pub status: SearchStatus,
    pub current_step: Option<usize>,
    pub is_playing: bool,
    pub pending_restart: bool,
}

impl PlaybackState {
    /// `{idle, -1, false, false}`
    pub const IDLE: Self = Self {
        status: SearchStatus::Idle,
        current_step: None,
        is_playing: false,
        pending_restart: false,
    };

    /// Current step as a signed index, `-1` when none is selected.
    pub fn step_index(&self) -> i64 {
        self.current_step.map_or(-1, |i| i as i64)
    }
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    id: TimerId,
    epoch: u64,
    /// Step selected when armed.
    step: Option<usize>,
}

const TIMER_SLOTS: usize = 3;

/// Undrained events kept before the oldest are dropped.
pub const EVENT_BACKLOG: usize = 1024;

fn slot_of(kind: TimerKind) -> usize {
    match kind {
        TimerKind::Advance => 0,
        TimerKind::Cooldown => 1,
        TimerKind::StartDelay => 2,
    }
}

/// Playback controller.
#[derive(Debug)]
pub struct Playback {
    settings: Settings,
    sequence: Sequence,
    target: Target,
    trace: Trace,
    state: PlaybackState,
    scheduler: Scheduler,
    /// Bumped whenever outstanding timers are invalidated wholesale.
    epoch: u64,
    timers: [Option<ArmedTimer>; TIMER_SLOTS],
    events: VecDeque<PlaybackEvent>,
}

impl Playback {
    /// Create a controller over a freshly generated sequence, targeting its
    /// middle element.
    pub fn new(settings: Settings) -> Self {
        let settings = settings.sanitized();
        let sequence = generate(
            settings.array_size,
            settings.min_value,
            settings.max_value,
            settings.seed,
        );
        Self::with_sequence(settings, sequence)
    }

    /// Create a controller over a given sequence, targeting its middle element.
    pub fn with_sequence(settings: Settings, sequence: Sequence) -> Self {
        let settings = settings.sanitized();
        let target = Target::Whole(middle(&sequence).unwrap_or(settings.min_value));
        let trace = search_trace(&sequence, target, settings.variant);
        Self {
            settings,
            sequence,
            target,
            trace,
            state: PlaybackState::IDLE,
            scheduler: Scheduler::new(),
            epoch: 0,
            timers: [None; TIMER_SLOTS],
            events: VecDeque::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// The selected step, if any.
    pub fn current_step(&self) -> Option<&Step> {
        self.state.current_step.and_then(|i| self.trace.get(i))
    }

    /// The step after the selected one ("peek next").
    pub fn next_step(&self) -> Option<&Step> {
        let next = self.state.current_step.map_or(0, |i| i + 1);
        self.trace.get(next)
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    /// When the next armed timer is due.
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Serializable status for the renderer.
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus::from(self)
    }

    /// Sequence, target and trace as one value.
    pub fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            sequence: self.sequence.clone(),
            target: self.target,
            variant: self.settings.variant,
            trace: self.trace.clone(),
        }
    }

    /// Take all events recorded since the last drain.
    ///
    /// At most [`EVENT_BACKLOG`] undrained events are kept; older ones are
    /// dropped first.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain(..).collect()
    }

    // ── User actions ────────────────────────────────────────────────────

    /// Begin a run at step 0. With nothing to search, go straight to `not-found`.
    pub fn start(&mut self) {
        if self.trace.is_empty() {
            self.set_status(SearchStatus::NotFound);
        } else {
            self.begin();
        }
        self.refresh_timers();
    }

    /// Select the next step. Returns false at the last step.
    pub fn step_forward(&mut self) -> bool {
        let Some(last) = self.trace.last_index() else {
            return false;
        };
        let next = match self.state.current_step {
            Some(i) if i >= last => return false,
            Some(i) => i + 1,
            None => 0,
        };
        self.set_status(SearchStatus::Searching);
        self.move_to(next);
        self.refresh_timers();
        true
    }

    /// Select the previous step. Returns false at or before step 0.
    pub fn step_backward(&mut self) -> bool {
        let prev = match self.state.current_step {
            Some(i) if i > 0 => i - 1,
            _ => return false,
        };
        self.set_status(SearchStatus::Searching);
        self.move_to(prev);
        self.refresh_timers();
        true
    }

    /// Pause or resume auto-advance. No-op once the run is over.
    pub fn toggle_play(&mut self) -> bool {
        if self.trace.is_empty() || self.state.status.is_terminal() {
            return false;
        }
        self.state.is_playing = !self.state.is_playing;
        let event = PlaybackEvent::PlayToggled {
            is_playing: self.state.is_playing,
            at_ms: self.now_ms(),
        };
        self.emit(event);
        self.refresh_timers();
        true
    }

    /// Back to idle, keeping the trace.
    pub fn reset(&mut self) {
        self.invalidate();
        self.emit(PlaybackEvent::Reset { at_ms: self.now_ms() });
    }

    /// Search for a new target in the same sequence.
    pub fn retarget(&mut self, target: i64) {
        self.apply_target(Target::Whole(target), RetargetCause::Manual);
    }

    /// Parse user input and retarget. Any finite number is accepted; a
    /// non-whole one simply misses. Bad input leaves everything untouched.
    pub fn submit_target(&mut self, input: &str) -> Result<Target> {
        let target = Target::parse(input).ok_or_else(|| {
            warn!(input, "rejected target input");
            Error::InvalidTarget(input.to_string())
        })?;
        self.apply_target(target, RetargetCause::Manual);
        Ok(target)
    }

    /// Generate a new sequence from `seed` and recenter the target.
    pub fn regenerate(&mut self, seed: u32) {
        self.update_settings(SettingChange::Seed(i64::from(seed)));
    }

    /// Apply a single settings change.
    pub fn update_settings(&mut self, change: SettingChange) {
        let mut next = self.settings.clone();
        next.apply(change);
        self.replace_settings(next);
    }

    /// Install a new settings snapshot.
    ///
    /// Sequence-shaping changes regenerate the sequence, a variant change
    /// rebuilds the trace; both reset playback. Timing changes re-arm the
    /// affected timers.
    pub fn replace_settings(&mut self, settings: Settings) {
        let prev = std::mem::replace(&mut self.settings, settings.sanitized());

        if prev.reshapes(&self.settings) {
            self.reload_sequence();
        } else if prev.variant != self.settings.variant {
            self.trace = search_trace(&self.sequence, self.target, self.settings.variant);
            self.invalidate();
            debug!(variant = ?self.settings.variant, "variant changed");
        } else {
            if prev.step_delay != self.settings.step_delay {
                self.disarm(TimerKind::Advance);
                self.disarm(TimerKind::Cooldown);
            }
            if prev.ease_motion != self.settings.ease_motion {
                self.disarm(TimerKind::StartDelay);
            }
            if prev.auto_play != self.settings.auto_play
                && self.state.status == SearchStatus::Searching
            {
                self.state.is_playing = self.settings.auto_play;
                let event = PlaybackEvent::PlayToggled {
                    is_playing: self.state.is_playing,
                    at_ms: self.now_ms(),
                };
                self.emit(event);
            }
        }
        self.refresh_timers();
    }

    // ── Clock ───────────────────────────────────────────────────────────

    /// Move the clock forward by `ms`, firing due timers in order.
    pub fn advance_by(&mut self, ms: u64) {
        self.advance_to(self.scheduler.now_ms() + ms);
    }

    /// Move the clock to `until_ms`, firing due timers in order.
    pub fn advance_to(&mut self, until_ms: u64) {
        while let Some((id, kind)) = self.scheduler.pop_due(until_ms) {
            self.fire(id, kind);
        }
        self.scheduler.settle(until_ms);
    }

    fn fire(&mut self, id: TimerId, kind: TimerKind) {
        let slot = slot_of(kind);
        let armed = match self.timers[slot] {
            Some(armed) if armed.id == id => armed,
            _ => {
                debug!(?id, ?kind, "ignoring unknown timer");
                return;
            }
        };
        self.timers[slot] = None;
        if armed.epoch != self.epoch {
            debug!(?id, ?kind, "ignoring timer from a previous epoch");
            return;
        }

        debug!(?kind, at_ms = self.now_ms(), "timer fired");
        match kind {
            TimerKind::Advance => self.on_advance(),
            TimerKind::Cooldown => self.on_cooldown(armed.step.unwrap_or(0)),
            TimerKind::StartDelay => self.on_start_delay(),
        }
        self.refresh_timers();
    }

    fn on_advance(&mut self) {
        if self.wants_advance() {
            let next = self.state.current_step.map_or(0, |i| i + 1);
            self.move_to(next);
        }
    }

    fn on_cooldown(&mut self, step_index: usize) {
        let target = loop_target(&self.sequence, &self.settings, step_index);
        self.apply_target(Target::Whole(target), RetargetCause::AutoLoop);
    }

    fn on_start_delay(&mut self) {
        if !self.state.pending_restart {
            return;
        }
        if self.trace.is_empty() {
            self.state.pending_restart = false;
            self.set_status(SearchStatus::NotFound);
        } else {
            self.begin();
        }
    }

    // ── Transitions ─────────────────────────────────────────────────────

    fn begin(&mut self) {
        self.cancel_timers();
        self.state.pending_restart = false;
        self.emit(PlaybackEvent::Started {
            target: self.target,
            at_ms: self.now_ms(),
        });
        self.set_status(SearchStatus::Searching);
        self.state.is_playing = self.settings.auto_play;
        self.move_to(0);
    }

    /// Select `index` and derive the status from its step.
    fn move_to(&mut self, index: usize) {
        let Some(&step) = self.trace.get(index) else {
            return;
        };
        self.state.current_step = Some(index);
        self.emit(PlaybackEvent::StepChanged {
            index,
            step,
            at_ms: self.now_ms(),
        });

        let is_last = self.trace.last_index() == Some(index);
        match step.direction {
            Direction::Found => {
                self.set_status(SearchStatus::Found);
                self.state.is_playing = false;
            }
            Direction::Miss if is_last => {
                self.set_status(SearchStatus::NotFound);
                self.state.is_playing = false;
            }
            _ => self.set_status(SearchStatus::Searching),
        }
    }

    /// Entering `searching` from any other status re-applies auto-play.
    fn set_status(&mut self, status: SearchStatus) {
        let from = self.state.status;
        if from == status {
            return;
        }
        self.state.status = status;
        if status == SearchStatus::Searching {
            self.state.is_playing = self.settings.auto_play;
        }
        debug!(?from, to = ?status, "status changed");
        self.emit(PlaybackEvent::StatusChanged {
            from,
            to: status,
            at_ms: self.now_ms(),
        });
    }

    fn apply_target(&mut self, target: Target, cause: RetargetCause) {
        self.target = target;
        self.trace = search_trace(&self.sequence, target, self.settings.variant);
        self.invalidate();
        info!(target = %target, ?cause, steps = self.trace.len(), "retargeted");
        self.emit(PlaybackEvent::Retargeted {
            target,
            cause,
            at_ms: self.now_ms(),
        });
        if self.settings.auto_play {
            self.state.pending_restart = true;
            self.emit(PlaybackEvent::RestartArmed {
                delay_ms: self.settings.restart_delay_ms(),
                at_ms: self.now_ms(),
            });
        }
        self.refresh_timers();
    }

    fn reload_sequence(&mut self) {
        let s = &self.settings;
        self.sequence = generate(s.array_size, s.min_value, s.max_value, s.seed);
        self.target = Target::Whole(middle(&self.sequence).unwrap_or(s.min_value));
        self.trace = search_trace(&self.sequence, self.target, s.variant);
        self.invalidate();
        info!(
            seed = self.settings.seed,
            len = self.sequence.len(),
            target = %self.target,
            "sequence regenerated"
        );
        self.emit(PlaybackEvent::Regenerated {
            seed: self.settings.seed,
            len: self.sequence.len(),
            target: self.target,
            at_ms: self.now_ms(),
        });
    }

    /// Cancel every timer, start a new epoch, return to idle.
    fn invalidate(&mut self) {
        self.cancel_timers();
        self.epoch += 1;
        self.state = PlaybackState::IDLE;
    }

    // ── Timers ──────────────────────────────────────────────────────────

    fn wants_advance(&self) -> bool {
        let Some(last) = self.trace.last_index() else {
            return false;
        };
        self.state.status == SearchStatus::Searching
            && self.state.is_playing
            && self.state.current_step.map_or(true, |i| i < last)
    }

    fn at_terminal_step(&self) -> bool {
        match (self.state.current_step, self.trace.last_index()) {
            (Some(i), Some(last)) if i == last => self.trace[i].direction.is_terminal(),
            _ => false,
        }
    }

    /// Arm or cancel each timer to match the current state.
    fn emit(&mut self, event: PlaybackEvent) {
        if self.events.len() == EVENT_BACKLOG {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn refresh_timers(&mut self) {
        let advance = self.wants_advance();
        self.sync_timer(TimerKind::Advance, advance, self.settings.step_delay);

        let cooldown = self.settings.loop_on_complete && self.at_terminal_step();
        self.sync_timer(TimerKind::Cooldown, cooldown, self.settings.cooldown_ms());

        let restart = self.state.pending_restart;
        self.sync_timer(TimerKind::StartDelay, restart, self.settings.restart_delay_ms());
    }

    /// Advance and cooldown timers are tied to the step they were armed on;
    /// the start delay only to the epoch.
    fn sync_timer(&mut self, kind: TimerKind, wanted: bool, delay_ms: u64) {
        let slot = slot_of(kind);
        let step = self.state.current_step;
        let epoch = self.epoch;

        let current = self.timers[slot];
        let still_valid = current.is_some_and(|armed| {
            armed.epoch == epoch && (kind == TimerKind::StartDelay || armed.step == step)
        });
        if wanted && still_valid {
            return;
        }

        if let Some(armed) = self.timers[slot].take() {
            self.scheduler.cancel(armed.id);
        }
        if wanted {
            let id = self.scheduler.schedule(kind, delay_ms);
            debug!(?kind, delay_ms, "timer armed");
            self.timers[slot] = Some(ArmedTimer { id, epoch, step });
        }
    }

    fn disarm(&mut self, kind: TimerKind) {
        if let Some(armed) = self.timers[slot_of(kind)].take() {
            self.scheduler.cancel(armed.id);
        }
    }

    fn cancel_timers(&mut self) {
        for slot in self.timers.iter_mut() {
            if let Some(armed) = slot.take() {
                self.scheduler.cancel(armed.id);
            }
        }
    }
}

/// Pick the next looped target.
///
/// Pure in `(settings.seed, step_index)`: draws an existing element
/// uniformly, falling back to a value in `[min_value, max_value]` when the
/// sequence is empty.
pub fn loop_target(values: &[i64], settings: &Settings, step_index: usize) -> i64 {
    let seed = settings
        .seed
        .wrapping_mul(3)
        .wrapping_add(7)
        .wrapping_add(step_index as u32);
    let mut rng = SeededRng::new(seed);
    let index = (rng.next_f64() * values.len() as f64).floor() as usize;
    values.get(index).copied().unwrap_or_else(|| {
        let span = settings.max_value as f64 - settings.min_value as f64;
        (settings.min_value as f64 + rng.next_f64() * span + 0.5).floor() as i64
    })
}

/// Playback status for sending to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub status: SearchStatus,
    pub label: String,
    /// `-1` when no step is selected.
    pub current_step_index: i64,
    pub current_step: Option<Step>,
    pub next_step: Option<Step>,
    pub is_playing: bool,
    pub pending_restart: bool,
    pub target: Target,
    pub total_steps: usize,
    pub progress: f64,
    pub now_ms: u64,
}

impl From<&Playback> for PlaybackStatus {
    fn from(playback: &Playback) -> Self {
        let state = playback.state;
        let total_steps = playback.trace.len();
        let progress = match state.current_step {
            Some(i) if total_steps > 0 => (i + 1) as f64 / total_steps as f64,
            _ => 0.0,
        };
        Self {
            status: state.status,
            label: state.status.label().to_string(),
            current_step_index: state.step_index(),
            current_step: playback.current_step().copied(),
            next_step: playback.next_step().copied(),
            is_playing: state.is_playing,
            pending_restart: state.pending_restart,
            target: playback.target,
            total_steps,
            progress,
            now_ms: playback.now_ms(),
        }
    }
}
