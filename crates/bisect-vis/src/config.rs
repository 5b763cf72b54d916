//! Playback configuration snapshot.
//!
//! [`Settings`] is an immutable value as far as the controller is concerned:
//! every change produces a new snapshot, and the controller decides which
//! parts of its state the difference invalidates.

use bisect_search::Variant;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Allowed sequence lengths.
pub const ARRAY_SIZE_RANGE: (i64, i64) = (4, 36);
/// Allowed auto-advance delays in milliseconds.
pub const STEP_DELAY_RANGE: (i64, i64) = (120, 2000);
/// Seeds wrap at this modulus.
pub const SEED_MODULUS: i64 = 100_000;
/// Minimum gap kept between `min_value` and `max_value`.
pub const MIN_VALUE_GAP: i64 = 2;

/// Shortest pause between a finished run and the next looped target.
const MIN_COOLDOWN_MS: u64 = 220;
/// Extra settle time added to the step delay before looping.
const COOLDOWN_PADDING_MS: u64 = 120;
const RESTART_DELAY_MS: u64 = 160;
const EASED_RESTART_DELAY_MS: u64 = 80;

/// Configuration record supplied by the settings collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawSettings")]
pub struct Settings {
    pub array_size: usize,
    pub min_value: i64,
    pub max_value: i64,
    pub seed: u32,
    /// Auto-advance delay in milliseconds.
    pub step_delay: u64,
    pub auto_play: bool,
    pub loop_on_complete: bool,
    pub variant: Variant,
    /// Reduced motion; only shortens the restart delay.
    pub ease_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            array_size: 12,
            min_value: 2,
            max_value: 90,
            seed: 9473,
            step_delay: 650,
            auto_play: true,
            loop_on_complete: false,
            variant: Variant::Iterative,
            ease_motion: false,
        }
    }
}

/// A single-field update, clamped the way the settings panel clamps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "camelCase")]
pub enum SettingChange {
    ArraySize(i64),
    /// Capped at `max_value - 2`.
    MinValue(i64),
    /// Floored at `min_value + 2`.
    MaxValue(i64),
    Seed(i64),
    StepDelay(i64),
    AutoPlay(bool),
    LoopOnComplete(bool),
    Variant(Variant),
    EaseMotion(bool),
}

impl Settings {
    /// Parse a stored record. Missing keys fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `BISECT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(v) = parse_int(&var, "BISECT_ARRAY_SIZE")? {
            settings.apply(SettingChange::ArraySize(v));
        }
        if let Some(v) = parse_int(&var, "BISECT_MAX_VALUE")? {
            settings.apply(SettingChange::MaxValue(v));
        }
        if let Some(v) = parse_int(&var, "BISECT_MIN_VALUE")? {
            settings.apply(SettingChange::MinValue(v));
        }
        if let Some(v) = parse_int(&var, "BISECT_SEED")? {
            settings.apply(SettingChange::Seed(v));
        }
        if let Some(v) = parse_int(&var, "BISECT_STEP_DELAY")? {
            settings.apply(SettingChange::StepDelay(v));
        }
        if let Some(v) = parse_flag(&var, "BISECT_AUTO_PLAY")? {
            settings.apply(SettingChange::AutoPlay(v));
        }
        if let Some(v) = parse_flag(&var, "BISECT_LOOP_ON_COMPLETE")? {
            settings.apply(SettingChange::LoopOnComplete(v));
        }
        if let Some(v) = parse_flag(&var, "BISECT_EASE_MOTION")? {
            settings.apply(SettingChange::EaseMotion(v));
        }
        if let Some(raw) = var("BISECT_VARIANT") {
            let variant = match raw.trim().to_ascii_lowercase().as_str() {
                "iterative" => Variant::Iterative,
                "recursive" => Variant::Recursive,
                _ => {
                    return Err(Error::InvalidSetting {
                        key: "BISECT_VARIANT",
                        value: raw,
                    })
                }
            };
            settings.apply(SettingChange::Variant(variant));
        }

        Ok(settings)
    }

    /// Apply one change with per-key clamping.
    pub fn apply(&mut self, change: SettingChange) {
        match change {
            SettingChange::ArraySize(v) => self.array_size = clamp_array_size(v),
            SettingChange::MinValue(v) => {
                let min = v.min(self.max_value.saturating_sub(MIN_VALUE_GAP));
                (self.min_value, self.max_value) = restore_gap(min, self.max_value);
            }
            SettingChange::MaxValue(v) => {
                let max = v.max(self.min_value.saturating_add(MIN_VALUE_GAP));
                (self.min_value, self.max_value) = restore_gap(self.min_value, max);
            }
            SettingChange::Seed(v) => self.seed = wrap_seed(v),
            SettingChange::StepDelay(v) => self.step_delay = clamp_step_delay(v),
            SettingChange::AutoPlay(v) => self.auto_play = v,
            SettingChange::LoopOnComplete(v) => self.loop_on_complete = v,
            SettingChange::Variant(v) => self.variant = v,
            SettingChange::EaseMotion(v) => self.ease_motion = v,
        }
    }

    /// Copy of this snapshot with every clamp enforced.
    ///
    /// A `min_value` too close to `max_value` raises `max_value`.
    pub fn sanitized(&self) -> Self {
        let (min_value, max_value) = restore_gap(self.min_value, self.max_value);
        Self {
            array_size: clamp_array_size(self.array_size as i64),
            min_value,
            max_value,
            seed: wrap_seed(i64::from(self.seed)),
            step_delay: clamp_step_delay(self.step_delay as i64),
            ..self.clone()
        }
    }

    /// Whether `other` would generate a different sequence.
    pub fn reshapes(&self, other: &Settings) -> bool {
        self.array_size != other.array_size
            || self.min_value != other.min_value
            || self.max_value != other.max_value
            || self.seed != other.seed
    }

    /// Pause after a terminal step before a looped retarget.
    pub fn cooldown_ms(&self) -> u64 {
        MIN_COOLDOWN_MS.max(self.step_delay + COOLDOWN_PADDING_MS)
    }

    /// Pause between arming a restart and starting the new run.
    pub fn restart_delay_ms(&self) -> u64 {
        if self.ease_motion {
            EASED_RESTART_DELAY_MS
        } else {
            RESTART_DELAY_MS
        }
    }
}

/// Keep `min_value <= max_value - 2`, raising `max_value` where it can and
/// lowering `min_value` only at the top of the `i64` range.
fn restore_gap(min: i64, max: i64) -> (i64, i64) {
    let min = min.min(i64::MAX - MIN_VALUE_GAP);
    (min, max.max(min + MIN_VALUE_GAP))
}

fn clamp_array_size(v: i64) -> usize {
    v.clamp(ARRAY_SIZE_RANGE.0, ARRAY_SIZE_RANGE.1) as usize
}

fn clamp_step_delay(v: i64) -> u64 {
    v.clamp(STEP_DELAY_RANGE.0, STEP_DELAY_RANGE.1) as u64
}

fn wrap_seed(v: i64) -> u32 {
    (v.unsigned_abs() % SEED_MODULUS as u64) as u32
}

fn parse_int(var: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<i64>> {
    var(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::InvalidSetting { key, value: raw.clone() })
        })
        .transpose()
}

fn parse_flag(var: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<bool>> {
    var(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(Error::InvalidSetting { key, value: raw.clone() }),
        })
        .transpose()
}

/// Wire shape accepted on deserialization; values are clamped on conversion.
#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSettings {
    array_size: i64,
    min_value: i64,
    max_value: i64,
    seed: i64,
    step_delay: i64,
    auto_play: bool,
    loop_on_complete: bool,
    variant: Variant,
    ease_motion: bool,
}

impl Default for RawSettings {
    fn default() -> Self {
        let d = Settings::default();
        Self {
            array_size: d.array_size as i64,
            min_value: d.min_value,
            max_value: d.max_value,
            seed: i64::from(d.seed),
            step_delay: d.step_delay as i64,
            auto_play: d.auto_play,
            loop_on_complete: d.loop_on_complete,
            variant: d.variant,
            ease_motion: d.ease_motion,
        }
    }
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let (min_value, max_value) = restore_gap(raw.min_value, raw.max_value);
        Settings {
            array_size: clamp_array_size(raw.array_size),
            min_value,
            max_value,
            seed: wrap_seed(raw.seed),
            step_delay: clamp_step_delay(raw.step_delay),
            auto_play: raw.auto_play,
            loop_on_complete: raw.loop_on_complete,
            variant: raw.variant,
            ease_motion: raw.ease_motion,
        }
    }
}
