//! Playback events and snapshots for the renderer.

use bisect_search::{Sequence, Step, Target, Trace, Variant};
use serde::{Deserialize, Serialize};

use crate::playback::SearchStatus;

/// Why the target changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetargetCause {
    /// Submitted by the user.
    Manual,
    /// Picked after a finished run with looping enabled.
    AutoLoop,
}

/// Observable changes, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// A run began at step 0.
    Started { target: Target, at_ms: u64 },

    /// The selected step moved.
    StepChanged { index: usize, step: Step, at_ms: u64 },

    /// Search status changed.
    StatusChanged {
        from: SearchStatus,
        to: SearchStatus,
        at_ms: u64,
    },

    /// Auto-play was paused or resumed.
    PlayToggled { is_playing: bool, at_ms: u64 },

    /// Playback returned to idle with the trace kept.
    Reset { at_ms: u64 },

    /// A new target replaced the old one and the trace was rebuilt.
    Retargeted {
        target: Target,
        cause: RetargetCause,
        at_ms: u64,
    },

    /// A new sequence was generated and the target recentered.
    Regenerated {
        seed: u32,
        len: usize,
        target: Target,
        at_ms: u64,
    },

    /// A delayed restart was armed.
    RestartArmed { delay_ms: u64, at_ms: u64 },
}

impl PlaybackEvent {
    /// Virtual time at which this event happened.
    pub fn at_ms(&self) -> u64 {
        match self {
            PlaybackEvent::Started { at_ms, .. } => *at_ms,
            PlaybackEvent::StepChanged { at_ms, .. } => *at_ms,
            PlaybackEvent::StatusChanged { at_ms, .. } => *at_ms,
            PlaybackEvent::PlayToggled { at_ms, .. } => *at_ms,
            PlaybackEvent::Reset { at_ms } => *at_ms,
            PlaybackEvent::Retargeted { at_ms, .. } => *at_ms,
            PlaybackEvent::Regenerated { at_ms, .. } => *at_ms,
            PlaybackEvent::RestartArmed { at_ms, .. } => *at_ms,
        }
    }
}

/// The searched data: sequence, target and the full trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSnapshot {
    pub sequence: Sequence,
    pub target: Target,
    pub variant: Variant,
    pub trace: Trace,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bisect_search::Direction;

    #[test]
    fn event_serialization() {
        let event = PlaybackEvent::StepChanged {
            index: 1,
            step: Step {
                low: 3,
                high: 4,
                mid: 3,
                value: Some(14),
                direction: Direction::Found,
                depth: 1,
            },
            at_ms: 650,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"step_changed\""));
        assert!(json.contains("\"direction\":\"found\""));

        let parsed: PlaybackEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.at_ms(), 650);
    }

    #[test]
    fn status_uses_kebab_case() {
        let event = PlaybackEvent::StatusChanged {
            from: SearchStatus::Searching,
            to: SearchStatus::NotFound,
            at_ms: 0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"to\":\"not-found\""));
    }

    #[test]
    fn targets_serialize_as_plain_numbers() {
        let event = PlaybackEvent::Retargeted {
            target: Target::Real(14.5),
            cause: RetargetCause::Manual,
            at_ms: 3,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"target\":14.5"));
        let parsed: PlaybackEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);

        let json = serde_json::to_string(&PlaybackEvent::Started {
            target: Target::Whole(53),
            at_ms: 0,
        })
        .unwrap();
        assert!(json.contains("\"target\":53"));
    }

    #[test]
    fn snapshot_default() {
        let snap = SearchSnapshot::default();
        assert!(snap.sequence.is_empty());
        assert!(snap.trace.is_empty());
    }
}
