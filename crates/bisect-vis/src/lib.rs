//! Bisect Visualization
//!
//! Step through, auto-play or loop a binary search trace.
//!
//! # Architecture
//!
//! - **Config**: Immutable settings snapshot with the panel's clamping rules
//! - **Scheduler**: Virtual millisecond clock with single-shot timers
//! - **Playback**: State machine over one trace (start, step, pause, loop)
//! - **WebSocket**: Streams status changes to the frontend
//! - **REST API**: Control playback, read the sequence and trace
//!
//! # Usage
//!
//! ```ignore
//! let playback = Playback::new(Settings::from_env()?);
//! let server = VisServer::new(playback);
//! server.serve(3000).await?;
//! ```
//!
//! Tests drive the controller without real time:
//!
//! ```
//! use bisect_vis::{Playback, SearchStatus, Settings};
//!
//! let mut playback = Playback::new(Settings::default());
//! playback.start();
//! playback.advance_by(1300);
//! assert_eq!(playback.state().status, SearchStatus::Found);
//! ```

mod config;
mod error;
mod events;
mod playback;
mod scheduler;
mod server;

pub use config::{SettingChange, Settings};
pub use error::{Error, Result};
pub use events::{PlaybackEvent, RetargetCause, SearchSnapshot};
pub use playback::{loop_target, Playback, PlaybackState, PlaybackStatus, SearchStatus};
pub use scheduler::{Scheduler, TimerId, TimerKind};
pub use server::VisServer;

#[cfg(test)]
mod tests {
    use super::*;
    use bisect_search::{search_trace, Direction, Variant};

    #[test]
    fn full_run_matches_trace() {
        let mut playback = Playback::new(Settings::default());
        playback.start();

        let mut seen = vec![*playback.current_step().unwrap()];
        while playback.state().status == SearchStatus::Searching {
            playback.advance_by(playback.settings().step_delay);
            seen.push(*playback.current_step().unwrap());
        }

        let expected = search_trace(playback.sequence(), playback.target(), Variant::Recursive);
        assert_eq!(seen.as_slice(), expected.steps());
        assert_eq!(seen.last().unwrap().direction, Direction::Found);
    }

    #[test]
    fn settings_json_feeds_controller() {
        let settings = Settings::from_json(r#"{"arraySize": 5, "minValue": 0, "maxValue": 3}"#)
            .unwrap();
        let playback = Playback::new(settings);
        assert_eq!(playback.sequence().len(), 5);
        assert!(playback.sequence().windows(2).all(|w| w[0] < w[1]));
    }
}
