//! Execution progress through an ordered waypoint list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum MissionState {
    NotStarted,
    InProgress(usize),
    Complete,
}

/// Tracks which waypoint is current.
///
/// `NotStarted` becomes `InProgress(0)` on the first peek or advance, and the
/// index only ever moves forward. A mission with no waypoints goes straight
/// to `Complete` on its first peek.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionProgress {
    len: usize,
    state: MissionState,
}

impl MissionProgress {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            state: MissionState::NotStarted,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn state(&self) -> MissionState {
        self.state
    }

    /// Index of the current waypoint, starting the mission if needed.
    pub fn peek_index(&mut self) -> Option<usize> {
        if self.state == MissionState::NotStarted {
            self.start();
        }
        match self.state {
            MissionState::InProgress(i) => Some(i),
            _ => None,
        }
    }

    /// Move past the current waypoint. No-op once complete.
    pub fn advance(&mut self) {
        match self.state {
            MissionState::NotStarted => self.start(),
            MissionState::InProgress(i) if i + 1 < self.len => {
                self.state = MissionState::InProgress(i + 1);
            }
            MissionState::InProgress(_) => {
                tracing::info!(waypoints = self.len, "Mission complete");
                self.state = MissionState::Complete;
            }
            MissionState::Complete => {}
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == MissionState::Complete
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.state, MissionState::InProgress(_))
    }

    /// -1 before the start, the waypoint index while running, `len` once done.
    pub fn current_index(&self) -> i64 {
        match self.state {
            MissionState::NotStarted => -1,
            MissionState::InProgress(i) => i as i64,
            MissionState::Complete => self.len as i64,
        }
    }

    /// Waypoints not yet reached, the current one included.
    pub fn remaining(&self) -> usize {
        match self.state {
            MissionState::NotStarted => self.len,
            MissionState::InProgress(i) => self.len - i,
            MissionState::Complete => 0,
        }
    }

    fn start(&mut self) {
        self.state = if self.len == 0 {
            MissionState::Complete
        } else {
            MissionState::InProgress(0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_lazily_on_peek() {
        let mut progress = MissionProgress::new(3);
        assert_eq!(progress.state(), MissionState::NotStarted);
        assert_eq!(progress.current_index(), -1);
        assert_eq!(progress.remaining(), 3);

        assert_eq!(progress.peek_index(), Some(0));
        assert!(progress.is_in_progress());
        assert_eq!(progress.peek_index(), Some(0));
    }

    #[test]
    fn advance_from_not_started_lands_on_first() {
        let mut progress = MissionProgress::new(2);
        progress.advance();
        assert_eq!(progress.state(), MissionState::InProgress(0));
    }

    #[test]
    fn advance_walks_to_complete_and_stays() {
        let mut progress = MissionProgress::new(2);
        progress.peek_index();
        progress.advance();
        assert_eq!(progress.current_index(), 1);
        assert_eq!(progress.remaining(), 1);

        progress.advance();
        assert!(progress.is_complete());
        assert_eq!(progress.current_index(), 2);
        assert_eq!(progress.peek_index(), None);

        progress.advance();
        assert!(progress.is_complete());
        assert_eq!(progress.remaining(), 0);
    }

    #[test]
    fn empty_mission_completes_on_first_peek() {
        let mut progress = MissionProgress::new(0);
        assert!(!progress.is_complete());
        assert_eq!(progress.peek_index(), None);
        assert!(progress.is_complete());
        assert_eq!(progress.current_index(), 0);
    }

    #[test]
    fn serializes_state_with_index() {
        let json = serde_json::to_value(MissionState::InProgress(4)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "in_progress", "index": 4}));
    }
}
