use std::time::{Duration, Instant};

use serde::Serialize;
use strum_macros::Display;

/// Online status of one configured device binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LivenessStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

/// An edge in the liveness state machine, reported to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivenessTransition {
    pub from: LivenessStatus,
    pub to: LivenessStatus,
}

/// Liveness state for one device.
///
/// Both transitions are edge-triggered: repeated evidence for the current
/// status yields no transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Liveness {
    status: LivenessStatus,
    last_valid_frame_at: Option<Instant>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> LivenessStatus {
        self.status
    }

    pub fn last_valid_frame_at(&self) -> Option<Instant> {
        self.last_valid_frame_at
    }

    /// Record a confirming frame seen at `at`.
    pub fn mark_online(&mut self, at: Instant) -> Option<LivenessTransition> {
        self.last_valid_frame_at = Some(at);
        self.transition(LivenessStatus::Online)
    }

    /// Collaborator-driven timeout or I/O failure.
    pub fn force_offline(&mut self) -> Option<LivenessTransition> {
        self.transition(LivenessStatus::Offline)
    }

    /// Online, but silent for longer than `timeout` as of `now`.
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        self.status == LivenessStatus::Online
            && self
                .last_valid_frame_at
                .is_some_and(|at| now.saturating_duration_since(at) > timeout)
    }

    fn transition(&mut self, to: LivenessStatus) -> Option<LivenessTransition> {
        if self.status == to {
            return None;
        }
        let from = std::mem::replace(&mut self.status, to);
        Some(LivenessTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown() {
        let liveness = Liveness::new();
        assert_eq!(liveness.status(), LivenessStatus::Unknown);
        assert_eq!(liveness.last_valid_frame_at(), None);
    }

    #[test]
    fn online_is_edge_triggered() {
        let start = Instant::now();
        let mut liveness = Liveness::new();

        assert_eq!(
            liveness.mark_online(start),
            Some(LivenessTransition {
                from: LivenessStatus::Unknown,
                to: LivenessStatus::Online
            })
        );
        let later = start + Duration::from_secs(1);
        assert_eq!(liveness.mark_online(later), None);
        assert_eq!(liveness.last_valid_frame_at(), Some(later));
    }

    #[test]
    fn offline_then_back_online() {
        let mut liveness = Liveness::new();
        liveness.mark_online(Instant::now());

        assert_eq!(
            liveness.force_offline(),
            Some(LivenessTransition {
                from: LivenessStatus::Online,
                to: LivenessStatus::Offline
            })
        );
        assert_eq!(liveness.force_offline(), None);
        assert_eq!(
            liveness.mark_online(Instant::now()).map(|t| t.from),
            Some(LivenessStatus::Offline)
        );
    }

    #[test]
    fn staleness_requires_online() {
        let start = Instant::now();
        let timeout = Duration::from_secs(30);
        let mut liveness = Liveness::new();
        assert!(!liveness.is_stale(start + timeout * 2, timeout));

        liveness.mark_online(start);
        assert!(!liveness.is_stale(start + timeout, timeout));
        assert!(liveness.is_stale(start + timeout * 2, timeout));

        liveness.force_offline();
        assert!(!liveness.is_stale(start + timeout * 2, timeout));
    }

    #[test]
    fn status_display() {
        assert_eq!(LivenessStatus::Online.to_string(), "ONLINE");
    }
}
