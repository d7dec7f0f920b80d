//! Session lifecycle state machine
//!
//! ```text
//! Idle -> Setup -> Active <-> Paused
//!          |         |          |
//!          v         v          v
//!        Error --> Cleanup --> Idle
//! ```
//!
//! Transitions that do not appear in the table are rejected; the
//! coordinator treats a rejected transition as a silent no-op.

use std::fmt;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Nothing running
    #[default]
    Idle,
    /// Start requested; waiting for the tracking session
    Setup,
    /// Ticking
    Active,
    /// Session interrupted; ticks are ignored
    Paused,
    /// Releasing subsystems
    Cleanup,
    /// Start failed; call reset or cleanup
    Error,
}

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Host asked to start
    RequestStart,
    /// Tracking session is up
    Ready,
    /// Configuration or session start failed
    Failed,
    /// Host interrupted the session
    Pause,
    /// Host resumed the session
    Resume,
    /// Teardown began
    BeginCleanup,
    /// Teardown finished
    CleanupFinished,
    /// Clear an error
    Reset,
}

impl SessionState {
    /// State reached by applying `event`, or `None` if not allowed
    pub fn transition(self, event: LifecycleEvent) -> Option<SessionState> {
        use LifecycleEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::Idle, E::RequestStart) => Some(S::Setup),
            (S::Setup, E::Ready) => Some(S::Active),
            (S::Setup, E::Failed) => Some(S::Error),
            (S::Active, E::Pause) => Some(S::Paused),
            (S::Paused, E::Resume) => Some(S::Active),
            (S::Setup | S::Active | S::Paused | S::Error, E::BeginCleanup) => Some(S::Cleanup),
            (S::Cleanup, E::CleanupFinished) => Some(S::Idle),
            (S::Error, E::Reset) => Some(S::Idle),
            _ => None,
        }
    }

    /// Whether ticks advance the simulation
    pub fn is_running(self) -> bool {
        self == SessionState::Active
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Setup => "setup",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Cleanup => "cleanup",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = SessionState::default();
        for (event, expected) in [
            (LifecycleEvent::RequestStart, SessionState::Setup),
            (LifecycleEvent::Ready, SessionState::Active),
            (LifecycleEvent::Pause, SessionState::Paused),
            (LifecycleEvent::Resume, SessionState::Active),
            (LifecycleEvent::BeginCleanup, SessionState::Cleanup),
            (LifecycleEvent::CleanupFinished, SessionState::Idle),
        ] {
            state = state.transition(event).expect("allowed");
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn test_error_only_from_setup() {
        assert_eq!(SessionState::Setup.transition(LifecycleEvent::Failed), Some(SessionState::Error));
        assert_eq!(SessionState::Active.transition(LifecycleEvent::Failed), None);
        assert_eq!(SessionState::Idle.transition(LifecycleEvent::Failed), None);
        assert_eq!(SessionState::Error.transition(LifecycleEvent::Reset), Some(SessionState::Idle));
    }

    #[test]
    fn test_wrong_state_requests_are_rejected() {
        assert_eq!(SessionState::Idle.transition(LifecycleEvent::Resume), None);
        assert_eq!(SessionState::Active.transition(LifecycleEvent::RequestStart), None);
        assert_eq!(SessionState::Idle.transition(LifecycleEvent::BeginCleanup), None);
        assert_eq!(SessionState::Paused.transition(LifecycleEvent::Pause), None);
    }
}
