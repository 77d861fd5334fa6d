//! Lifecycle state of the coordinator.

use std::fmt;

/// Where the update lifecycle currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No update activity.
    #[default]
    Idle,
    /// A check is in flight.
    Checking,
    /// The client is downloading a release.
    Downloading,
    /// A release is downloaded and waiting for the user.
    Downloaded,
    /// The install chain is running.
    Installing,
}

impl Phase {
    /// Returns true if a new check may start from this phase.
    pub fn accepts_check(self) -> bool {
        matches!(self, Phase::Idle | Phase::Downloaded)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Checking => "checking",
            Phase::Downloading => "downloading",
            Phase::Downloaded => "downloaded",
            Phase::Installing => "installing",
        };
        f.write_str(name)
    }
}

/// Who asked for the check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckMode {
    /// Automatic check; only essential prompts are shown.
    #[default]
    Silent,
    /// User or developer initiated; every outcome is shown.
    Manual,
}

impl CheckMode {
    pub fn is_manual(self) -> bool {
        self == CheckMode::Manual
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckMode::Silent => f.write_str("silent"),
            CheckMode::Manual => f.write_str("manual"),
        }
    }
}

/// What happened to a check request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckRequest {
    /// The client accepted the check; the outcome arrives as events.
    Started,
    /// Another check or install was already running.
    Ignored { phase: Phase },
    /// The client rejected the check.
    Failed,
    /// `setup` has not been called.
    NotReady,
}

/// The user's answer to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDecision {
    ProceedNow,
    Defer,
}

impl UserDecision {
    /// Maps a message box button index; the first button always proceeds.
    pub fn from_response(index: usize) -> Self {
        if index == 0 {
            UserDecision::ProceedNow
        } else {
            UserDecision::Defer
        }
    }
}
