//! Runner state machine

use crate::stage::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the runner is in a single invocation.
///
/// Strictly linear: each stage state advances to the next on success and any
/// failure moves to [`PipelineState::Aborted`]. `Completed` and `Aborted` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing has run yet
    NotStarted,
    /// Reading the raw input
    Loading,
    /// Cleaning the raw dataset
    Cleaning,
    /// Validating the cleaned dataset
    ValidatingCleaned,
    /// Writing the cleaned snapshot
    PersistingCleaned,
    /// Reading the cleaned snapshot back
    ReloadingCleaned,
    /// Adding derived columns
    Transforming,
    /// Validating the transformed dataset
    ValidatingTransformed,
    /// Writing the transformed dataset
    PersistingTransformed,
    /// Every stage succeeded
    Completed,
    /// A stage failed; later stages were skipped
    Aborted,
}

impl PipelineState {
    /// State while `kind` is running
    #[must_use]
    pub const fn running(kind: StageKind) -> Self {
        match kind {
            StageKind::Load => Self::Loading,
            StageKind::Clean => Self::Cleaning,
            StageKind::ValidateCleaned => Self::ValidatingCleaned,
            StageKind::PersistCleaned => Self::PersistingCleaned,
            StageKind::ReloadCleaned => Self::ReloadingCleaned,
            StageKind::Transform => Self::Transforming,
            StageKind::ValidateTransformed => Self::ValidatingTransformed,
            StageKind::PersistTransformed => Self::PersistingTransformed,
        }
    }

    /// Stage running in this state, if any
    #[must_use]
    pub const fn stage(self) -> Option<StageKind> {
        match self {
            Self::Loading => Some(StageKind::Load),
            Self::Cleaning => Some(StageKind::Clean),
            Self::ValidatingCleaned => Some(StageKind::ValidateCleaned),
            Self::PersistingCleaned => Some(StageKind::PersistCleaned),
            Self::ReloadingCleaned => Some(StageKind::ReloadCleaned),
            Self::Transforming => Some(StageKind::Transform),
            Self::ValidatingTransformed => Some(StageKind::ValidateTransformed),
            Self::PersistingTransformed => Some(StageKind::PersistTransformed),
            Self::NotStarted | Self::Completed | Self::Aborted => None,
        }
    }

    /// State after the current one succeeds
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::NotStarted => Self::Loading,
            Self::Loading => Self::Cleaning,
            Self::Cleaning => Self::ValidatingCleaned,
            Self::ValidatingCleaned => Self::PersistingCleaned,
            Self::PersistingCleaned => Self::ReloadingCleaned,
            Self::ReloadingCleaned => Self::Transforming,
            Self::Transforming => Self::ValidatingTransformed,
            Self::ValidatingTransformed => Self::PersistingTransformed,
            Self::PersistingTransformed | Self::Completed => Self::Completed,
            Self::Aborted => Self::Aborted,
        }
    }

    /// State after the current one fails
    #[must_use]
    pub const fn abort(self) -> Self {
        match self {
            Self::Completed => Self::Completed,
            _ => Self::Aborted,
        }
    }

    /// Whether no further transitions happen
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not_started",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            other => match other.stage() {
                Some(kind) => return write!(f, "running:{kind}"),
                None => "unknown",
            },
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_walk_matches_stage_sequence() {
        let mut state = PipelineState::NotStarted;
        for kind in StageKind::SEQUENCE {
            state = state.next();
            assert_eq!(state, PipelineState::running(kind));
            assert_eq!(state.stage(), Some(kind));
        }
        assert_eq!(state.next(), PipelineState::Completed);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        assert!(PipelineState::Completed.is_terminal());
        assert!(PipelineState::Aborted.is_terminal());
        assert_eq!(PipelineState::Aborted.next(), PipelineState::Aborted);
        assert_eq!(PipelineState::Completed.abort(), PipelineState::Completed);
        assert!(!PipelineState::Transforming.is_terminal());
    }

    #[test]
    fn test_any_running_state_aborts() {
        for kind in StageKind::SEQUENCE {
            assert_eq!(PipelineState::running(kind).abort(), PipelineState::Aborted);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(PipelineState::Cleaning.to_string(), "running:clean");
        assert_eq!(PipelineState::Aborted.to_string(), "aborted");
    }
}
