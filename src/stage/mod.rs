//! Pipeline stages
//!
//! A stage is a named step that takes the current dataset (if any) and
//! produces a [`StageResult`]. Stages never panic on bad data and never
//! return `Err` to the runner: failures travel inside the result so the
//! runner can still record timing and keep the partial dataset for
//! diagnostics.
//!
//! ```text
//! Load ─> Clean ─> ValidateCleaned ─> PersistCleaned ─> ReloadCleaned
//!      ─> Transform ─> ValidateTransformed ─> PersistTransformed
//! ```

pub mod clean;
pub mod io;
pub mod transform;
pub mod validate;

use crate::dataset::Dataset;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use clean::CleanStage;
pub use io::{LoadStage, PersistStage};
pub use transform::TransformStage;
pub use validate::{ValidateCleanedStage, ValidateTransformedStage};

/// Every step the runner knows about, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Read the raw input
    Load,
    /// Drop nulls, coerce types, filter constraints
    Clean,
    /// Check cleaned types and value ranges
    ValidateCleaned,
    /// Write the cleaned snapshot
    PersistCleaned,
    /// Read the cleaned snapshot back
    ReloadCleaned,
    /// Add derived columns
    Transform,
    /// Check derived columns
    ValidateTransformed,
    /// Write the transformed snapshot
    PersistTransformed,
}

impl StageKind {
    /// All stages in execution order
    pub const SEQUENCE: [Self; 8] = [
        Self::Load,
        Self::Clean,
        Self::ValidateCleaned,
        Self::PersistCleaned,
        Self::ReloadCleaned,
        Self::Transform,
        Self::ValidateTransformed,
        Self::PersistTransformed,
    ];

    /// Stable snake-case name used in logs, metrics and reports
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Clean => "clean",
            Self::ValidateCleaned => "validate_cleaned",
            Self::PersistCleaned => "persist_cleaned",
            Self::ReloadCleaned => "reload_cleaned",
            Self::Transform => "transform",
            Self::ValidateTransformed => "validate_transformed",
            Self::PersistTransformed => "persist_transformed",
        }
    }

    /// Human-readable label for charts
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Load => "Load",
            Self::Clean => "Clean",
            Self::ValidateCleaned => "Validate Cleaned",
            Self::PersistCleaned => "Persist Cleaned",
            Self::ReloadCleaned => "Reload Cleaned",
            Self::Transform => "Transform",
            Self::ValidateTransformed => "Validate Transformed",
            Self::PersistTransformed => "Persist Transformed",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a stage hands back to the runner.
///
/// `dataset` may be present even when `error` is set (a partially cleaned
/// dataset, for example). Success means no error *and* a dataset.
#[derive(Debug)]
pub struct StageResult {
    /// Resulting dataset, if any
    pub dataset: Option<Dataset>,
    /// Failure detail, if the stage failed
    pub error: Option<Error>,
}

impl StageResult {
    /// Successful result carrying `dataset`
    #[must_use]
    pub const fn success(dataset: Dataset) -> Self {
        Self {
            dataset: Some(dataset),
            error: None,
        }
    }

    /// Failed result with no dataset
    #[must_use]
    pub const fn failure(error: Error) -> Self {
        Self {
            dataset: None,
            error: Some(error),
        }
    }

    /// Failed result that still carries the dataset built so far
    #[must_use]
    pub const fn partial(dataset: Dataset, error: Error) -> Self {
        Self {
            dataset: Some(dataset),
            error: Some(error),
        }
    }

    /// Whether the stage succeeded
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none() && self.dataset.is_some()
    }
}

impl From<crate::Result<Dataset>> for StageResult {
    fn from(result: crate::Result<Dataset>) -> Self {
        match result {
            Ok(dataset) => Self::success(dataset),
            Err(error) => Self::failure(error),
        }
    }
}

/// A [`StageResult`] stamped with the stage kind and elapsed time.
#[derive(Debug)]
pub struct StageOutcome {
    /// Which stage ran
    pub kind: StageKind,
    /// Wall-clock time spent inside the stage
    pub elapsed: Duration,
    /// Resulting dataset, if any
    pub dataset: Option<Dataset>,
    /// Failure detail, if the stage failed
    pub error: Option<Error>,
}

impl StageOutcome {
    /// Combine a stage result with its timing
    #[must_use]
    pub fn new(kind: StageKind, elapsed: Duration, result: StageResult) -> Self {
        Self {
            kind,
            elapsed,
            dataset: result.dataset,
            error: result.error,
        }
    }

    /// Whether the stage succeeded
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none() && self.dataset.is_some()
    }
}

/// A named pipeline step.
pub trait Stage {
    /// Which step this is
    fn kind(&self) -> StageKind;

    /// Run the step on the current dataset.
    ///
    /// `input` is `None` when no dataset is available; stages that need one
    /// report that as a failure.
    fn execute(&self, input: Option<Dataset>) -> StageResult;

    /// Stage name for logging
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_ordered() {
        let mut sorted = StageKind::SEQUENCE;
        sorted.sort();
        assert_eq!(sorted, StageKind::SEQUENCE);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = StageKind::SEQUENCE.iter().map(|k| k.name()).collect();
        names.dedup();
        assert_eq!(names.len(), StageKind::SEQUENCE.len());
    }

    #[test]
    fn test_stage_result_success_flag() {
        let failed = StageResult::failure(Error::Other("boom".to_string()));
        assert!(!failed.succeeded());
        assert!(failed.dataset.is_none());
    }

    #[test]
    fn test_stage_kind_serializes_snake_case() {
        let json = serde_json::to_string(&StageKind::ValidateCleaned).unwrap();
        assert_eq!(json, "\"validate_cleaned\"");
    }
}
