//! Run metrics
//!
//! The [`MetricsRecorder`] accumulates, across every pipeline run in the
//! process, one timing entry per stage per run, a success counter per stage
//! kind and one timestamp per run. Reporting works from an immutable
//! [`MetricsSnapshot`].
//!
//! ## Layout
//!
//! ```text
//! run_dates:  [t0,          t1,          t2         ]
//! load:       [Elapsed(..), Elapsed(..), Elapsed(..)]
//! clean:      [Elapsed(..), Elapsed(..), Skipped    ]
//! transform:  [Elapsed(..), Skipped,     Skipped    ]
//! ```
//!
//! Every series has the same length as `run_dates`; a stage that was not
//! reached in a run gets [`StageTiming::Skipped`] rather than no entry.
//!
//! ## Usage
//!
//! ```rust
//! use retail_etl::metrics::MetricsRecorder;
//! use retail_etl::stage::StageKind;
//!
//! let mut recorder = MetricsRecorder::new();
//! recorder.begin_run();
//!
//! let timer = recorder.time(StageKind::Load);
//! // ... run the stage ...
//! timer.finish();
//! recorder.record_success(StageKind::Load);
//!
//! let snapshot = recorder.snapshot();
//! assert_eq!(snapshot.success_count(StageKind::Load), 1);
//! ```

mod recorder;
mod snapshot;

pub use recorder::{MetricsRecorder, StageTimer};
pub use snapshot::{MetricsSnapshot, TrendError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One timing entry for a stage in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageTiming {
    /// The stage ran (successfully or not) for this long
    Elapsed(Duration),
    /// The stage was never reached in this run
    Skipped,
}

impl StageTiming {
    /// Elapsed time, or `None` if skipped
    #[must_use]
    pub const fn elapsed(self) -> Option<Duration> {
        match self {
            Self::Elapsed(duration) => Some(duration),
            Self::Skipped => None,
        }
    }

    /// Whether the stage was entered
    #[must_use]
    pub const fn was_attempted(self) -> bool {
        matches!(self, Self::Elapsed(_))
    }
}
