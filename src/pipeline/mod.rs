//! Pipeline runner
//!
//! Drives the fixed stage sequence over one dataset, timing every stage it
//! enters and stopping at the first failure:
//!
//! ```text
//! NotStarted ─> Loading ─> Cleaning ─> ... ─> PersistingTransformed ─> Completed
//!                  │           │                        │
//!                  └───────────┴──────── failure ───────┴──> Aborted
//! ```
//!
//! The runner owns a [`MetricsRecorder`]. Every run appends one run date
//! and exactly one timing entry per stage kind, so repeated runs against the
//! same runner keep the trend series aligned.

mod state;

pub use state::PipelineState;

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::metrics::MetricsRecorder;
use crate::stage::{
    CleanStage, LoadStage, PersistStage, Stage, StageKind, StageOutcome, TransformStage,
    ValidateCleanedStage, ValidateTransformedStage,
};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// What happened to one stage in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    /// Which stage
    pub kind: StageKind,
    /// Whether it succeeded
    pub success: bool,
    /// Time spent inside the stage, in seconds when serialized
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
    /// Rows in the dataset the stage produced, if any
    pub rows: Option<usize>,
    /// Failure message, if it failed
    pub error: Option<String>,
}

impl From<&StageOutcome> for StageRecord {
    fn from(outcome: &StageOutcome) -> Self {
        Self {
            kind: outcome.kind,
            success: outcome.succeeded(),
            elapsed: outcome.elapsed,
            rows: outcome.dataset.as_ref().map(Dataset::num_rows),
            error: outcome.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Result of one pipeline invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Timestamp recorded for this run
    pub started_at: DateTime<Utc>,
    /// `Completed` or `Aborted`
    pub final_state: PipelineState,
    /// Stage that failed, if any
    pub halted_at: Option<StageKind>,
    /// One record per stage entered, in order
    pub stages: Vec<StageRecord>,
}

impl RunSummary {
    /// Whether every stage succeeded
    #[must_use]
    pub fn completed(&self) -> bool {
        self.final_state == PipelineState::Completed
    }

    /// Record for `kind`, if the stage was entered
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.kind == kind)
    }

    /// Stages never entered because of an earlier failure
    #[must_use]
    pub fn skipped(&self) -> Vec<StageKind> {
        StageKind::SEQUENCE
            .iter()
            .copied()
            .filter(|&kind| self.stage(kind).is_none())
            .collect()
    }
}

/// Runs the ETL stage sequence and accumulates metrics across runs.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    recorder: MetricsRecorder,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("recorder", &self.recorder)
            .finish()
    }
}

impl Pipeline {
    /// Build the stage sequence from `config` with a fresh recorder.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_recorder(config, MetricsRecorder::new())
    }

    /// Build the stage sequence from `config`, continuing an existing
    /// metrics history.
    #[must_use]
    pub fn with_recorder(config: &PipelineConfig, recorder: MetricsRecorder) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(LoadStage::new(StageKind::Load, &config.input_path)),
            Box::new(CleanStage),
            Box::new(ValidateCleanedStage),
            Box::new(PersistStage::new(
                StageKind::PersistCleaned,
                &config.cleaned_path,
            )),
            Box::new(LoadStage::new(StageKind::ReloadCleaned, &config.cleaned_path)),
            Box::new(TransformStage),
            Box::new(ValidateTransformedStage),
            Box::new(PersistStage::new(
                StageKind::PersistTransformed,
                &config.transformed_path,
            )),
        ];
        Self { stages, recorder }
    }

    /// Run every stage once and summarize the outcome.
    pub fn run(&mut self) -> RunSummary {
        self.execute().0
    }

    /// Run every stage once, returning the summary and the final dataset.
    ///
    /// The dataset is `None` when the run aborted before any stage produced
    /// one; on abort it is whatever the failing stage handed back.
    pub fn execute(&mut self) -> (RunSummary, Option<Dataset>) {
        let started_at = self.recorder.begin_run();
        let mut state = PipelineState::NotStarted;
        let mut current: Option<Dataset> = None;
        let mut records = Vec::with_capacity(self.stages.len());
        let mut halted_at = None;

        tracing::info!(run = self.recorder.run_count(), "Pipeline run started");

        for stage in &self.stages {
            let kind = stage.kind();
            if halted_at.is_some() {
                self.recorder.record_skipped(kind);
                tracing::debug!(stage = %kind, "Stage skipped");
                continue;
            }

            state = state.next();
            tracing::debug!(%state, "Entering stage {}", stage.name());

            let timer = self.recorder.time(kind);
            let result = stage.execute(current.take());
            let elapsed = timer.finish();

            let outcome = StageOutcome::new(kind, elapsed, result);
            let record = StageRecord::from(&outcome);
            records.push(record);

            if outcome.succeeded() {
                self.recorder.record_success(kind);
                current = outcome.dataset;
            } else {
                state = state.abort();
                halted_at = Some(kind);
                current = outcome.dataset;
                match &outcome.error {
                    Some(error) => tracing::error!(stage = %kind, "Pipeline halted: {error}"),
                    None => tracing::error!(stage = %kind, "Pipeline halted: stage produced no dataset"),
                }
            }
        }

        if !state.is_terminal() {
            state = PipelineState::Completed;
        }

        let summary = RunSummary {
            started_at,
            final_state: state,
            halted_at,
            stages: records,
        };

        match summary.halted_at {
            None => tracing::info!("ETL pipeline completed successfully."),
            Some(stage) => tracing::warn!(%stage, "ETL pipeline aborted"),
        }

        (summary, current)
    }

    /// Metrics accumulated so far
    #[must_use]
    pub const fn metrics(&self) -> &MetricsRecorder {
        &self.recorder
    }

    /// Give up the runner, keeping its metrics
    #[must_use]
    pub fn into_metrics(self) -> MetricsRecorder {
        self.recorder
    }
}
