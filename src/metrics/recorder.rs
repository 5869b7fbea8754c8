//! Metrics Recorder - append-only accumulator of stage timings and successes

use super::{MetricsSnapshot, StageTiming};
use crate::stage::StageKind;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Accumulates run metrics across pipeline invocations.
///
/// Owned by the pipeline runner; hand a [`MetricsSnapshot`] to reporting.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    run_dates: Vec<DateTime<Utc>>,
    timings: BTreeMap<StageKind, Vec<StageTiming>>,
    successes: BTreeMap<StageKind, u64>,
}

impl MetricsRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a run, stamping it with the current time.
    pub fn begin_run(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.begin_run_at(now);
        now
    }

    /// Mark the start of a run with an explicit timestamp.
    pub fn begin_run_at(&mut self, timestamp: DateTime<Utc>) {
        self.run_dates.push(timestamp);
    }

    /// Append an elapsed-time sample for `kind`.
    pub fn record_duration(&mut self, kind: StageKind, elapsed: Duration) {
        self.push_timing(kind, StageTiming::Elapsed(elapsed));
    }

    /// Append a skipped marker for `kind`.
    pub fn record_skipped(&mut self, kind: StageKind) {
        self.push_timing(kind, StageTiming::Skipped);
    }

    /// Increment the success counter for `kind`.
    pub fn record_success(&mut self, kind: StageKind) {
        *self.successes.entry(kind).or_insert(0) += 1;
    }

    /// Start timing `kind`.
    ///
    /// The elapsed time is recorded when the returned guard is finished or
    /// dropped, whichever comes first, so every exit path of the timed
    /// block leaves exactly one sample.
    #[must_use = "dropping the timer immediately records a near-zero duration"]
    pub fn time(&mut self, kind: StageKind) -> StageTimer<'_> {
        StageTimer {
            recorder: self,
            kind,
            start: Instant::now(),
            recorded: false,
        }
    }

    /// Number of runs begun
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.run_dates.len()
    }

    /// Current success count for `kind`
    #[must_use]
    pub fn success_count(&self, kind: StageKind) -> u64 {
        self.successes.get(&kind).copied().unwrap_or(0)
    }

    /// Timing series for `kind`
    #[must_use]
    pub fn timings(&self, kind: StageKind) -> &[StageTiming] {
        self.timings.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.run_dates.is_empty() && self.timings.is_empty() && self.successes.is_empty()
    }

    /// Copy the current state for reporting.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::new(
            self.run_dates.clone(),
            self.timings.clone(),
            self.successes.clone(),
        )
    }

    fn push_timing(&mut self, kind: StageKind, timing: StageTiming) {
        self.timings.entry(kind).or_default().push(timing);
    }
}

/// Guard that records a stage's elapsed time exactly once.
#[derive(Debug)]
pub struct StageTimer<'a> {
    recorder: &'a mut MetricsRecorder,
    kind: StageKind,
    start: Instant,
    recorded: bool,
}

impl StageTimer<'_> {
    /// Stop the timer, record the sample and return it.
    pub fn finish(mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.recorder.record_duration(self.kind, elapsed);
        self.recorded = true;
        elapsed
    }
}

impl Drop for StageTimer<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.recorder
                .record_duration(self.kind, self.start.elapsed());
        }
    }
}
