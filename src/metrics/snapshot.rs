//! Metrics Snapshot - immutable view of recorded metrics for reporting

use super::StageTiming;
use crate::stage::StageKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a trend chart cannot be drawn from a snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrendError {
    /// No run has been recorded yet
    #[error("no runs recorded")]
    NoRuns,

    /// A stage series does not line up with the run dates
    #[error("timing series for '{stage}' has {timings} entries but {dates} runs were recorded")]
    LengthMismatch {
        /// Offending stage
        stage: StageKind,
        /// Length of its timing series
        timings: usize,
        /// Number of run dates
        dates: usize,
    },
}

/// Point-in-time copy of a [`MetricsRecorder`](super::MetricsRecorder).
///
/// Serializes to the `metrics.json` document written next to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    taken_at: DateTime<Utc>,
    run_dates: Vec<DateTime<Utc>>,
    timings: BTreeMap<StageKind, Vec<StageTiming>>,
    successes: BTreeMap<StageKind, u64>,
}

impl MetricsSnapshot {
    /// Build a snapshot from raw series.
    #[must_use]
    pub fn new(
        run_dates: Vec<DateTime<Utc>>,
        timings: BTreeMap<StageKind, Vec<StageTiming>>,
        successes: BTreeMap<StageKind, u64>,
    ) -> Self {
        Self {
            taken_at: Utc::now(),
            run_dates,
            timings,
            successes,
        }
    }

    /// When the snapshot was taken
    #[must_use]
    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// One timestamp per run, oldest first
    #[must_use]
    pub fn run_dates(&self) -> &[DateTime<Utc>] {
        &self.run_dates
    }

    /// Number of runs recorded
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.run_dates.len()
    }

    /// Timing series for `kind`
    #[must_use]
    pub fn timings(&self, kind: StageKind) -> &[StageTiming] {
        self.timings.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Success count for `kind`
    #[must_use]
    pub fn success_count(&self, kind: StageKind) -> u64 {
        self.successes.get(&kind).copied().unwrap_or(0)
    }

    /// Success counts for every stage, in execution order
    #[must_use]
    pub fn successes(&self) -> Vec<(StageKind, u64)> {
        StageKind::SEQUENCE
            .iter()
            .map(|&kind| (kind, self.success_count(kind)))
            .collect()
    }

    /// How many runs actually entered `kind`
    #[must_use]
    pub fn attempt_count(&self, kind: StageKind) -> usize {
        self.timings(kind)
            .iter()
            .filter(|timing| timing.was_attempted())
            .count()
    }

    /// Elapsed seconds per run for `kind`; `None` where the stage was skipped
    #[must_use]
    pub fn trend(&self, kind: StageKind) -> Vec<Option<f64>> {
        self.timings(kind)
            .iter()
            .map(|timing| timing.elapsed().map(|d| d.as_secs_f64()))
            .collect()
    }

    /// Check that every stage series lines up with the run dates.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::NoRuns`] for an empty snapshot and
    /// [`TrendError::LengthMismatch`] for the first misaligned stage.
    pub fn check_consistency(&self) -> Result<(), TrendError> {
        let dates = self.run_dates.len();
        if dates == 0 {
            return Err(TrendError::NoRuns);
        }

        for kind in StageKind::SEQUENCE {
            let timings = self.timings(kind).len();
            if timings != dates {
                return Err(TrendError::LengthMismatch {
                    stage: kind,
                    timings,
                    dates,
                });
            }
        }
        Ok(())
    }

    /// Log success counts and the latest timing of every stage.
    pub fn log_summary(&self) {
        tracing::info!(runs = self.run_count(), "Monitoring Results:");
        for kind in StageKind::SEQUENCE {
            let latest = self
                .timings(kind)
                .last()
                .and_then(|timing| timing.elapsed())
                .map_or_else(|| "skipped".to_string(), |d| format!("{:.4}s", d.as_secs_f64()));
            tracing::info!(
                stage = %kind,
                successes = self.success_count(kind),
                attempts = self.attempt_count(kind),
                latest = %latest,
                "{}",
                kind.label()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn aligned(runs: usize) -> MetricsSnapshot {
        let run_dates = (0..runs)
            .map(|i| Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, u32::try_from(i).unwrap()).unwrap())
            .collect();
        let timings = StageKind::SEQUENCE
            .iter()
            .map(|&kind| {
                (
                    kind,
                    vec![StageTiming::Elapsed(Duration::from_millis(5)); runs],
                )
            })
            .collect();
        let successes = StageKind::SEQUENCE
            .iter()
            .map(|&kind| (kind, runs as u64))
            .collect();
        MetricsSnapshot::new(run_dates, timings, successes)
    }

    #[test]
    fn test_consistent_snapshot() {
        let snapshot = aligned(2);
        assert_eq!(snapshot.check_consistency(), Ok(()));
        assert_eq!(snapshot.run_count(), 2);
        assert_eq!(snapshot.success_count(StageKind::Transform), 2);
    }

    #[test]
    fn test_empty_snapshot_has_no_trend() {
        let snapshot = MetricsSnapshot::new(Vec::new(), BTreeMap::new(), BTreeMap::new());
        assert_eq!(snapshot.check_consistency(), Err(TrendError::NoRuns));
        assert!(snapshot.successes().iter().all(|&(_, count)| count == 0));
    }

    #[test]
    fn test_length_mismatch_detected() {
        let mut timings: BTreeMap<_, _> = StageKind::SEQUENCE
            .iter()
            .map(|&kind| (kind, vec![StageTiming::Skipped]))
            .collect();
        timings.insert(StageKind::Clean, Vec::new());

        let snapshot = MetricsSnapshot::new(vec![Utc::now()], timings, BTreeMap::new());
        assert_eq!(
            snapshot.check_consistency(),
            Err(TrendError::LengthMismatch {
                stage: StageKind::Clean,
                timings: 0,
                dates: 1,
            })
        );
    }

    #[test]
    fn test_trend_marks_skipped_runs() {
        let mut timings = BTreeMap::new();
        timings.insert(
            StageKind::Transform,
            vec![
                StageTiming::Elapsed(Duration::from_millis(250)),
                StageTiming::Skipped,
            ],
        );
        let snapshot = MetricsSnapshot::new(vec![Utc::now(), Utc::now()], timings, BTreeMap::new());

        assert_eq!(snapshot.trend(StageKind::Transform), vec![Some(0.25), None]);
        assert_eq!(snapshot.attempt_count(StageKind::Transform), 1);
    }

    #[test]
    fn test_successes_in_execution_order() {
        let snapshot = aligned(1);
        let kinds: Vec<_> = snapshot.successes().into_iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, StageKind::SEQUENCE.to_vec());
    }

    #[test]
    fn test_serde_json_shape() {
        let snapshot = aligned(1);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["successes"]["validate_cleaned"], 1);
        assert!(json["timings"]["load"][0]["elapsed"].is_object());

        let back: MetricsSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
