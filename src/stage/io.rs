//! Load and persist stages backed by the [`RecordStore`]

use super::{Stage, StageKind, StageResult};
use crate::dataset::Dataset;
use crate::storage::RecordStore;
use crate::Error;
use std::path::{Path, PathBuf};

/// Reads a dataset from `path`.
///
/// Any incoming dataset is discarded: the stage yields exactly what is on
/// disk. Used both for the raw input and for reloading the cleaned snapshot.
#[derive(Debug, Clone)]
pub struct LoadStage {
    kind: StageKind,
    path: PathBuf,
    store: RecordStore,
}

impl LoadStage {
    /// Load stage of the given kind
    #[must_use]
    pub fn new(kind: StageKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            store: RecordStore::new(),
        }
    }

    /// Source path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Stage for LoadStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn execute(&self, _input: Option<Dataset>) -> StageResult {
        match self.store.load(&self.path) {
            Ok(dataset) => StageResult::success(dataset),
            Err(error @ Error::UnsupportedFormat(_)) => {
                tracing::warn!(stage = %self.kind, path = %self.path.display(), "{error}");
                StageResult::failure(error)
            }
            Err(error) => {
                tracing::error!(stage = %self.kind, path = %self.path.display(), "{error}");
                StageResult::failure(error)
            }
        }
    }
}

/// Writes the current dataset to `path` and passes it through.
#[derive(Debug, Clone)]
pub struct PersistStage {
    kind: StageKind,
    path: PathBuf,
    store: RecordStore,
}

impl PersistStage {
    /// Persist stage of the given kind
    #[must_use]
    pub fn new(kind: StageKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            store: RecordStore::new(),
        }
    }

    /// Target path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Stage for PersistStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn execute(&self, input: Option<Dataset>) -> StageResult {
        let Some(dataset) = input else {
            tracing::error!(stage = %self.kind, "Nothing to save: no dataset");
            return StageResult::failure(Error::MissingDataset(self.kind.name()));
        };

        match self.store.save(&dataset, &self.path) {
            Ok(()) => StageResult::success(dataset),
            Err(error) => {
                tracing::error!(stage = %self.kind, path = %self.path.display(), "{error}");
                StageResult::partial(dataset, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};
    use std::sync::Arc;

    fn tiny() -> Dataset {
        Dataset::from_columns(vec![(
            "id",
            Arc::new(Int64Array::from(vec![1_i64, 2])) as ArrayRef,
        )])
        .unwrap()
    }

    #[test]
    fn test_persist_then_load_returns_saved_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.parquet");

        let persisted = PersistStage::new(StageKind::PersistCleaned, &path).execute(Some(tiny()));
        assert!(persisted.succeeded());

        let reloaded = LoadStage::new(StageKind::ReloadCleaned, &path).execute(None);
        assert!(reloaded.succeeded());
        assert_eq!(reloaded.dataset.unwrap(), tiny());
    }

    #[test]
    fn test_load_ignores_incoming_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("on_disk.parquet");
        RecordStore::new().save(&tiny(), &path).unwrap();

        let incoming = Dataset::from_columns(vec![(
            "other",
            Arc::new(Int64Array::from(vec![9_i64])) as ArrayRef,
        )])
        .unwrap();
        let result = LoadStage::new(StageKind::ReloadCleaned, &path).execute(Some(incoming));
        assert_eq!(result.dataset.unwrap(), tiny());
    }

    #[test]
    fn test_load_unsupported_extension() {
        let result = LoadStage::new(StageKind::Load, "data/input.pkl").execute(None);
        assert!(!result.succeeded());
        assert!(matches!(result.error, Some(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_persist_without_dataset_fails() {
        let result = PersistStage::new(StageKind::PersistTransformed, "out.parquet").execute(None);
        assert!(matches!(
            result.error,
            Some(Error::MissingDataset("persist_transformed"))
        ));
    }

    #[test]
    fn test_persist_failure_keeps_dataset() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("out.parquet");

        let result = PersistStage::new(StageKind::PersistCleaned, &path).execute(Some(tiny()));
        assert!(!result.succeeded());
        assert!(matches!(result.error, Some(Error::Save(_))));
        assert!(result.dataset.is_some());
    }
}
