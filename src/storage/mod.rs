//! Record store (CSV ingest, Arrow/Parquet snapshots)
//!
//! **Batch-Only Design**:
//! - One dataset is read fully into memory, processed, and written back whole
//! - Raw exports arrive as CSV; every intermediate snapshot is Parquet
//! - Parquet keeps column types exactly, so a reloaded snapshot compares
//!   equal to the dataset that was saved
//!
//! Format is chosen by file extension. Unknown extensions are rejected with
//! [`Error::UnsupportedFormat`] rather than guessed.

use crate::dataset::Dataset;
use crate::{Error, Result};
use arrow::array::{ArrayRef, RecordBatch, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// On-disk dataset formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// Comma-separated text with a header row
    Csv,
    /// Apache Parquet with embedded Arrow schema
    Parquet,
}

impl DatasetFormat {
    /// Detect the format from a path's extension.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] for any other extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet" | "pq") => Ok(Self::Parquet),
            Some(other) => Err(Error::UnsupportedFormat(format!(".{other}"))),
            None => Err(Error::UnsupportedFormat(format!(
                "{} (no extension)",
                path.as_ref().display()
            ))),
        }
    }
}

/// Field values read as missing in CSV input
pub const CSV_NULL_MARKERS: [&str; 10] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A",
];

/// Loads and saves datasets
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordStore {
    _private: (),
}

impl RecordStore {
    /// Create a record store
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Load a dataset, dispatching on the file extension.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] for unknown extensions and
    /// [`Error::Load`] if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Dataset> {
        let path = path.as_ref();
        let dataset = match DatasetFormat::from_path(path)? {
            DatasetFormat::Csv => Self::load_csv(path)?,
            DatasetFormat::Parquet => Self::load_parquet(path)?,
        };

        tracing::info!(
            path = %path.display(),
            rows = dataset.num_rows(),
            "Data loaded successfully."
        );
        Ok(dataset)
    }

    /// Persist a dataset. Only Parquet targets are writable.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] for non-Parquet targets and
    /// [`Error::Save`] if writing fails
    pub fn save<P: AsRef<Path>>(&self, dataset: &Dataset, path: P) -> Result<()> {
        let path = path.as_ref();
        match DatasetFormat::from_path(path)? {
            DatasetFormat::Parquet => Self::save_parquet(dataset, path)?,
            DatasetFormat::Csv => {
                return Err(Error::UnsupportedFormat(
                    ".csv (snapshots are written as Parquet)".to_string(),
                ))
            }
        }

        tracing::info!(
            path = %path.display(),
            rows = dataset.num_rows(),
            "Data saved successfully."
        );
        Ok(())
    }

    /// Read a CSV file as nullable UTF-8 columns.
    ///
    /// Empty fields and the usual missing-value spellings
    /// ([`CSV_NULL_MARKERS`]) become nulls; typing is left to the clean stage.
    fn load_csv(path: &Path) -> Result<Dataset> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| Error::Load(format!("Failed to open CSV file: {e}")))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::Load(format!("Failed to read CSV headers: {e}")))?
            .clone();

        let mut builders: Vec<StringBuilder> =
            headers.iter().map(|_| StringBuilder::new()).collect();

        for (idx, record) in reader.records().enumerate() {
            // +2: records start after the header, lines are 1-based
            let record = record
                .map_err(|e| Error::Load(format!("CSV parse error at line {}: {e}", idx + 2)))?;
            for (builder, value) in builders.iter_mut().zip(record.iter()) {
                if CSV_NULL_MARKERS.contains(&value) {
                    builder.append_null();
                } else {
                    builder.append_value(value);
                }
            }
        }

        let fields: Vec<Field> = headers
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = builders
            .iter_mut()
            .map(|builder| Arc::new(builder.finish()) as ArrayRef)
            .collect();

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| Error::Load(format!("Failed to build record batch: {e}")))?;
        Ok(Dataset::new(batch))
    }

    /// Load table from Parquet file
    fn load_parquet(path: &Path) -> Result<Dataset> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)
            .map_err(|e| Error::Load(format!("Failed to open Parquet file: {e}")))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| Error::Load(format!("Failed to parse Parquet file: {e}")))?;
        let schema = builder.schema().clone();

        let reader = builder
            .build()
            .map_err(|e| Error::Load(format!("Failed to create Parquet reader: {e}")))?;

        // Read all batches into memory
        let mut batches = Vec::new();
        for batch in reader {
            let batch =
                batch.map_err(|e| Error::Load(format!("Failed to read record batch: {e}")))?;
            batches.push(batch);
        }

        let combined = match batches.len() {
            0 => RecordBatch::new_empty(schema),
            1 => batches.remove(0),
            _ => arrow::compute::concat_batches(&schema, &batches)
                .map_err(|e| Error::Load(format!("Failed to combine batches: {e}")))?,
        };

        Ok(Dataset::new(combined))
    }

    fn save_parquet(dataset: &Dataset, path: &Path) -> Result<()> {
        use parquet::arrow::ArrowWriter;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Save(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let file = File::create(path)
            .map_err(|e| Error::Save(format!("Failed to create Parquet file: {e}")))?;
        let mut writer = ArrowWriter::try_new(file, dataset.schema(), None)
            .map_err(|e| Error::Save(format!("Failed to create Parquet writer: {e}")))?;
        writer
            .write(dataset.batch())
            .map_err(|e| Error::Save(format!("Failed to write record batch: {e}")))?;
        writer
            .close()
            .map_err(|e| Error::Save(format!("Failed to finalize Parquet file: {e}")))?;
        Ok(())
    }
}
