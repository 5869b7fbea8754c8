//! Pipeline configuration
//!
//! Paths for the input dataset, the two persisted snapshots and the report.
//! Loaded from a JSON file or built in code, then checked with
//! [`PipelineConfig::validate`] before any stage runs.

use crate::storage::DatasetFormat;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths the pipeline reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw input dataset (`.csv` or `.parquet`)
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// Cleaned snapshot, reloaded before transformation
    #[serde(default = "default_cleaned_path")]
    pub cleaned_path: PathBuf,

    /// Transformed output
    #[serde(default = "default_transformed_path")]
    pub transformed_path: PathBuf,

    /// HTML report; charts and `metrics.json` land beside it
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

fn default_input_path() -> PathBuf {
    PathBuf::from("data/retail_sales_dataset.csv")
}

fn default_cleaned_path() -> PathBuf {
    PathBuf::from("cleaned_data.parquet")
}

fn default_transformed_path() -> PathBuf {
    PathBuf::from("transform_data.parquet")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("reports/etl_report.html")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            cleaned_path: default_cleaned_path(),
            transformed_path: default_transformed_path(),
            report_path: default_report_path(),
        }
    }
}

impl PipelineConfig {
    /// Create a builder starting from the default paths.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load configuration from a JSON file.
    ///
    /// Missing keys fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize configuration to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the input is not a loadable format, a
    /// snapshot path is not Parquet, or the report path is not `.html`.
    pub fn validate(&self) -> Result<()> {
        DatasetFormat::from_path(&self.input_path).map_err(|e| {
            Error::Config(format!("input_path {}: {e}", self.input_path.display()))
        })?;

        for (field, path) in [
            ("cleaned_path", &self.cleaned_path),
            ("transformed_path", &self.transformed_path),
        ] {
            match DatasetFormat::from_path(path) {
                Ok(DatasetFormat::Parquet) => {}
                _ => {
                    return Err(Error::Config(format!(
                        "{field} must be a .parquet file, got {}",
                        path.display()
                    )))
                }
            }
        }

        let is_html = self
            .report_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
        if !is_html {
            return Err(Error::Config(format!(
                "report_path must be an .html file, got {}",
                self.report_path.display()
            )));
        }

        Ok(())
    }
}

/// Builder for [`PipelineConfig`]
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the raw input path.
    #[must_use]
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_path = path.into();
        self
    }

    /// Set the cleaned snapshot path.
    #[must_use]
    pub fn cleaned_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cleaned_path = path.into();
        self
    }

    /// Set the transformed output path.
    #[must_use]
    pub fn transformed_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.transformed_path = path.into();
        self
    }

    /// Set the report path.
    #[must_use]
    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.report_path = path.into();
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
