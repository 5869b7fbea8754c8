//! # Retail-ETL: Batch ETL Pipeline for Retail Sales Data
//!
//! **Version**: 0.1.0
//!
//! Retail-ETL loads a retail transaction export, cleans and validates it,
//! derives calendar and revenue columns, and persists Arrow/Parquet
//! snapshots, timing every stage and reporting on the history in HTML.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Stop at the first failing stage; never persist unvalidated data
//! - **Poka-Yoke safety**: Unsupported formats and bad paths rejected before any stage runs
//! - **Genchi Genbutsu**: Every entered stage is timed on every exit path
//! - **Muda elimination**: One in-memory Arrow batch per run, no intermediate copies on disk beyond the snapshots
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use retail_etl::config::PipelineConfig;
//! use retail_etl::pipeline::Pipeline;
//! use retail_etl::report::Reporter;
//!
//! let config = PipelineConfig::default();
//! config.validate()?;
//!
//! let mut pipeline = Pipeline::new(&config);
//! let summary = pipeline.run();
//! println!("final state: {}", summary.final_state);
//!
//! let snapshot = pipeline.metrics().snapshot();
//! Reporter::new(&config.report_path).generate(&snapshot);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod stage;
pub mod storage;

pub use config::PipelineConfig;
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use pipeline::{Pipeline, PipelineState, RunSummary};
pub use report::Reporter;
