//! Tests for error types

use retail_etl::stage::validate::{ValidationCheck, ValidationFailure};
use retail_etl::Error;

#[test]
fn test_unsupported_format_error() {
    let error = Error::UnsupportedFormat(".pkl".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Unsupported file format"));
    assert!(error_str.contains(".pkl"));
}

#[test]
fn test_load_error() {
    let error = Error::Load("file not found".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Error loading data"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_cleaning_error_names_column() {
    let error = Error::cleaning("Date", "row 3: 'soon' is not a valid date/time");
    let error_str = format!("{error}");
    assert!(error_str.contains("Error cleaning data"));
    assert!(error_str.contains("'Date'"));
    assert!(error_str.contains("soon"));
}

#[test]
fn test_validation_error_names_check() {
    let error = Error::Validation(ValidationFailure {
        check: ValidationCheck::QuantityPositive,
        detail: "min = -1".to_string(),
    });
    let error_str = format!("{error}");
    assert!(error_str.contains("Validation failed"));
    assert!(error_str.contains("Quantity should be positive"));
    assert!(error_str.contains("min = -1"));
}

#[test]
fn test_transformation_error() {
    let error = Error::Transformation("input dataset is absent".to_string());
    assert!(format!("{error}").contains("Error transforming data"));
}

#[test]
fn test_save_error() {
    let error = Error::Save("disk full".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Error saving data"));
    assert!(error_str.contains("disk full"));
}

#[test]
fn test_missing_dataset_error() {
    let error = Error::MissingDataset("persist_cleaned");
    assert!(format!("{error}").contains("persist_cleaned"));
}

#[test]
fn test_config_error() {
    let error = Error::Config("report_path must be an .html file".to_string());
    assert!(format!("{error}").contains("Invalid configuration"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(matches!(error, Error::Json(_)));
}

#[test]
fn test_arrow_error_conversion() {
    let arrow_error = arrow::error::ArrowError::ComputeError("overflow".to_string());
    let error: Error = arrow_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("Arrow error"));
    assert!(error_str.contains("overflow"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error message".to_string());
    assert_eq!(format!("{error}"), "custom error message");
}

#[test]
fn test_error_debug() {
    let error = Error::Report("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Report"));
}
