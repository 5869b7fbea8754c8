//! Validation stages
//!
//! Validation never mutates the dataset. Checks run in a fixed order and
//! stop at the first violation; the report names the violated check so the
//! runner can log exactly why it halted.

use super::{Stage, StageKind, StageResult};
use crate::dataset::{columns, Dataset};
use crate::Error;
use arrow::array::AsArray;
use arrow::compute::cast;
use arrow::compute::kernels::aggregate::min;
use arrow::datatypes::{DataType, Float64Type};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named validation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCheck {
    /// Transaction ID column has an integer type
    TransactionIdInteger,
    /// Date column has a date/time type
    DateIsDateTime,
    /// Minimum quantity is > 0
    QuantityPositive,
    /// Minimum price per unit is > 0
    PricePositive,
    /// Revenue column exists
    RevenuePresent,
    /// Season column exists
    SeasonPresent,
    /// Minimum revenue is >= 0
    RevenueNonNegative,
}

impl ValidationCheck {
    /// Checks applied to cleaned data, in order
    pub const CLEANED: [Self; 4] = [
        Self::TransactionIdInteger,
        Self::DateIsDateTime,
        Self::QuantityPositive,
        Self::PricePositive,
    ];

    /// Checks applied to transformed data, in order
    pub const TRANSFORMED: [Self; 3] = [
        Self::RevenuePresent,
        Self::SeasonPresent,
        Self::RevenueNonNegative,
    ];

    /// Message logged when the check fails
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TransactionIdInteger => "Transaction Id should be integer",
            Self::DateIsDateTime => "Date should be datetime",
            Self::QuantityPositive => "Quantity should be positive",
            Self::PricePositive => "Price per Unit should be positive",
            Self::RevenuePresent => "Revenue column is missing",
            Self::SeasonPresent => "Season column is missing",
            Self::RevenueNonNegative => "Revenue should be non-negative",
        }
    }

    /// Evaluate this check, returning a failure detail when violated.
    fn evaluate(self, dataset: &Dataset) -> Option<String> {
        match self {
            Self::TransactionIdInteger => {
                type_check(dataset, columns::TRANSACTION_ID, DataType::is_integer)
            }
            Self::DateIsDateTime => type_check(dataset, columns::DATE, |data_type| {
                matches!(
                    data_type,
                    DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64
                )
            }),
            Self::QuantityPositive => min_check(dataset, columns::QUANTITY, |m| m > 0.0),
            Self::PricePositive => min_check(dataset, columns::PRICE_PER_UNIT, |m| m > 0.0),
            Self::RevenuePresent => presence_check(dataset, columns::REVENUE),
            Self::SeasonPresent => presence_check(dataset, columns::SEASON),
            Self::RevenueNonNegative => min_check(dataset, columns::REVENUE, |m| m >= 0.0),
        }
    }
}

impl fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// First violated check and what was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// The violated check
    pub check: ValidationCheck,
    /// Observed value or type
    pub detail: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.check, self.detail)
    }
}

/// Outcome of running a check list against a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    passed: Vec<ValidationCheck>,
    failure: Option<ValidationFailure>,
}

impl ValidationReport {
    /// Run `checks` in order, stopping at the first failure.
    #[must_use]
    pub fn run(dataset: &Dataset, checks: &[ValidationCheck]) -> Self {
        let mut passed = Vec::with_capacity(checks.len());
        for &check in checks {
            if let Some(detail) = check.evaluate(dataset) {
                return Self {
                    passed,
                    failure: Some(ValidationFailure { check, detail }),
                };
            }
            passed.push(check);
        }
        Self {
            passed,
            failure: None,
        }
    }

    /// Whether every check passed
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    /// Checks that passed before evaluation stopped
    #[must_use]
    pub fn passed(&self) -> &[ValidationCheck] {
        &self.passed
    }

    /// The first violated check, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&ValidationFailure> {
        self.failure.as_ref()
    }
}

/// Check cleaned-data invariants: integer id, date/time date, positive
/// quantity and price.
#[must_use]
pub fn validate_cleaned(dataset: &Dataset) -> ValidationReport {
    ValidationReport::run(dataset, &ValidationCheck::CLEANED)
}

/// Check transformed-data invariants: revenue and season present,
/// non-negative revenue.
#[must_use]
pub fn validate_transformed(dataset: &Dataset) -> ValidationReport {
    ValidationReport::run(dataset, &ValidationCheck::TRANSFORMED)
}

fn type_check(dataset: &Dataset, name: &str, accept: impl Fn(&DataType) -> bool) -> Option<String> {
    match dataset.column(name) {
        None => Some(format!("column '{name}' is missing")),
        Some(array) if accept(array.data_type()) => None,
        Some(array) => Some(format!("'{name}' has type {}", array.data_type())),
    }
}

fn presence_check(dataset: &Dataset, name: &str) -> Option<String> {
    (!dataset.has_column(name)).then(|| format!("column '{name}' not found"))
}

/// Evaluate `accept` on the column minimum.
///
/// An empty or all-null column has no minimum and fails the check.
fn min_check(dataset: &Dataset, name: &str, accept: impl Fn(f64) -> bool) -> Option<String> {
    let Some(array) = dataset.column(name) else {
        return Some(format!("column '{name}' is missing"));
    };
    let values = match cast(array, &DataType::Float64) {
        Ok(values) => values,
        Err(e) => return Some(format!("'{name}' is not numeric: {e}")),
    };

    match min(values.as_primitive::<Float64Type>()) {
        Some(minimum) if accept(minimum) => None,
        Some(minimum) => Some(format!("min {name} = {minimum}")),
        None => Some(format!("'{name}' has no values")),
    }
}

fn validation_stage(kind: StageKind, input: Option<Dataset>, checks: &[ValidationCheck]) -> StageResult {
    let Some(dataset) = input else {
        tracing::error!(stage = %kind, "Validation skipped: no dataset");
        return StageResult::failure(Error::MissingDataset(kind.name()));
    };

    let report = ValidationReport::run(&dataset, checks);
    match report.failure {
        None => {
            tracing::info!(stage = %kind, checks = report.passed.len(), "Validation passed.");
            StageResult::success(dataset)
        }
        Some(failure) => {
            tracing::error!(stage = %kind, "Validation failed: {failure}");
            StageResult::partial(dataset, Error::Validation(failure))
        }
    }
}

/// Validates cleaned data and passes it through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidateCleanedStage;

impl Stage for ValidateCleanedStage {
    fn kind(&self) -> StageKind {
        StageKind::ValidateCleaned
    }

    fn execute(&self, input: Option<Dataset>) -> StageResult {
        validation_stage(self.kind(), input, &ValidationCheck::CLEANED)
    }
}

/// Validates transformed data and passes it through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidateTransformedStage;

impl Stage for ValidateTransformedStage {
    fn kind(&self) -> StageKind {
        StageKind::ValidateTransformed
    }

    fn execute(&self, input: Option<Dataset>) -> StageResult {
        validation_stage(self.kind(), input, &ValidationCheck::TRANSFORMED)
    }
}
