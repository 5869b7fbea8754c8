//! Clean stage: null removal, type coercion, constraint filtering

use super::{Stage, StageKind, StageResult};
use crate::dataset::{columns, ColumnType, Dataset, REQUIRED_COLUMNS};
use crate::{Error, Result};
use arrow::array::{
    Array, ArrayRef, ArrowPrimitiveType, AsArray, BooleanArray, Float64Array, Int64Array,
    PrimitiveArray, RecordBatch, StringArray,
};
use arrow::compute::kernels::boolean::{and, is_not_null};
use arrow::compute::kernels::cmp::gt;
use arrow::compute::{cast_with_options, filter_record_batch, CastOptions};
use arrow::datatypes::{DataType, Float64Type, Int64Type, TimestampMillisecondType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::sync::Arc;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Removes incomplete rows, coerces required columns to their declared
/// types and drops rows with non-positive quantity or price.
#[derive(Debug, Default, Clone, Copy)]
pub struct CleanStage;

impl Stage for CleanStage {
    fn kind(&self) -> StageKind {
        StageKind::Clean
    }

    fn execute(&self, input: Option<Dataset>) -> StageResult {
        let Some(dataset) = input else {
            tracing::error!("Error cleaning data: no dataset loaded");
            return StageResult::failure(Error::MissingDataset(self.name()));
        };

        let rows_in = dataset.num_rows();
        let result = clean(dataset);
        match (&result.error, &result.dataset) {
            (None, Some(cleaned)) => tracing::info!(
                rows_in,
                rows_out = cleaned.num_rows(),
                "Data cleaned successfully."
            ),
            (Some(error), _) => tracing::error!("{error}"),
            (None, None) => {}
        }
        result
    }
}

/// Clean a raw dataset.
///
/// On a coercion failure the dataset built so far is returned alongside the
/// error.
#[must_use]
pub fn clean(dataset: Dataset) -> StageResult {
    let mut current = match drop_null_rows(dataset.batch()) {
        Ok(batch) => Dataset::new(batch),
        Err(e) => return StageResult::partial(dataset, Error::cleaning("*", e.to_string())),
    };

    for (name, column_type) in REQUIRED_COLUMNS {
        let Some(array) = current.column(name).cloned() else {
            return StageResult::partial(current, Error::cleaning(name, "column not found"));
        };

        let coerced = match coerce_column(name, &array, column_type) {
            Ok(coerced) => coerced,
            Err(e) => return StageResult::partial(current, e),
        };

        current = match current.with_column(name, coerced) {
            Ok(next) => next,
            Err(e) => return StageResult::partial(current, Error::cleaning(name, e.to_string())),
        };
    }

    match filter_constraints(&current) {
        Ok(filtered) => StageResult::success(filtered),
        Err(e) => StageResult::partial(current, e),
    }
}

/// Keep only rows where every column is non-null.
fn drop_null_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    if batch.columns().iter().all(|c| c.null_count() == 0) {
        return Ok(batch.clone());
    }

    let mut mask: Option<BooleanArray> = None;
    for column in batch.columns() {
        let valid = is_not_null(column.as_ref())?;
        mask = Some(match mask {
            Some(m) => and(&m, &valid)?,
            None => valid,
        });
    }

    match mask {
        Some(m) => Ok(filter_record_batch(batch, &m)?),
        None => Ok(batch.clone()),
    }
}

/// Convert `array` to the Arrow type declared for `column_type`.
///
/// # Errors
/// Returns [`Error::Cleaning`] naming the column and the first bad value
pub fn coerce_column(name: &str, array: &ArrayRef, column_type: ColumnType) -> Result<ArrayRef> {
    let target = column_type.data_type();
    if array.data_type() == &target {
        return Ok(Arc::clone(array));
    }

    match array.data_type() {
        DataType::Utf8 => coerce_strings(name, array.as_string::<i32>(), column_type, &target),
        DataType::LargeUtf8 | DataType::Utf8View => {
            let utf8 = cast_strict(name, array, &DataType::Utf8)?;
            coerce_strings(name, utf8.as_string::<i32>(), column_type, &target)
        }
        _ => cast_strict(name, array, &target),
    }
}

fn coerce_strings(
    name: &str,
    strings: &StringArray,
    column_type: ColumnType,
    target: &DataType,
) -> Result<ArrayRef> {
    let array: ArrayRef = match column_type {
        ColumnType::Integer => Arc::new(parse_column::<Int64Type, _>(
            name,
            strings,
            "integer",
            parse_integer,
        )?),
        ColumnType::Float => Arc::new(parse_column::<Float64Type, _>(
            name,
            strings,
            "float",
            |raw| raw.parse::<f64>().ok(),
        )?),
        ColumnType::DateTime => Arc::new(parse_column::<TimestampMillisecondType, _>(
            name,
            strings,
            "date/time",
            parse_timestamp_millis,
        )?),
        ColumnType::Text | ColumnType::Categorical => {
            let source: ArrayRef = Arc::new(strings.clone());
            cast_strict(name, &source, target)?
        }
    };
    Ok(array)
}

fn parse_column<T, F>(
    name: &str,
    strings: &StringArray,
    expected: &str,
    parse: F,
) -> Result<PrimitiveArray<T>>
where
    T: ArrowPrimitiveType,
    F: Fn(&str) -> Option<T::Native>,
{
    strings
        .iter()
        .enumerate()
        .map(|(row, value)| match value {
            None => Ok(None),
            Some(raw) => parse(raw).map(Some).ok_or_else(|| {
                Error::cleaning(name, format!("row {row}: '{raw}' is not a valid {expected}"))
            }),
        })
        .collect()
}

fn cast_strict(name: &str, array: &ArrayRef, target: &DataType) -> Result<ArrayRef> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    cast_with_options(array, target, &options).map_err(|e| {
        Error::cleaning(
            name,
            format!("cannot convert {} to {target}: {e}", array.data_type()),
        )
    })
}

/// Parse an integer, accepting float literals with no fractional part ("2.0").
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_precision_loss)]
fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then(|| value as i64)
}

/// Parse a date or date-time string to milliseconds since the Unix epoch.
///
/// Naive values are taken as UTC wall-clock time; RFC 3339 values are
/// converted to UTC.
#[must_use]
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp_millis());
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }

    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight.and_utc().timestamp_millis())
    })
}

/// Drop rows where quantity <= 0 or price per unit <= 0.
fn filter_constraints(dataset: &Dataset) -> Result<Dataset> {
    let quantity = dataset.require_column(columns::QUANTITY)?;
    let price = dataset.require_column(columns::PRICE_PER_UNIT)?;

    let quantity_ok = gt(quantity, &Int64Array::new_scalar(0))
        .map_err(|e| Error::cleaning(columns::QUANTITY, e.to_string()))?;
    let price_ok = gt(price, &Float64Array::new_scalar(0.0))
        .map_err(|e| Error::cleaning(columns::PRICE_PER_UNIT, e.to_string()))?;
    let mask = and(&quantity_ok, &price_ok)?;

    Ok(Dataset::new(filter_record_batch(dataset.batch(), &mask)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{DictionaryArray, TimestampMillisecondArray};
    use arrow::datatypes::Int32Type;

    fn raw_dataset(rows: &[[Option<&str>; 8]]) -> Dataset {
        let column = |idx: usize| -> ArrayRef {
            Arc::new(StringArray::from(
                rows.iter().map(|row| row[idx]).collect::<Vec<_>>(),
            ))
        };
        Dataset::from_columns(
            REQUIRED_COLUMNS
                .iter()
                .enumerate()
                .map(|(idx, (name, _))| (*name, column(idx)))
                .collect(),
        )
        .unwrap()
    }

    fn row<'a>(id: &'a str, date: &'a str, qty: &'a str, price: &'a str) -> [Option<&'a str>; 8] {
        [
            Some(id),
            Some(date),
            Some("CUST001"),
            Some("Male"),
            Some("Beauty"),
            Some(qty),
            Some(price),
            Some("100"),
        ]
    }

    #[test]
    fn test_clean_coerces_declared_types() {
        let dataset = raw_dataset(&[row("1", "2024-01-15", "2", "10.0")]);
        let result = clean(dataset);
        assert!(result.succeeded(), "{:?}", result.error);

        let cleaned = result.dataset.unwrap();
        for (name, column_type) in REQUIRED_COLUMNS {
            assert_eq!(
                cleaned.column(name).unwrap().data_type(),
                &column_type.data_type(),
                "column {name}"
            );
        }

        let gender = cleaned.column(columns::GENDER).unwrap();
        let gender = gender
            .as_any()
            .downcast_ref::<DictionaryArray<Int32Type>>()
            .unwrap();
        assert_eq!(gender.len(), 1);
    }

    #[test]
    fn test_clean_drops_rows_with_nulls() {
        let mut incomplete = row("2", "2024-02-01", "1", "5.0");
        incomplete[2] = None;
        let dataset = raw_dataset(&[row("1", "2024-01-15", "2", "10.0"), incomplete]);

        let cleaned = clean(dataset).dataset.unwrap();
        assert_eq!(cleaned.num_rows(), 1);
    }

    #[test]
    fn test_clean_filters_non_positive_values() {
        let dataset = raw_dataset(&[
            row("1", "2024-01-15", "2", "10.0"),
            row("2", "2024-07-01", "-1", "5.0"),
            row("3", "2024-07-01", "0", "5.0"),
            row("4", "2024-07-01", "3", "0"),
            row("5", "2024-07-01", "3", "-2.5"),
        ]);

        let result = clean(dataset);
        assert!(result.succeeded());
        let cleaned = result.dataset.unwrap();
        assert_eq!(cleaned.num_rows(), 1);

        let ids = cleaned
            .column(columns::TRANSACTION_ID)
            .unwrap()
            .as_primitive::<Int64Type>();
        assert_eq!(ids.value(0), 1);
    }

    #[test]
    fn test_clean_bad_date_returns_partial_dataset() {
        let dataset = raw_dataset(&[row("1", "not-a-date", "2", "10.0")]);
        let result = clean(dataset);

        assert!(!result.succeeded());
        match result.error {
            Some(Error::Cleaning { column, reason }) => {
                assert_eq!(column, columns::DATE);
                assert!(reason.contains("not-a-date"));
            }
            other => panic!("expected cleaning error, got {other:?}"),
        }

        // Transaction ID was coerced before the date failed
        let partial = result.dataset.unwrap();
        assert_eq!(
            partial.column(columns::TRANSACTION_ID).unwrap().data_type(),
            &DataType::Int64
        );
        assert_eq!(partial.column(columns::DATE).unwrap().data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_clean_missing_column_fails() {
        let dataset = Dataset::from_columns(vec![(
            columns::TRANSACTION_ID,
            Arc::new(StringArray::from(vec!["1"])) as ArrayRef,
        )])
        .unwrap();

        let result = clean(dataset);
        assert!(matches!(
            result.error,
            Some(Error::Cleaning { ref column, .. }) if column == columns::DATE
        ));
    }

    #[test]
    fn test_clean_stage_without_input_fails() {
        let result = CleanStage.execute(None);
        assert!(matches!(result.error, Some(Error::MissingDataset("clean"))));
    }

    #[test]
    fn test_clean_is_stable_on_cleaned_data() {
        let dataset = raw_dataset(&[row("1", "2024-01-15 10:30:00", "2", "10.0")]);
        let once = clean(dataset).dataset.unwrap();
        let twice = clean(once.clone()).dataset.unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_integer_variants() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-7"), Some(-7));
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer("3.5"), None);
        assert_eq!(parse_integer("abc"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = parse_timestamp_millis("2024-01-15").unwrap();
        assert_eq!(parse_timestamp_millis("2024-01-15 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp_millis("2024-01-15T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp_millis("2024-01-15T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp_millis("01/15/2024"), Some(midnight));
        assert_eq!(
            parse_timestamp_millis("2024-01-15 00:00:01.500"),
            Some(midnight + 1_500)
        );
        assert_eq!(parse_timestamp_millis("2024-13-45"), None);
        assert_eq!(parse_timestamp_millis("yesterday"), None);
    }

    #[test]
    fn test_coerce_passthrough_when_already_typed() {
        let array: ArrayRef = Arc::new(TimestampMillisecondArray::from(vec![0_i64]));
        let coerced = coerce_column(columns::DATE, &array, ColumnType::DateTime).unwrap();
        assert!(Arc::ptr_eq(&array, &coerced));
    }

    #[test]
    fn test_coerce_integer_to_text() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![7_i64]));
        let coerced = coerce_column(columns::CUSTOMER_ID, &array, ColumnType::Text).unwrap();
        assert_eq!(coerced.as_string::<i32>().value(0), "7");
    }
}
