//! Transform stage: derived calendar and revenue columns

use super::{Stage, StageKind, StageResult};
use crate::dataset::{columns, Dataset};
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, AsArray, Int32Builder, StringBuilder};
use arrow::compute::cast;
use arrow::compute::kernels::numeric::mul;
use arrow::datatypes::{DataType, TimeUnit, TimestampMillisecondType};
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Meteorological season of a transaction month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    /// December, January, February
    Winter,
    /// March, April, May
    Spring,
    /// June, July, August
    Summer,
    /// September, October, November
    Fall,
}

impl Season {
    /// Season for a month number (1-12).
    ///
    /// 9-11 (and any out-of-range value) map to `Fall`.
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Self::Winter,
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            _ => Self::Fall,
        }
    }

    /// Season name as stored in the dataset
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "Winter",
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full English day name ("Monday")
#[must_use]
pub const fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Appends Day of Week, Month, Season and Revenue.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransformStage;

impl Stage for TransformStage {
    fn kind(&self) -> StageKind {
        StageKind::Transform
    }

    fn execute(&self, input: Option<Dataset>) -> StageResult {
        let Some(dataset) = input else {
            let error = Error::Transformation("input dataset is absent".to_string());
            tracing::error!("{error}");
            return StageResult::failure(error);
        };

        match transform(&dataset) {
            Ok(transformed) => {
                tracing::info!(rows = transformed.num_rows(), "Data transformed successfully.");
                StageResult::success(transformed)
            }
            Err(error) => {
                tracing::error!("{error}");
                StageResult::partial(dataset, error)
            }
        }
    }
}

/// Add the derived columns to a cleaned dataset.
///
/// Existing derived columns are recomputed in place, so applying the
/// transform twice gives the same result as applying it once.
///
/// # Errors
/// Returns [`Error::Transformation`] if the date, quantity or price columns
/// are missing or cannot be converted
#[allow(clippy::cast_possible_wrap)]
pub fn transform(dataset: &Dataset) -> Result<Dataset> {
    let dates = require(dataset, columns::DATE)?;
    let dates = cast(dates, &DataType::Timestamp(TimeUnit::Millisecond, None))
        .map_err(|e| Error::Transformation(format!("'{}' is not a date: {e}", columns::DATE)))?;
    let dates = dates.as_primitive::<TimestampMillisecondType>();

    let mut day_of_week = StringBuilder::with_capacity(dates.len(), dates.len() * 8);
    let mut month = Int32Builder::with_capacity(dates.len());
    let mut season = StringBuilder::with_capacity(dates.len(), dates.len() * 6);

    for millis in dates.iter() {
        match millis.and_then(DateTime::<Utc>::from_timestamp_millis) {
            Some(timestamp) => {
                day_of_week.append_value(day_name(timestamp.weekday()));
                // month() is 1-12
                month.append_value(timestamp.month() as i32);
                season.append_value(Season::from_month(timestamp.month()).as_str());
            }
            None => {
                day_of_week.append_null();
                month.append_null();
                season.append_null();
            }
        }
    }

    let revenue = revenue(dataset)?;

    dataset
        .with_column(columns::DAY_OF_WEEK, Arc::new(day_of_week.finish()))?
        .with_column(columns::MONTH, Arc::new(month.finish()))?
        .with_column(columns::SEASON, Arc::new(season.finish()))?
        .with_column(columns::REVENUE, revenue)
}

/// Quantity x price per unit, as Float64.
fn revenue(dataset: &Dataset) -> Result<ArrayRef> {
    let as_float = |name: &str| -> Result<ArrayRef> {
        cast(require(dataset, name)?, &DataType::Float64)
            .map_err(|e| Error::Transformation(format!("'{name}' is not numeric: {e}")))
    };
    let quantity = as_float(columns::QUANTITY)?;
    let price = as_float(columns::PRICE_PER_UNIT)?;

    mul(&quantity, &price)
        .map_err(|e| Error::Transformation(format!("failed to compute revenue: {e}")))
}

fn require<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a ArrayRef> {
    dataset
        .column(name)
        .ok_or_else(|| Error::Transformation(format!("column '{name}' is missing")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::clean::parse_timestamp_millis;
    use arrow::array::{Float64Array, Int64Array, TimestampMillisecondArray};
    use arrow::datatypes::{Float64Type, Int32Type};

    fn cleaned(dates: &[&str], quantities: &[i64], prices: &[f64]) -> Dataset {
        let millis: Vec<i64> = dates
            .iter()
            .map(|d| parse_timestamp_millis(d).unwrap())
            .collect();
        Dataset::from_columns(vec![
            (
                columns::DATE,
                Arc::new(TimestampMillisecondArray::from(millis)) as ArrayRef,
            ),
            (
                columns::QUANTITY,
                Arc::new(Int64Array::from(quantities.to_vec())) as ArrayRef,
            ),
            (
                columns::PRICE_PER_UNIT,
                Arc::new(Float64Array::from(prices.to_vec())) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_season_mapping() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Spring),
            (4, Season::Spring),
            (5, Season::Spring),
            (6, Season::Summer),
            (7, Season::Summer),
            (8, Season::Summer),
            (9, Season::Fall),
            (10, Season::Fall),
            (11, Season::Fall),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), season, "month {month}");
        }
    }

    #[test]
    fn test_transform_adds_derived_columns() {
        let dataset = cleaned(&["2024-01-15", "2024-07-04"], &[2, 3], &[10.0, 2.5]);
        let transformed = transform(&dataset).unwrap();

        let days = transformed.column(columns::DAY_OF_WEEK).unwrap().as_string::<i32>();
        assert_eq!(days.value(0), "Monday");
        assert_eq!(days.value(1), "Thursday");

        let months = transformed.column(columns::MONTH).unwrap().as_primitive::<Int32Type>();
        assert_eq!(months.value(0), 1);
        assert_eq!(months.value(1), 7);

        let seasons = transformed.column(columns::SEASON).unwrap().as_string::<i32>();
        assert_eq!(seasons.value(0), "Winter");
        assert_eq!(seasons.value(1), "Summer");

        let revenue = transformed
            .column(columns::REVENUE)
            .unwrap()
            .as_primitive::<Float64Type>();
        assert!((revenue.value(0) - 20.0).abs() < f64::EPSILON);
        assert!((revenue.value(1) - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_december_is_winter() {
        let dataset = cleaned(&["2023-12-31 23:59:59"], &[1], &[1.0]);
        let transformed = transform(&dataset).unwrap();
        let months = transformed.column(columns::MONTH).unwrap().as_primitive::<Int32Type>();
        let seasons = transformed.column(columns::SEASON).unwrap().as_string::<i32>();
        assert_eq!(months.value(0), 12);
        assert_eq!(seasons.value(0), "Winter");
    }

    #[test]
    fn test_transform_is_idempotent() {
        let dataset = cleaned(&["2024-03-10"], &[4], &[1.25]);
        let once = transform(&dataset).unwrap();
        let twice = transform(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.batch().num_columns(), 7);
    }

    #[test]
    fn test_transform_stage_absent_input() {
        let result = TransformStage.execute(None);
        assert!(!result.succeeded());
        assert!(matches!(result.error, Some(Error::Transformation(_))));
    }

    #[test]
    fn test_transform_rejects_missing_date() {
        let dataset = Dataset::from_columns(vec![(
            columns::QUANTITY,
            Arc::new(Int64Array::from(vec![1])) as ArrayRef,
        )])
        .unwrap();
        let result = TransformStage.execute(Some(dataset));
        assert!(matches!(result.error, Some(Error::Transformation(ref m)) if m.contains("Date")));
        assert!(result.dataset.is_some());
    }

    #[test]
    fn test_transform_empty_dataset() {
        let dataset = cleaned(&[], &[], &[]);
        let transformed = transform(&dataset).unwrap();
        assert_eq!(transformed.num_rows(), 0);
        assert_eq!(transformed.column(columns::REVENUE).unwrap().len(), 0);
    }
}
