//! Dataset: one Arrow record batch of sales transactions
//!
//! The pipeline moves a single [`Dataset`] from stage to stage. Columns are
//! addressed by name; the names below are the ones the retail sales export
//! uses.

use crate::{Error, Result};
use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::Arc;

/// Column names used by the pipeline
pub mod columns {
    /// Transaction identifier (integer)
    pub const TRANSACTION_ID: &str = "Transaction ID";
    /// Transaction date (timestamp)
    pub const DATE: &str = "Date";
    /// Customer identifier (string)
    pub const CUSTOMER_ID: &str = "Customer ID";
    /// Gender (categorical)
    pub const GENDER: &str = "Gender";
    /// Product category (categorical)
    pub const PRODUCT_CATEGORY: &str = "Product Category";
    /// Units sold (integer)
    pub const QUANTITY: &str = "Quantity";
    /// Unit price (float)
    pub const PRICE_PER_UNIT: &str = "Price per Unit";
    /// Transaction total as exported (float)
    pub const TOTAL_AMOUNT: &str = "Total Amount";

    /// Derived: English day name of the transaction date
    pub const DAY_OF_WEEK: &str = "Day of Week";
    /// Derived: month number 1-12
    pub const MONTH: &str = "Month";
    /// Derived: meteorological season
    pub const SEASON: &str = "Season";
    /// Derived: quantity x price per unit
    pub const REVENUE: &str = "Revenue";
}

/// Declared type of a required column after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit signed integer
    Integer,
    /// Millisecond timestamp without timezone
    DateTime,
    /// UTF-8 string
    Text,
    /// Dictionary-encoded string
    Categorical,
    /// 64-bit float
    Float,
}

impl ColumnType {
    /// Arrow type a column of this kind is stored as.
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Self::Integer => DataType::Int64,
            Self::DateTime => DataType::Timestamp(TimeUnit::Millisecond, None),
            Self::Text => DataType::Utf8,
            Self::Categorical => {
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
            }
            Self::Float => DataType::Float64,
        }
    }
}

/// Required columns and their declared types, in coercion order.
pub const REQUIRED_COLUMNS: [(&str, ColumnType); 8] = [
    (columns::TRANSACTION_ID, ColumnType::Integer),
    (columns::DATE, ColumnType::DateTime),
    (columns::CUSTOMER_ID, ColumnType::Text),
    (columns::GENDER, ColumnType::Categorical),
    (columns::PRODUCT_CATEGORY, ColumnType::Categorical),
    (columns::QUANTITY, ColumnType::Integer),
    (columns::PRICE_PER_UNIT, ColumnType::Float),
    (columns::TOTAL_AMOUNT, ColumnType::Float),
];

/// An ordered table of typed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Wrap an existing record batch.
    #[must_use]
    pub const fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Build a dataset from named columns.
    ///
    /// # Errors
    /// Returns error if the columns have different lengths
    pub fn from_columns(columns: Vec<(&str, ArrayRef)>) -> Result<Self> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        let arrays = columns.into_iter().map(|(_, array)| array).collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self { batch })
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Consume the dataset, returning the record batch
    #[must_use]
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// Schema of the dataset
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Whether the dataset has a column called `name`
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// Look up a column by name, failing with a descriptive error.
    ///
    /// # Errors
    /// Returns [`Error::Other`] if the column does not exist
    pub fn require_column(&self, name: &str) -> Result<&ArrayRef> {
        self.column(name)
            .ok_or_else(|| Error::Other(format!("Column not found: {name}")))
    }

    /// Return a copy of this dataset with `name` set to `array`.
    ///
    /// An existing column keeps its position; a new one is appended.
    ///
    /// # Errors
    /// Returns error if `array` length differs from the row count
    pub fn with_column(&self, name: &str, array: ArrayRef) -> Result<Self> {
        let schema = self.batch.schema();
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut arrays: Vec<ArrayRef> = self.batch.columns().to_vec();
        let field = Field::new(name, array.data_type().clone(), true);

        match schema.index_of(name) {
            Ok(idx) => {
                fields[idx] = field;
                arrays[idx] = array;
            }
            Err(_) => {
                fields.push(field);
                arrays.push(array);
            }
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self { batch })
    }
}

impl From<RecordBatch> for Dataset {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}
