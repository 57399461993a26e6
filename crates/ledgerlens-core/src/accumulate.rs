//! Multi-period accumulation into a wide table, one row per period and
//! one column per account

use log::warn;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::period::period_label;
use crate::statement::{distinct_currencies, DateSpan, PeriodBucket};
use crate::view::Normalized;

/// Column of a series table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SeriesColumn {
    /// Key used in the row map
    pub key: String,
    /// Legend label
    pub label: String,
}

impl SeriesColumn {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    /// Column whose key and label are the account name
    pub fn account(name: &str) -> Self {
        Self::new(name, name)
    }
}

/// One period of a series table.
///
/// Serializes flat as `{"period": .., "<key>": value, ..}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeriesRow {
    pub period: String,
    pub dates: DateSpan,
    /// One value per table column, in column order
    pub values: Vec<(String, f64)>,
    pub currency: String,
}

impl ChartSeriesRow {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

impl Serialize for ChartSeriesRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("period", &self.period)?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Chart-ready time-series table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    pub columns: Vec<SeriesColumn>,
    /// Rows in bucket (chronological) order
    pub rows: Vec<ChartSeriesRow>,
    /// Reporting currency of the table
    pub currency: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mixed_currencies: Vec<String>,
}

impl SeriesTable {
    pub fn column_keys(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.key.as_str()).collect()
    }
}

/// Merges per-period breakdowns into a zero-filled wide table
#[derive(Debug, Clone)]
pub struct MultiPeriodAccumulator {
    locale: String,
}

impl MultiPeriodAccumulator {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }

    /// Accumulate buckets into a table.
    ///
    /// Columns are the accounts of all buckets in first-seen order; a
    /// repeated account within one bucket keeps its first value. The
    /// currency is the first bucket's total currency.
    pub fn accumulate(&self, buckets: &[PeriodBucket]) -> Normalized<SeriesTable> {
        let first = match buckets.first() {
            Some(bucket) => bucket,
            None => return Normalized::NoData,
        };

        let mut columns: Vec<SeriesColumn> = Vec::new();
        for bucket in buckets {
            for row in &bucket.data {
                if !columns.iter().any(|c| c.key == row.account) {
                    columns.push(SeriesColumn::account(&row.account));
                }
            }
        }

        let mut all_zero = true;
        let rows: Vec<ChartSeriesRow> = buckets
            .iter()
            .map(|bucket| {
                let values: Vec<(String, f64)> = columns
                    .iter()
                    .map(|column| {
                        let amount = bucket
                            .data
                            .iter()
                            .find(|row| row.account == column.key)
                            .map(|row| row.amount)
                            .unwrap_or(0.0);
                        (column.key.clone(), amount)
                    })
                    .collect();
                if bucket.total.amount != 0.0 || values.iter().any(|(_, v)| *v != 0.0) {
                    all_zero = false;
                }
                ChartSeriesRow {
                    period: period_label(&bucket.dates.from, &self.locale),
                    dates: bucket.dates.clone(),
                    values,
                    currency: bucket.total.currency.clone(),
                }
            })
            .collect();

        if all_zero {
            return Normalized::NoData;
        }

        let mixed = distinct_currencies(buckets.iter().map(|b| b.total.currency.as_str()));
        let mixed_currencies = if mixed.len() > 1 {
            warn!(
                target: "ledgerlens::accumulate",
                "time series mixes currencies across periods: {}",
                mixed.join(", ")
            );
            mixed
        } else {
            Vec::new()
        };

        Normalized::Data(SeriesTable {
            columns,
            rows,
            currency: first.total.currency.clone(),
            mixed_currencies,
        })
    }
}
