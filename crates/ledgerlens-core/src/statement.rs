//! Statement normalization
//!
//! The statement API answers with either one period object
//! `{data, dates, total}` or an array of them. This module parses both
//! shapes and turns them into chart-ready values: a sorted breakdown for
//! drill-down views, and a two-column comparison table for time-series
//! bar views.

use ledgerlens_config::{AccountsConfig, Config};
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::accumulate::{ChartSeriesRow, SeriesColumn, SeriesTable};
use crate::drill::DrillPath;
use crate::error::{CoreError, CoreResult};
use crate::period::period_label;
use crate::types::StatementKind;
use crate::view::Normalized;

// ==================== Wire Types ====================

pub(crate) fn amount_from_wire<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(value) => Ok(value),
        Amount::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {}", text))),
    }
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One account line of a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub account: String,
    #[serde(deserialize_with = "amount_from_wire")]
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
}

/// Aggregate for the requested account and depth
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTotal {
    #[serde(deserialize_with = "amount_from_wire")]
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub to: String,
}

/// One period of a statement response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    #[serde(default, deserialize_with = "null_as_default")]
    pub dates: DateSpan,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<StatementRow>,
    pub total: StatementTotal,
}

/// Parsed statement body
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResponse {
    Single(PeriodBucket),
    /// Buckets in chronological order
    Series(Vec<PeriodBucket>),
    /// `null` or empty body
    Absent,
}

impl StatementResponse {
    /// Parse a raw JSON body
    pub fn parse(body: &str) -> CoreResult<Self> {
        if body.trim().is_empty() {
            return Ok(StatementResponse::Absent);
        }
        let value: serde_json::Value = serde_json::from_str(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> CoreResult<Self> {
        if value.is_null() {
            return Ok(StatementResponse::Absent);
        }
        if value.is_array() {
            let buckets: Vec<PeriodBucket> = serde_json::from_value(value)?;
            return Ok(StatementResponse::Series(buckets));
        }
        if !value.is_object() {
            return Err(CoreError::MalformedResponse {
                message: format!("expected an object or an array, got {}", value),
            });
        }
        if value.get("total").is_none() {
            return Err(CoreError::MissingField {
                field: "total".to_string(),
            });
        }
        Ok(StatementResponse::Single(serde_json::from_value(value)?))
    }

    /// Flatten into a bucket list, single objects becoming one bucket
    pub fn into_buckets(self) -> Vec<PeriodBucket> {
        match self {
            StatementResponse::Single(bucket) => vec![bucket],
            StatementResponse::Series(buckets) => buckets,
            StatementResponse::Absent => Vec::new(),
        }
    }
}

// ==================== Normalized Shapes ====================

/// Single-period breakdown for pie and ranked-bar views
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    /// Account the breakdown is scoped to
    pub account: String,
    pub dates: DateSpan,
    /// Rows by descending amount, ties in response order
    pub rows: Vec<StatementRow>,
    /// Headline total, negated under the expense root
    pub total: StatementTotal,
    /// Distinct currencies when the response mixes them, else empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mixed_currencies: Vec<String>,
}

impl Breakdown {
    pub fn currency(&self) -> &str {
        &self.total.currency
    }
}

/// Distinct non-empty currencies in first-seen order
pub(crate) fn distinct_currencies<'a>(currencies: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for currency in currencies {
        if !currency.is_empty() && !seen.iter().any(|c| c == currency) {
            seen.push(currency.to_string());
        }
    }
    seen
}

/// Currency shown on axes for a sequence of rows: row `ceil(n/2)`,
/// else row 0, else empty
pub fn display_currency(currencies: &[String]) -> String {
    let middle = (currencies.len() + 1) / 2;
    currencies
        .get(middle)
        .or_else(|| currencies.first())
        .cloned()
        .unwrap_or_default()
}

/// Column pair compared by the time-series bar view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonColumns {
    pub first: SeriesColumn,
    pub first_account: String,
    pub second: SeriesColumn,
    pub second_account: String,
}

impl ComparisonColumns {
    pub fn for_kind(kind: StatementKind, accounts: &AccountsConfig) -> Self {
        match kind {
            StatementKind::IncomeStatement => Self {
                first: SeriesColumn::new("income", "Income"),
                first_account: accounts.income.clone(),
                second: SeriesColumn::new("expense", "Expenses"),
                second_account: accounts.expenses.clone(),
            },
            StatementKind::BalanceSheet => Self {
                first: SeriesColumn::new("assets", "Assets"),
                first_account: accounts.assets.clone(),
                second: SeriesColumn::new("liabilities", "Liabilities"),
                second_account: accounts.liabilities.clone(),
            },
        }
    }
}

// ==================== Normalizer ====================

/// Shapes statement responses using the configured account roots
#[derive(Debug, Clone)]
pub struct StatementNormalizer {
    accounts: AccountsConfig,
    locale: String,
}

impl StatementNormalizer {
    pub fn new(accounts: AccountsConfig, locale: impl Into<String>) -> Self {
        Self {
            accounts,
            locale: locale.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.accounts.clone(), config.display.locale.clone())
    }

    pub fn accounts(&self) -> &AccountsConfig {
        &self.accounts
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Whether totals of `account` are shown sign-flipped
    pub fn is_expense(&self, account: &str) -> bool {
        account.starts_with(self.accounts.expenses.as_str())
    }

    /// Normalize a single-period response for the current drill position.
    ///
    /// A zero total is no data. Row amounts keep the API's sign; only the
    /// headline total is negated under the expense root.
    pub fn breakdown(
        &self,
        response: StatementResponse,
        path: &DrillPath,
    ) -> CoreResult<Normalized<Breakdown>> {
        let bucket = match response {
            StatementResponse::Absent => return Ok(Normalized::NoData),
            StatementResponse::Single(bucket) => bucket,
            StatementResponse::Series(mut buckets) => {
                if buckets.len() != 1 {
                    return Err(CoreError::MalformedResponse {
                        message: format!(
                            "expected a single-period statement, got {} periods",
                            buckets.len()
                        ),
                    });
                }
                buckets.remove(0)
            }
        };

        if bucket.total.amount == 0.0 {
            debug!(target: "ledgerlens::statement", "zero total for {}", path.current());
            return Ok(Normalized::NoData);
        }

        let PeriodBucket { dates, mut data, mut total } = bucket;
        // stable: equal amounts keep response order
        data.sort_by(|a, b| b.amount.total_cmp(&a.amount));

        if self.is_expense(path.current()) {
            total.amount = -total.amount;
        }

        let mut mixed = distinct_currencies(
            data.iter()
                .map(|r| r.currency.as_str())
                .chain(std::iter::once(total.currency.as_str())),
        );
        if mixed.len() > 1 {
            warn!(
                target: "ledgerlens::statement",
                "statement for {} mixes currencies: {}",
                path.current(),
                mixed.join(", ")
            );
        } else {
            mixed.clear();
        }

        Ok(Normalized::Data(Breakdown {
            account: path.current().to_string(),
            dates,
            rows: data,
            total,
            mixed_currencies: mixed,
        }))
    }

    /// Normalize a time-series response into an income/expense (or
    /// assets/liabilities) comparison table.
    ///
    /// Each bucket's values come from the rows whose account equals the
    /// configured root exactly; a missing match reads as 0.
    pub fn comparison(
        &self,
        response: StatementResponse,
        kind: StatementKind,
    ) -> Normalized<SeriesTable> {
        let buckets = response.into_buckets();
        if buckets.is_empty() {
            return Normalized::NoData;
        }

        let columns = ComparisonColumns::for_kind(kind, &self.accounts);
        let mut rows = Vec::with_capacity(buckets.len());
        let mut all_zero = true;

        for bucket in &buckets {
            let first = bucket.data.iter().find(|r| r.account == columns.first_account);
            let second = bucket.data.iter().find(|r| r.account == columns.second_account);

            let currency = first
                .or(second)
                .map(|r| r.currency.clone())
                .unwrap_or_default();
            let first_amount = first.map(|r| r.amount).unwrap_or(0.0);
            let second_amount = second.map(|r| r.amount).unwrap_or(0.0);
            if first_amount != 0.0 || second_amount != 0.0 || bucket.total.amount != 0.0 {
                all_zero = false;
            }

            rows.push(ChartSeriesRow {
                period: period_label(&bucket.dates.from, &self.locale),
                dates: bucket.dates.clone(),
                values: vec![
                    (columns.first.key.clone(), first_amount),
                    (columns.second.key.clone(), second_amount),
                ],
                currency,
            });
        }

        if all_zero {
            return Normalized::NoData;
        }

        let row_currencies: Vec<String> = rows.iter().map(|r| r.currency.clone()).collect();
        let mixed = distinct_currencies(row_currencies.iter().map(String::as_str));
        if mixed.len() > 1 {
            warn!(
                target: "ledgerlens::statement",
                "{} series mixes currencies: {}",
                kind,
                mixed.join(", ")
            );
        }

        Normalized::Data(SeriesTable {
            columns: vec![columns.first, columns.second],
            rows,
            currency: display_currency(&row_currencies),
            mixed_currencies: if mixed.len() > 1 { mixed } else { Vec::new() },
        })
    }
}
