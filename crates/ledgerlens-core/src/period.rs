//! Period formatting: turns a picked date range and granularity into
//! statement API query parameters

use chrono::{Datelike, Locale, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::drill::DrillPath;
use crate::error::{CoreError, CoreResult};
use crate::types::{OutputFormat, Period, StatementKind, ValueMode};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date range as picked by the user; either end may be unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    /// Inclusive last day
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// The year ending today, used by the flow diagram page
    pub fn trailing_year(today: NaiveDate) -> Self {
        let from = today
            .with_year(today.year() - 1)
            .or_else(|| today.pred_opt().and_then(|d| d.with_year(today.year() - 1)));
        Self { from, to: Some(today) }
    }
}

/// Format a date for the API, empty when unset
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn epoch_month_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Start and end date strings sent to the API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: String,
    pub end: String,
}

impl DateWindow {
    /// The range as picked, unset ends stay empty
    pub fn exact(range: &DateRange) -> Self {
        Self {
            start: format_date(range.from),
            end: format_date(range.to),
        }
    }

    /// Rounded out to whole months.
    ///
    /// Time-series buckets line up with calendar months; an unset end
    /// falls back to January 1970.
    pub fn whole_months(range: &DateRange) -> Self {
        let start = first_day_of_month(range.from.unwrap_or_else(epoch_month_start));
        let end = last_day_of_month(range.to.unwrap_or_else(epoch_month_start));
        Self {
            start: format_date(Some(start)),
            end: format_date(Some(end)),
        }
    }

    /// End moved one day past the inclusive `to`; an unset `to` becomes today
    pub fn exclusive_end(range: &DateRange, today: NaiveDate) -> Self {
        let end = match range.to {
            Some(to) => to.succ_opt().unwrap_or(to),
            None => today,
        };
        Self {
            start: format_date(range.from),
            end: format_date(Some(end)),
        }
    }
}

/// Query parameters of one statement request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodRequest {
    pub start_date: String,
    pub end_date: String,
    pub period: Period,
    pub value_mode: ValueMode,
    /// Account scope, empty for the ledger root
    pub account: String,
    pub depth: Option<u32>,
    pub output_format: OutputFormat,
}

impl PeriodRequest {
    /// Query pairs in the order the dashboard sends them
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("outputFormat", self.output_format.to_string()),
            ("startDate", self.start_date.clone()),
            ("endDate", self.end_date.clone()),
        ];
        if !self.account.is_empty() {
            pairs.push(("account", self.account.clone()));
        }
        if let Some(depth) = self.depth {
            pairs.push(("depth", depth.to_string()));
        }
        pairs.push(("valueMode", self.value_mode.code().to_string()));
        pairs.push(("period", self.period.code().to_string()));
        pairs
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}

/// Builds statement requests for one chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodFormatter {
    pub kind: StatementKind,
    pub period: Period,
    pub value_mode: ValueMode,
}

impl PeriodFormatter {
    pub fn new(kind: StatementKind, period: Period) -> Self {
        Self {
            kind,
            period,
            value_mode: kind.value_mode(),
        }
    }

    pub fn with_value_mode(mut self, value_mode: ValueMode) -> Self {
        self.value_mode = value_mode;
        self
    }

    /// Window for this granularity: exact for a single aggregate,
    /// whole months for a time series
    pub fn window(&self, range: &DateRange) -> DateWindow {
        if self.period.is_time_series() {
            DateWindow::whole_months(range)
        } else {
            DateWindow::exact(range)
        }
    }

    /// Request scoped to the current drill position
    pub fn request(&self, range: &DateRange, path: &DrillPath) -> PeriodRequest {
        let window = self.window(range);
        PeriodRequest {
            start_date: window.start,
            end_date: window.end,
            period: self.period,
            value_mode: self.value_mode,
            account: path.current().to_string(),
            depth: Some(path.depth()),
            output_format: OutputFormat::Json,
        }
    }

    /// Server-rendered statement at the current position. The end date is
    /// one day past the inclusive `to`, or today when unset.
    pub fn html_request(&self, range: &DateRange, path: &DrillPath, today: NaiveDate) -> PeriodRequest {
        let window = DateWindow::exclusive_end(range, today);
        PeriodRequest {
            start_date: window.start,
            end_date: window.end,
            period: self.period,
            value_mode: self.value_mode,
            account: path.current().to_string(),
            depth: None,
            output_format: OutputFormat::Html,
        }
    }

    /// Top-level request (depth 1, ledger root), used by comparison charts
    pub fn overview_request(&self, range: &DateRange) -> PeriodRequest {
        let window = self.window(range);
        PeriodRequest {
            start_date: window.start,
            end_date: window.end,
            period: self.period,
            value_mode: self.value_mode,
            account: String::new(),
            depth: Some(1),
            output_format: OutputFormat::Json,
        }
    }
}

/// Query parameters of the flow diagram endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowRequest {
    pub start_date: String,
    pub end_date: String,
    /// `None` requests the full hierarchy
    pub depth: Option<u32>,
}

impl FlowRequest {
    /// Depth must be at least 1 when given
    pub fn new(range: &DateRange, depth: Option<u32>, today: NaiveDate) -> CoreResult<Self> {
        if depth == Some(0) {
            return Err(CoreError::InvalidParameter {
                name: "depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let window = DateWindow::exclusive_end(range, today);
        Ok(Self {
            start_date: window.start,
            end_date: window.end,
            depth,
        })
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("startDate", self.start_date.clone()),
            ("endDate", self.end_date.clone()),
            ("depth", self.depth.map(|d| d.to_string()).unwrap_or_default()),
        ]
    }
}

// ==================== Labels ====================

/// Resolve a BCP 47 tag such as "en-US" to a chrono locale
pub fn resolve_locale(tag: &str) -> Locale {
    let normalized = tag.trim().replace('-', "_");
    Locale::try_from(normalized.as_str()).unwrap_or(Locale::POSIX)
}

fn parse_api_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

/// Bucket label: short month and two-digit year, e.g. "Jan 24".
/// Unparseable dates are returned unchanged.
pub fn period_label(from: &str, locale: &str) -> String {
    match parse_api_date(from) {
        Some(date) => date.format_localized("%b %y", resolve_locale(locale)).to_string(),
        None => from.to_string(),
    }
}

/// Day label: short month and day, e.g. "Jan 5"
pub fn day_label(date: &str, locale: &str) -> String {
    match parse_api_date(date) {
        Some(d) => d.format_localized("%b %-d", resolve_locale(locale)).to_string(),
        None => date.to_string(),
    }
}
