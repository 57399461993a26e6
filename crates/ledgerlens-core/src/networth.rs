//! Net worth over time

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::period::day_label;
use crate::statement::{amount_from_wire, display_currency, null_as_default};
use crate::view::Normalized;

/// One entry of the net worth endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthEntry {
    pub date: String,
    #[serde(deserialize_with = "amount_from_wire")]
    pub networth: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetWorthPoint {
    /// Short month and day, e.g. "Jan 5"
    pub label: String,
    pub date: String,
    pub value: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetWorthSeries {
    pub points: Vec<NetWorthPoint>,
    pub currency: String,
}

impl NetWorthSeries {
    pub fn latest(&self) -> Option<&NetWorthPoint> {
        self.points.last()
    }

    /// Change between the first and the last point
    pub fn change(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.value - first.value,
            _ => 0.0,
        }
    }
}

pub fn parse_networth(body: &str) -> CoreResult<Vec<NetWorthEntry>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Option<Vec<NetWorthEntry>> = serde_json::from_str(body)?;
    Ok(entries.unwrap_or_default())
}

/// Label entries for the chart; an empty list is no data
pub fn networth_series(entries: Vec<NetWorthEntry>, locale: &str) -> Normalized<NetWorthSeries> {
    if entries.is_empty() {
        return Normalized::NoData;
    }
    let currencies: Vec<String> = entries.iter().map(|e| e.currency.clone()).collect();
    let points = entries
        .into_iter()
        .map(|entry| NetWorthPoint {
            label: day_label(&entry.date, locale),
            date: entry.date,
            value: entry.networth,
            currency: entry.currency,
        })
        .collect();
    Normalized::Data(NetWorthSeries {
        points,
        currency: display_currency(&currencies),
    })
}
