//! Basic request vocabulary for the statement API

use serde::{Deserialize, Serialize};

/// Statement kind, which is also the API path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// Income statement (revenues and expenses over a range)
    IncomeStatement,
    /// Balance sheet (assets and liabilities)
    BalanceSheet,
}

impl StatementKind {
    /// Value mode each statement is requested with
    pub fn value_mode(&self) -> ValueMode {
        match self {
            StatementKind::IncomeStatement => ValueMode::Then,
            StatementKind::BalanceSheet => ValueMode::End,
        }
    }

    /// API path of the statement endpoint
    pub fn endpoint(&self) -> &'static str {
        match self {
            StatementKind::IncomeStatement => "/api/incomestatement/",
            StatementKind::BalanceSheet => "/api/balancesheet/",
        }
    }
}

impl std::str::FromStr for StatementKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incomestatement" | "income" | "is" => Ok(StatementKind::IncomeStatement),
            "balancesheet" | "balance" | "bs" => Ok(StatementKind::BalanceSheet),
            _ => Err(format!("Invalid statement kind: {}", s)),
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementKind::IncomeStatement => write!(f, "incomestatement"),
            StatementKind::BalanceSheet => write!(f, "balancesheet"),
        }
    }
}

/// Period granularity of a statement request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// One aggregate over the whole range
    #[serde(rename = "")]
    Whole,
    #[serde(rename = "M")]
    Monthly,
    #[serde(rename = "Q")]
    Quarterly,
    #[serde(rename = "Y")]
    Yearly,
}

impl Period {
    /// Wire code sent as the `period` query parameter
    pub fn code(&self) -> &'static str {
        match self {
            Period::Whole => "",
            Period::Monthly => "M",
            Period::Quarterly => "Q",
            Period::Yearly => "Y",
        }
    }

    pub fn is_time_series(&self) -> bool {
        !matches!(self, Period::Whole)
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Whole
    }
}

impl std::str::FromStr for Period {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Period::Whole),
            "M" | "m" => Ok(Period::Monthly),
            "Q" | "q" => Ok(Period::Quarterly),
            "Y" | "y" => Ok(Period::Yearly),
            _ => Err(format!("Invalid period: {}", s)),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// How amounts are valued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    /// Raw amounts, no valuation
    #[serde(rename = "")]
    Raw,
    /// Valued as of the posting date
    Then,
    /// Valued at the end of the range
    End,
}

impl ValueMode {
    pub fn code(&self) -> &'static str {
        match self {
            ValueMode::Raw => "",
            ValueMode::Then => "then",
            ValueMode::End => "end",
        }
    }
}

impl Default for ValueMode {
    fn default() -> Self {
        ValueMode::Raw
    }
}

impl std::str::FromStr for ValueMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "raw" => Ok(ValueMode::Raw),
            "then" => Ok(ValueMode::Then),
            "end" => Ok(ValueMode::End),
            _ => Err(format!("Invalid value mode: {}", s)),
        }
    }
}

impl std::fmt::Display for ValueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Response body format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Html,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}
