//! Core statement drill-down and flow graph engine
//!
//! Everything here is synchronous and free of I/O: request building,
//! drill path state, response normalization, accumulation, colors and
//! flow graph metadata. The client crate feeds it HTTP bodies.

pub mod accumulate;
pub mod color;
pub mod drill;
pub mod error;
pub mod flow;
pub mod networth;
pub mod period;
pub mod statement;
pub mod types;
pub mod view;

pub use accumulate::{ChartSeriesRow, MultiPeriodAccumulator, SeriesColumn, SeriesTable};
pub use color::{positional, ColorAssignment, Palette, SeriesColorizer};
pub use drill::DrillPath;
pub use error::{CoreError, CoreResult, ErrorSeverity};
pub use flow::{CanvasSize, FlowDiagram, FlowGraph, FlowLink, FlowNode, FlowPayload};
pub use networth::{networth_series, parse_networth, NetWorthEntry, NetWorthPoint, NetWorthSeries};
pub use period::{DateRange, DateWindow, FlowRequest, PeriodFormatter, PeriodRequest};
pub use statement::{
    display_currency, Breakdown, DateSpan, PeriodBucket, StatementNormalizer, StatementResponse,
    StatementRow, StatementTotal,
};
pub use types::{OutputFormat, Period, StatementKind, ValueMode};
pub use view::{Normalized, Presentation, ViewState};
