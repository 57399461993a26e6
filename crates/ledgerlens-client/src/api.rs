//! The statement API seam

use async_trait::async_trait;
use ledgerlens_config::LedgerSettings;
use ledgerlens_core::{
    DateWindow, FlowPayload, FlowRequest, NetWorthEntry, PeriodRequest, StatementKind,
    StatementResponse,
};

use crate::error::ClientResult;

/// Endpoints the explorers read from.
///
/// Implemented over HTTP by `HttpStatementClient` and by in-memory fakes
/// in tests.
#[async_trait]
pub trait StatementApi: Send + Sync {
    /// JSON statement for `kind`
    async fn statement(
        &self,
        kind: StatementKind,
        request: &PeriodRequest,
    ) -> ClientResult<StatementResponse>;

    /// Same statement rendered as HTML by the server
    async fn statement_html(&self, kind: StatementKind, request: &PeriodRequest) -> ClientResult<String>;

    /// Flow diagram payload
    async fn sankey(&self, request: &FlowRequest) -> ClientResult<FlowPayload>;

    /// Net worth series over an exact window
    async fn networth(&self, window: &DateWindow) -> ClientResult<Vec<NetWorthEntry>>;

    /// Account roots, locale and base currency of the ledger
    async fn ledger_settings(&self) -> ClientResult<LedgerSettings>;
}
