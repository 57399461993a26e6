//! Statement API client and fetch orchestration
//!
//! - api: the `StatementApi` seam
//! - http: reqwest implementation
//! - orchestrator: generation counter and guarded view slots
//! - explorer: statement, flow and net worth explorers
//! - notify: user notifications

pub mod api;
pub mod error;
pub mod explorer;
pub mod http;
pub mod notify;
pub mod orchestrator;

pub use api::StatementApi;
pub use error::{ClientError, ClientResult, Notification};
pub use explorer::{
    ChartMode, CurrencyChange, FlowExplorer, NetWorthExplorer, StatementData, StatementExplorer,
    StatementView,
};
pub use http::HttpStatementClient;
pub use notify::{LogNotifier, Notifier};
pub use orchestrator::{ChartSlot, FetchGeneration};
