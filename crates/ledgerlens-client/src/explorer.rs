//! Explorers tie drill path, request building, fetching and response
//! shaping together for one chart each.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use ledgerlens_config::{ColorStrategy, Config, SankeyConfig};
use ledgerlens_core::{
    networth_series, positional, Breakdown, ColorAssignment, DateRange, DateWindow, DrillPath,
    FlowDiagram, FlowGraph, FlowRequest, MultiPeriodAccumulator, NetWorthSeries, Normalized,
    Palette, Period, PeriodFormatter, PeriodRequest, Presentation, SeriesColorizer, SeriesTable,
    StatementKind, StatementNormalizer, StatementResponse, ValueMode, ViewState,
};
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::StatementApi;
use crate::error::ClientResult;
use crate::notify::Notifier;
use crate::orchestrator::{ChartSlot, FetchGeneration};

/// Which chart the statement explorer feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartMode {
    /// Single-period pie / ranked bars for the current drill position
    Breakdown,
    /// Per-period stacked bars of the current position's children
    Stacked,
    /// Per-period income vs expenses (or assets vs liabilities)
    Comparison,
}

impl Default for ChartMode {
    fn default() -> Self {
        ChartMode::Breakdown
    }
}

impl std::str::FromStr for ChartMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "breakdown" | "pie" => Ok(ChartMode::Breakdown),
            "stacked" => Ok(ChartMode::Stacked),
            "comparison" | "bar" => Ok(ChartMode::Comparison),
            _ => Err(format!("Invalid chart mode: {}", s)),
        }
    }
}

impl std::fmt::Display for ChartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartMode::Breakdown => write!(f, "breakdown"),
            ChartMode::Stacked => write!(f, "stacked"),
            ChartMode::Comparison => write!(f, "comparison"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementData {
    Breakdown(Breakdown),
    Series(SeriesTable),
}

impl StatementData {
    pub fn currency(&self) -> &str {
        match self {
            StatementData::Breakdown(breakdown) => breakdown.currency(),
            StatementData::Series(table) => &table.currency,
        }
    }

    /// Account (or column) names in chart order
    pub fn series_keys(&self) -> Vec<&str> {
        match self {
            StatementData::Breakdown(breakdown) => {
                breakdown.rows.iter().map(|r| r.account.as_str()).collect()
            }
            StatementData::Series(table) => table.column_keys(),
        }
    }
}

/// Reporting currency changed between two applied responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyChange {
    pub from: String,
    pub to: String,
}

/// What a statement chart renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementView {
    pub data: StatementData,
    pub colors: ColorAssignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_change: Option<CurrencyChange>,
}

#[derive(Debug)]
struct ExplorerState {
    path: DrillPath,
    range: DateRange,
    period: Period,
    mode: ChartMode,
    value_mode: ValueMode,
    view: ViewState<StatementView>,
    colorizer: SeriesColorizer,
    last_currency: Option<String>,
}

/// Parameters captured when a fetch starts
struct FetchTicket {
    generation: u64,
    request: PeriodRequest,
    mode: ChartMode,
    path: DrillPath,
}

/// Drill-down explorer over one statement kind.
///
/// Every parameter change takes a new fetch generation under the same
/// lock that changes the parameters, so a response issued for older
/// parameters can never be applied afterwards.
pub struct StatementExplorer {
    api: Arc<dyn StatementApi>,
    notifier: Arc<dyn Notifier>,
    kind: StatementKind,
    normalizer: StatementNormalizer,
    accumulator: MultiPeriodAccumulator,
    palette: Palette,
    generation: FetchGeneration,
    state: RwLock<ExplorerState>,
}

impl StatementExplorer {
    pub fn new(
        api: Arc<dyn StatementApi>,
        notifier: Arc<dyn Notifier>,
        kind: StatementKind,
        root: &str,
        config: &Config,
    ) -> Self {
        let base_currency = &config.display.base_currency;
        Self {
            api,
            notifier,
            kind,
            normalizer: StatementNormalizer::from_config(config),
            accumulator: MultiPeriodAccumulator::new(config.display.locale.clone()),
            palette: Palette::from_config(&config.charts),
            generation: FetchGeneration::new(),
            state: RwLock::new(ExplorerState {
                path: DrillPath::new(root),
                range: DateRange::default(),
                period: Period::Monthly,
                mode: ChartMode::default(),
                value_mode: kind.value_mode(),
                view: ViewState::new(),
                colorizer: SeriesColorizer::from_config(&config.charts),
                last_currency: (!base_currency.is_empty()).then(|| base_currency.clone()),
            }),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    fn formatter(&self, state: &ExplorerState) -> PeriodFormatter {
        let period = match state.mode {
            ChartMode::Breakdown => Period::Whole,
            ChartMode::Stacked | ChartMode::Comparison => state.period,
        };
        PeriodFormatter::new(self.kind, period).with_value_mode(state.value_mode)
    }

    fn request_for(&self, state: &ExplorerState) -> PeriodRequest {
        let formatter = self.formatter(state);
        match state.mode {
            ChartMode::Breakdown | ChartMode::Stacked => formatter.request(&state.range, &state.path),
            ChartMode::Comparison => formatter.overview_request(&state.range),
        }
    }

    /// Request the current parameters would issue
    pub async fn current_request(&self) -> PeriodRequest {
        let state = self.state.read().await;
        self.request_for(&state)
    }

    fn shape(
        &self,
        mode: ChartMode,
        response: StatementResponse,
        path: &DrillPath,
    ) -> ClientResult<Normalized<StatementData>> {
        Ok(match mode {
            ChartMode::Breakdown => self
                .normalizer
                .breakdown(response, path)?
                .map(StatementData::Breakdown),
            ChartMode::Stacked => self
                .accumulator
                .accumulate(&response.into_buckets())
                .map(StatementData::Series),
            ChartMode::Comparison => self
                .normalizer
                .comparison(response, self.kind)
                .map(StatementData::Series),
        })
    }

    fn decorate(&self, state: &mut ExplorerState, mode: ChartMode, data: StatementData) -> StatementView {
        let keys = data.series_keys();
        let colors = if mode == ChartMode::Comparison || state.colorizer.strategy() == ColorStrategy::Positional {
            positional(&self.palette, keys)
        } else {
            state.colorizer.colorize(keys)
        };

        let currency = data.currency().to_string();
        let mut currency_change = None;
        if !currency.is_empty() {
            if let Some(previous) = state.last_currency.as_deref() {
                if previous != currency {
                    warn!(
                        target: "ledgerlens::explorer",
                        "reporting currency changed from {} to {} at {}",
                        previous,
                        currency,
                        state.path.current()
                    );
                    currency_change = Some(CurrencyChange {
                        from: previous.to_string(),
                        to: currency.clone(),
                    });
                }
            }
            state.last_currency = Some(currency);
        }

        StatementView {
            data,
            colors,
            currency_change,
        }
    }

    /// Take a new generation and capture the request. Must run under the
    /// same write lock as the parameter change it follows.
    fn begin(&self, state: &mut ExplorerState) -> FetchTicket {
        let generation = self.generation.next();
        state.view.begin_loading();
        FetchTicket {
            generation,
            request: self.request_for(state),
            mode: state.mode,
            path: state.path.clone(),
        }
    }

    async fn fetch(&self, ticket: FetchTicket) -> Option<Presentation> {
        let FetchTicket {
            generation,
            request,
            mode,
            path,
        } = ticket;

        let result = match self.api.statement(self.kind, &request).await {
            Ok(response) => self.shape(mode, response, &path),
            Err(error) => Err(error),
        };

        let mut state = self.state.write().await;
        if !self.generation.is_current(generation) {
            debug!(
                target: "ledgerlens::explorer",
                "discarding stale {} response for {}",
                self.kind,
                path.current()
            );
            return None;
        }

        match result {
            Ok(Normalized::Data(data)) => {
                let view = self.decorate(&mut state, mode, data);
                state.view.apply(Normalized::Data(view));
            }
            Ok(Normalized::NoData) => state.view.apply(Normalized::NoData),
            Err(error) => {
                let notification = error.notification();
                self.notifier.notify(&notification);
                state.view.fail(notification.message);
            }
        }
        Some(state.view.presentation())
    }

    /// Apply `change` and, when it reports a change, fetch for the new
    /// parameters.
    async fn update<F>(&self, change: F) -> Option<Presentation>
    where
        F: FnOnce(&mut ExplorerState) -> bool,
    {
        let ticket = {
            let mut state = self.state.write().await;
            if !change(&mut *state) {
                return None;
            }
            self.begin(&mut *state)
        };
        self.fetch(ticket).await
    }

    /// Fetch for the current parameters.
    ///
    /// Returns the new presentation, or `None` when a newer fetch
    /// superseded this one and its response was discarded.
    pub async fn refresh(&self) -> Option<Presentation> {
        self.update(|_| true).await
    }

    /// Drill into `child`. No fetch when it is already the leaf.
    pub async fn push(&self, child: &str) -> Option<Presentation> {
        self.update(|state| state.path.push(child)).await
    }

    /// Go up one level. No fetch at the root.
    pub async fn pop(&self) -> Option<Presentation> {
        self.update(|state| state.path.pop()).await
    }

    /// Restart at a new root. Ignored for a missing or empty root.
    pub async fn reset(&self, root: Option<&str>) -> Option<Presentation> {
        self.update(|state| state.path.reset(root)).await
    }

    /// Set range, period, mode and value mode without fetching.
    ///
    /// Responses still in flight for the old parameters are discarded.
    pub async fn configure(&self, range: DateRange, period: Period, mode: ChartMode, value_mode: ValueMode) {
        let mut state = self.state.write().await;
        state.range = range;
        state.period = period;
        state.mode = mode;
        state.value_mode = value_mode;
        self.generation.next();
    }

    /// Push several levels, then fetch once
    pub async fn drill_to(&self, segments: &[String]) -> Option<Presentation> {
        self.update(|state| {
            for segment in segments {
                state.path.push(segment.as_str());
            }
            true
        })
        .await
    }

    pub async fn set_range(&self, range: DateRange) -> Option<Presentation> {
        self.update(|state| replace(&mut state.range, range)).await
    }

    pub async fn set_period(&self, period: Period) -> Option<Presentation> {
        self.update(|state| replace(&mut state.period, period)).await
    }

    pub async fn set_mode(&self, mode: ChartMode) -> Option<Presentation> {
        self.update(|state| replace(&mut state.mode, mode)).await
    }

    /// Switch between historical (`then`), range-end (`end`) and raw values
    pub async fn set_value_mode(&self, value_mode: ValueMode) -> Option<Presentation> {
        self.update(|state| replace(&mut state.value_mode, value_mode)).await
    }

    pub async fn path(&self) -> DrillPath {
        self.state.read().await.path.clone()
    }

    /// Label of the back button, shown below the root only
    pub async fn parent_hint(&self) -> Option<String> {
        let state = self.state.read().await;
        state.path.parent().map(|parent| format!("Go back to {}", parent))
    }

    pub async fn snapshot(&self) -> ViewState<StatementView> {
        self.state.read().await.view.clone()
    }

    pub async fn presentation(&self) -> Presentation {
        self.state.read().await.view.presentation()
    }

    /// Server-rendered HTML of the current statement
    pub async fn html(&self) -> ClientResult<String> {
        let request = {
            let state = self.state.read().await;
            self.formatter(&state)
                .html_request(&state.range, &state.path, Local::now().date_naive())
        };
        self.api.statement_html(self.kind, &request).await
    }
}

/// Store `value` in `slot`, reporting whether it differed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

// ==================== Flow Diagram ====================

#[derive(Debug, Clone, Copy)]
struct FlowParams {
    range: DateRange,
    /// `None` requests the full hierarchy
    depth: Option<u32>,
}

/// Explorer for the money-flow diagram, keyed by range and depth
pub struct FlowExplorer {
    api: Arc<dyn StatementApi>,
    notifier: Arc<dyn Notifier>,
    sankey: SankeyConfig,
    palette: Palette,
    params: RwLock<FlowParams>,
    slot: ChartSlot<FlowDiagram>,
}

impl FlowExplorer {
    pub fn new(
        api: Arc<dyn StatementApi>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
        range: DateRange,
    ) -> Self {
        Self {
            api,
            notifier,
            sankey: config.sankey.clone(),
            palette: Palette::from_config(&config.charts),
            params: RwLock::new(FlowParams { range, depth: None }),
            slot: ChartSlot::new(),
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    async fn update<F>(&self, change: F) -> Option<Presentation>
    where
        F: FnOnce(&mut FlowParams),
    {
        let (generation, request) = {
            let mut params = self.params.write().await;
            // bump before the key moves; finish never takes `params`
            let generation = self.slot.begin().await;
            change(&mut *params);
            (generation, FlowRequest::new(&params.range, params.depth, Self::today()))
        };

        let result = match request {
            Ok(request) => self.api.sankey(&request).await.and_then(|payload| {
                let graph = FlowGraph::from_payload(payload)?;
                Ok(graph.map(|g| g.diagram(&self.sankey, &self.palette)))
            }),
            Err(error) => Err(error.into()),
        };

        self.slot.finish(generation, result, self.notifier.as_ref()).await
    }

    pub async fn refresh(&self) -> Option<Presentation> {
        self.update(|_| {}).await
    }

    pub async fn set_range(&self, range: DateRange) -> Option<Presentation> {
        self.update(|params| params.range = range).await
    }

    /// `None` requests the full hierarchy; `Some(0)` is rejected
    pub async fn set_depth(&self, depth: Option<u32>) -> Option<Presentation> {
        self.update(|params| params.depth = depth).await
    }

    pub async fn snapshot(&self) -> ViewState<FlowDiagram> {
        self.slot.snapshot().await
    }
}

// ==================== Net Worth ====================

pub struct NetWorthExplorer {
    api: Arc<dyn StatementApi>,
    notifier: Arc<dyn Notifier>,
    locale: String,
    range: RwLock<DateRange>,
    slot: ChartSlot<NetWorthSeries>,
}

impl NetWorthExplorer {
    pub fn new(
        api: Arc<dyn StatementApi>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
        range: DateRange,
    ) -> Self {
        Self {
            api,
            notifier,
            locale: config.display.locale.clone(),
            range: RwLock::new(range),
            slot: ChartSlot::new(),
        }
    }

    async fn fetch(&self, range: Option<DateRange>) -> Option<Presentation> {
        let (generation, window) = {
            let mut current = self.range.write().await;
            let generation = self.slot.begin().await;
            if let Some(range) = range {
                *current = range;
            }
            (generation, DateWindow::exact(&current))
        };

        let result = self
            .api
            .networth(&window)
            .await
            .map(|entries| networth_series(entries, &self.locale));
        self.slot.finish(generation, result, self.notifier.as_ref()).await
    }

    pub async fn refresh(&self) -> Option<Presentation> {
        self.fetch(None).await
    }

    pub async fn set_range(&self, range: DateRange) -> Option<Presentation> {
        self.fetch(Some(range)).await
    }

    pub async fn snapshot(&self) -> ViewState<NetWorthSeries> {
        self.slot.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::notify::testing::RecordingNotifier;
    use async_trait::async_trait;
    use ledgerlens_config::LedgerSettings;
    use ledgerlens_core::{FlowPayload, NetWorthEntry};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn statement_json(account: &str, total: f64, currency: &str, rows: &[(&str, f64)]) -> serde_json::Value {
        let data: Vec<serde_json::Value> = rows
            .iter()
            .map(|(name, amount)| json!({ "account": name, "amount": amount, "currency": currency }))
            .collect();
        json!({
            "dates": { "from": "2024-01-01", "to": "2024-01-31" },
            "data": data,
            "total": { "amount": total, "currency": currency },
            "account": account
        })
    }

    fn unsupported<T>() -> ClientResult<T> {
        Err(ClientError::InvalidSetup {
            message: "not scripted".to_string(),
        })
    }

    /// Answers immediately from a table keyed by requested account
    #[derive(Default)]
    struct FixedApi {
        statements: Mutex<HashMap<String, ClientResult<serde_json::Value>>>,
        requests: Mutex<Vec<PeriodRequest>>,
        sankey: Mutex<Option<serde_json::Value>>,
        networth: Mutex<Option<serde_json::Value>>,
    }

    impl FixedApi {
        fn answer(&self, account: &str, response: ClientResult<serde_json::Value>) {
            self.statements
                .lock()
                .unwrap()
                .insert(account.to_string(), response);
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> PeriodRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl StatementApi for FixedApi {
        async fn statement(
            &self,
            _kind: StatementKind,
            request: &PeriodRequest,
        ) -> ClientResult<StatementResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let scripted = self.statements.lock().unwrap().get(&request.account).cloned();
            match scripted {
                Some(Ok(value)) => Ok(StatementResponse::from_value(value)?),
                Some(Err(error)) => Err(error),
                None => Ok(StatementResponse::Absent),
            }
        }

        async fn statement_html(&self, _kind: StatementKind, request: &PeriodRequest) -> ClientResult<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(format!("<table data-account=\"{}\"></table>", request.account))
        }

        async fn sankey(&self, _request: &FlowRequest) -> ClientResult<FlowPayload> {
            match self.sankey.lock().unwrap().clone() {
                Some(value) => Ok(serde_json::from_value(value).map_err(ledgerlens_core::CoreError::from)?),
                None => unsupported(),
            }
        }

        async fn networth(&self, _window: &DateWindow) -> ClientResult<Vec<NetWorthEntry>> {
            match self.networth.lock().unwrap().clone() {
                Some(value) => Ok(serde_json::from_value(value).map_err(ledgerlens_core::CoreError::from)?),
                None => unsupported(),
            }
        }

        async fn ledger_settings(&self) -> ClientResult<LedgerSettings> {
            Ok(LedgerSettings::default())
        }
    }

    type Gate = oneshot::Sender<ClientResult<serde_json::Value>>;

    /// Requests of one endpoint held until the test answers them
    struct Gates<R> {
        pending: Mutex<Vec<(R, Gate)>>,
    }

    impl<R> Default for Gates<R> {
        fn default() -> Self {
            Self {
                pending: Mutex::new(Vec::new()),
            }
        }
    }

    impl<R: Clone> Gates<R> {
        async fn hold(&self, request: &R) -> ClientResult<serde_json::Value> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push((request.clone(), tx));
            rx.await.unwrap_or_else(|_| {
                Err(ClientError::Network {
                    message: "gate dropped".to_string(),
                })
            })
        }

        async fn wait(&self, count: usize) {
            for _ in 0..10_000 {
                if self.pending.lock().unwrap().len() >= count {
                    return;
                }
                tokio::task::yield_now().await;
            }
            panic!("expected {} pending requests", count);
        }

        fn respond(&self, index: usize, value: serde_json::Value) -> R {
            let (request, gate) = self.pending.lock().unwrap().remove(index);
            let _ = gate.send(Ok(value));
            request
        }
    }

    /// Holds every request until the test answers it
    #[derive(Default)]
    struct GatedApi {
        statements: Gates<PeriodRequest>,
        flows: Gates<FlowRequest>,
        networth: Gates<DateWindow>,
    }

    impl GatedApi {
        async fn wait_pending(&self, count: usize) {
            self.statements.wait(count).await
        }

        fn respond(&self, index: usize, value: serde_json::Value) -> PeriodRequest {
            self.statements.respond(index, value)
        }
    }

    #[async_trait]
    impl StatementApi for GatedApi {
        async fn statement(
            &self,
            _kind: StatementKind,
            request: &PeriodRequest,
        ) -> ClientResult<StatementResponse> {
            let value = self.statements.hold(request).await?;
            Ok(StatementResponse::from_value(value)?)
        }

        async fn statement_html(&self, _kind: StatementKind, _request: &PeriodRequest) -> ClientResult<String> {
            unsupported()
        }

        async fn sankey(&self, request: &FlowRequest) -> ClientResult<FlowPayload> {
            let value = self.flows.hold(request).await?;
            Ok(serde_json::from_value(value).map_err(ledgerlens_core::CoreError::from)?)
        }

        async fn networth(&self, window: &DateWindow) -> ClientResult<Vec<NetWorthEntry>> {
            let value = self.networth.hold(window).await?;
            Ok(serde_json::from_value(value).map_err(ledgerlens_core::CoreError::from)?)
        }

        async fn ledger_settings(&self) -> ClientResult<LedgerSettings> {
            unsupported()
        }
    }

    fn explorer(api: Arc<dyn StatementApi>, notifier: Arc<RecordingNotifier>, root: &str) -> StatementExplorer {
        StatementExplorer::new(api, notifier, StatementKind::IncomeStatement, root, &Config::default())
    }

    #[tokio::test]
    async fn test_breakdown_refresh() {
        let api = Arc::new(FixedApi::default());
        api.answer(
            "expenses",
            Ok(statement_json("expenses", 300.0, "USD", &[("expenses:food", 100.0), ("expenses:rent", 200.0)])),
        );
        let ex = explorer(api.clone(), Arc::new(RecordingNotifier::default()), "expenses");

        assert_eq!(ex.refresh().await, Some(Presentation::Ready));
        let request = api.last_request();
        assert_eq!(request.account, "expenses");
        assert_eq!(request.depth, Some(2));

        let snapshot = ex.snapshot().await;
        let view = snapshot.data().unwrap();
        match &view.data {
            StatementData::Breakdown(b) => {
                assert_eq!(b.total.amount, -300.0);
                assert_eq!(b.rows[0].account, "expenses:rent");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(view.colors.color_for("expenses:rent"), Some("var(--chart-1)"));
    }

    #[tokio::test]
    async fn test_redundant_push_and_root_pop_do_not_fetch() {
        let api = Arc::new(FixedApi::default());
        api.answer("income", Ok(statement_json("income", 10.0, "USD", &[("income:salary", 10.0)])));
        api.answer("income:salary", Ok(statement_json("income:salary", 10.0, "USD", &[])));
        let ex = explorer(api.clone(), Arc::new(RecordingNotifier::default()), "income");

        ex.refresh().await;
        assert_eq!(ex.pop().await, None);
        assert_eq!(api.request_count(), 1);

        assert!(ex.push("income:salary").await.is_some());
        assert_eq!(ex.push("income:salary").await, None);
        assert_eq!(api.request_count(), 2);
        assert_eq!(api.last_request().depth, Some(3));
        assert_eq!(ex.parent_hint().await.as_deref(), Some("Go back to income"));

        assert!(ex.pop().await.is_some());
        assert_eq!(api.last_request().account, "income");
        assert_eq!(ex.parent_hint().await, None);
    }

    #[tokio::test]
    async fn test_reset_requires_root() {
        let api = Arc::new(FixedApi::default());
        let ex = explorer(api.clone(), Arc::new(RecordingNotifier::default()), "income");

        assert_eq!(ex.reset(None).await, None);
        assert_eq!(ex.reset(Some("")).await, None);
        assert_eq!(api.request_count(), 0);

        assert_eq!(ex.reset(Some("expenses")).await, Some(Presentation::NoData));
        assert_eq!(ex.path().await.current(), "expenses");
    }

    #[tokio::test]
    async fn test_zero_total_is_no_data() {
        let api = Arc::new(FixedApi::default());
        api.answer("income", Ok(statement_json("income", 0.0, "USD", &[])));
        let ex = explorer(api, Arc::new(RecordingNotifier::default()), "income");
        assert_eq!(ex.refresh().await, Some(Presentation::NoData));
    }

    #[tokio::test]
    async fn test_transport_error_keeps_last_good() {
        let api = Arc::new(FixedApi::default());
        let notifier = Arc::new(RecordingNotifier::default());
        api.answer("income", Ok(statement_json("income", 50.0, "USD", &[("income:salary", 50.0)])));
        api.answer(
            "income:salary",
            Err(ClientError::Transport {
                status: 500,
                status_text: "Internal Server Error".to_string(),
                body: "boom".to_string(),
            }),
        );
        let ex = explorer(api, notifier.clone(), "income");

        ex.refresh().await;
        assert_eq!(ex.push("income:salary").await, Some(Presentation::Ready));

        let snapshot = ex.snapshot().await;
        assert!(matches!(
            snapshot.data().map(|v| &v.data),
            Some(StatementData::Breakdown(b)) if b.account == "income"
        ));
        assert_eq!(
            notifier.messages(),
            vec!["Error fetching data: (500) Internal Server Error : boom"]
        );
        assert!(snapshot.last_error().is_some());
    }

    #[tokio::test]
    async fn test_malformed_body_is_notified() {
        let api = Arc::new(FixedApi::default());
        let notifier = Arc::new(RecordingNotifier::default());
        api.answer("income", Ok(json!({ "data": [] })));
        let ex = explorer(api, notifier.clone(), "income");

        assert_eq!(ex.refresh().await, Some(Presentation::Failed));
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_comparison_mode_request_and_colors() {
        let api = Arc::new(FixedApi::default());
        api.answer(
            "",
            Ok(json!([
                {
                    "dates": { "from": "2024-01-01", "to": "2024-01-31" },
                    "data": [
                        { "account": "income", "amount": -900, "currency": "USD" },
                        { "account": "expenses", "amount": 400, "currency": "USD" }
                    ],
                    "total": { "amount": -500, "currency": "USD" }
                }
            ])),
        );
        let ex = explorer(api.clone(), Arc::new(RecordingNotifier::default()), "expenses");

        assert_eq!(ex.set_mode(ChartMode::Comparison).await, Some(Presentation::Ready));
        let request = api.last_request();
        assert_eq!(request.account, "");
        assert_eq!(request.depth, Some(1));
        assert_eq!(request.period, Period::Monthly);

        let snapshot = ex.snapshot().await;
        let view = snapshot.data().unwrap();
        assert_eq!(view.colors.color_for("income"), Some("var(--chart-1)"));
        assert_eq!(view.colors.color_for("expense"), Some("var(--chart-2)"));
    }

    #[tokio::test]
    async fn test_stacked_mode_uses_drill_position() {
        let api = Arc::new(FixedApi::default());
        api.answer(
            "expenses",
            Ok(json!([
                {
                    "dates": { "from": "2024-01-01", "to": "2024-01-31" },
                    "data": [{ "account": "expenses:food", "amount": 10, "currency": "USD" }],
                    "total": { "amount": 10, "currency": "USD" }
                },
                {
                    "dates": { "from": "2024-02-01", "to": "2024-02-29" },
                    "data": [{ "account": "expenses:rent", "amount": 20, "currency": "USD" }],
                    "total": { "amount": 20, "currency": "USD" }
                }
            ])),
        );
        let ex = explorer(api.clone(), Arc::new(RecordingNotifier::default()), "expenses");
        ex.set_mode(ChartMode::Stacked).await;

        let request = api.last_request();
        assert_eq!(request.account, "expenses");
        assert_eq!(request.depth, Some(2));

        let snapshot = ex.snapshot().await;
        match &snapshot.data().unwrap().data {
            StatementData::Series(table) => {
                assert_eq!(table.rows.len(), 2);
                assert_eq!(table.rows[0].get("expenses:rent"), Some(0.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_currency_change_recorded() {
        let api = Arc::new(FixedApi::default());
        api.answer("assets", Ok(statement_json("assets", 100.0, "USD", &[("assets:eu", 100.0)])));
        api.answer("assets:eu", Ok(statement_json("assets:eu", 90.0, "EUR", &[("assets:eu:bank", 90.0)])));
        let ex = StatementExplorer::new(
            api,
            Arc::new(RecordingNotifier::default()),
            StatementKind::BalanceSheet,
            "assets",
            &Config::default(),
        );

        ex.refresh().await;
        assert!(ex.snapshot().await.data().unwrap().currency_change.is_none());

        ex.push("assets:eu").await;
        let snapshot = ex.snapshot().await;
        assert_eq!(
            snapshot.data().unwrap().currency_change,
            Some(CurrencyChange {
                from: "USD".to_string(),
                to: "EUR".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_sticky_colors_survive_drill() {
        let api = Arc::new(FixedApi::default());
        api.answer(
            "expenses",
            Ok(statement_json("expenses", 30.0, "USD", &[("expenses:food", 20.0), ("expenses:rent", 10.0)])),
        );
        api.answer(
            "expenses:food",
            Ok(statement_json("expenses:food", 20.0, "USD", &[("expenses:food:out", 15.0), ("expenses:food:home", 5.0)])),
        );
        let mut config = Config::default();
        config.charts.color_strategy = ColorStrategy::Sticky;
        let ex = StatementExplorer::new(
            api,
            Arc::new(RecordingNotifier::default()),
            StatementKind::IncomeStatement,
            "expenses",
            &config,
        );

        ex.refresh().await;
        ex.push("expenses:food").await;
        ex.pop().await;
        let snapshot = ex.snapshot().await;
        let colors = &snapshot.data().unwrap().colors;
        assert_eq!(colors.slot_for("expenses:food"), Some(0));
        assert_eq!(colors.slot_for("expenses:rent"), Some(1));
    }

    #[tokio::test]
    async fn test_configure_then_drill_fetches_once() {
        let api = Arc::new(FixedApi::default());
        let ex = explorer(api.clone(), Arc::new(RecordingNotifier::default()), "expenses");
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
        );
        ex.configure(range, Period::Quarterly, ChartMode::Stacked, ValueMode::Then).await;
        assert_eq!(api.request_count(), 0);

        let segments = vec!["expenses:food".to_string(), "expenses:food:out".to_string()];
        ex.drill_to(&segments).await;
        assert_eq!(api.request_count(), 1);

        let request = api.last_request();
        assert_eq!(request.account, "expenses:food:out");
        assert_eq!(request.depth, Some(4));
        assert_eq!(request.start_date, "2024-02-01");
        assert_eq!(request.end_date, "2024-05-31");
        assert_eq!(request.period, Period::Quarterly);
    }

    #[tokio::test]
    async fn test_html_uses_current_position_and_exclusive_end() {
        let api = Arc::new(FixedApi::default());
        let ex = explorer(api.clone(), Arc::new(RecordingNotifier::default()), "income");
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        ex.configure(range, Period::Monthly, ChartMode::Breakdown, ValueMode::Then).await;

        let html = ex.html().await.unwrap();
        assert!(html.contains("data-account=\"income\""));

        let request = api.last_request();
        assert_eq!(request.start_date, "2024-01-01");
        assert_eq!(request.end_date, "2025-01-01");
        assert_eq!(request.output_format, ledgerlens_core::OutputFormat::Html);
        assert_eq!(request.period, Period::Whole);
    }

    #[tokio::test]
    async fn test_value_mode_is_part_of_request() {
        let api = Arc::new(FixedApi::default());
        api.answer("income", Ok(statement_json("income", 10.0, "USD", &[("income:salary", 10.0)])));
        let ex = explorer(api.clone(), Arc::new(RecordingNotifier::default()), "income");

        ex.refresh().await;
        assert_eq!(api.last_request().value_mode, ValueMode::Then);

        assert_eq!(ex.set_value_mode(ValueMode::Then).await, None);
        assert_eq!(api.request_count(), 1);

        assert_eq!(ex.set_value_mode(ValueMode::Raw).await, Some(Presentation::Ready));
        let request = api.last_request();
        assert_eq!(request.value_mode, ValueMode::Raw);
        assert!(request.query_pairs().contains(&("valueMode", String::new())));
        assert_eq!(ex.current_request().await.value_mode, ValueMode::Raw);
    }

    #[tokio::test]
    async fn test_base_currency_seeds_currency_change() {
        let api = Arc::new(FixedApi::default());
        api.answer("assets", Ok(statement_json("assets", 90.0, "EUR", &[("assets:bank", 90.0)])));
        let mut config = Config::default();
        config.display.base_currency = "USD".to_string();
        let ex = StatementExplorer::new(
            api,
            Arc::new(RecordingNotifier::default()),
            StatementKind::BalanceSheet,
            "assets",
            &config,
        );

        ex.refresh().await;
        assert_eq!(
            ex.snapshot().await.data().unwrap().currency_change,
            Some(CurrencyChange {
                from: "USD".to_string(),
                to: "EUR".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_stale_response_discarded() {
        let api = Arc::new(GatedApi::default());
        let ex = Arc::new(explorer(api.clone(), Arc::new(RecordingNotifier::default()), "expenses"));

        let first = tokio::spawn({
            let ex = ex.clone();
            async move { ex.refresh().await }
        });
        api.wait_pending(1).await;

        let second = tokio::spawn({
            let ex = ex.clone();
            async move { ex.push("expenses:food").await }
        });
        api.wait_pending(2).await;

        let request = api.respond(
            1,
            statement_json("expenses:food", 40.0, "USD", &[("expenses:food:out", 40.0)]),
        );
        assert_eq!(request.account, "expenses:food");
        assert_eq!(second.await.unwrap(), Some(Presentation::Ready));

        api.respond(0, statement_json("expenses", 99.0, "USD", &[("expenses:food", 99.0)]));
        assert_eq!(first.await.unwrap(), None);

        let snapshot = ex.snapshot().await;
        match &snapshot.data().unwrap().data {
            StatementData::Breakdown(b) => assert_eq!(b.account, "expenses:food"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_flow_explorer() {
        let api = Arc::new(FixedApi::default());
        *api.sankey.lock().unwrap() = Some(json!({
            "currency": "USD",
            "sankeyData": {
                "nodes": [{ "name": "income" }, { "name": "expenses" }],
                "links": [{ "source": 0, "target": 1, "value": 1500 }]
            }
        }));
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        let ex = FlowExplorer::new(api.clone(), Arc::new(RecordingNotifier::default()), &Config::default(), range);

        assert_eq!(ex.refresh().await, Some(Presentation::Ready));
        let snapshot = ex.snapshot().await;
        let diagram = snapshot.data().unwrap();
        assert_eq!(diagram.canvas.width, 2 * 100 + 15);
        assert_eq!(diagram.links[0].label, "1.5K USD");

        *api.sankey.lock().unwrap() = Some(json!({ "sankeyData": { "nodes": [], "links": [] } }));
        assert_eq!(ex.set_depth(Some(2)).await, Some(Presentation::NoData));
    }

    #[tokio::test]
    async fn test_networth_explorer() {
        let api = Arc::new(FixedApi::default());
        *api.networth.lock().unwrap() = Some(json!([
            { "date": "2024-01-01", "networth": 100, "currency": "USD" },
            { "date": "2024-01-02", "networth": 120, "currency": "USD" }
        ]));
        let ex = NetWorthExplorer::new(
            api.clone(),
            Arc::new(RecordingNotifier::default()),
            &Config::default(),
            DateRange::default(),
        );
        assert_eq!(ex.refresh().await, Some(Presentation::Ready));
        assert_eq!(ex.snapshot().await.data().unwrap().points[1].label, "Jan 2");

        *api.networth.lock().unwrap() = None;
        assert_eq!(ex.refresh().await, Some(Presentation::Ready));
        assert!(ex.snapshot().await.last_error().is_some());
    }

    #[tokio::test]
    async fn test_response_discarded_once_push_has_started() {
        let api = Arc::new(GatedApi::default());
        let ex = Arc::new(explorer(api.clone(), Arc::new(RecordingNotifier::default()), "expenses"));

        let first = tokio::spawn({
            let ex = ex.clone();
            async move { ex.refresh().await }
        });
        api.wait_pending(1).await;

        // park the push on the state lock, then let the old response arrive
        let reader = ex.state.read().await;
        let second = tokio::spawn({
            let ex = ex.clone();
            async move { ex.push("expenses:food").await }
        });
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
        api.respond(0, statement_json("expenses", 99.0, "USD", &[("expenses:food", 99.0)]));
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
        drop(reader);

        assert_eq!(first.await.unwrap(), None);
        api.wait_pending(1).await;
        let request = api.respond(
            0,
            statement_json("expenses:food", 40.0, "USD", &[("expenses:food:out", 40.0)]),
        );
        assert_eq!(request.account, "expenses:food");
        assert_eq!(second.await.unwrap(), Some(Presentation::Ready));

        match &ex.snapshot().await.data().unwrap().data {
            StatementData::Breakdown(b) => assert_eq!(b.account, "expenses:food"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_configure_discards_in_flight_response() {
        let api = Arc::new(GatedApi::default());
        let ex = Arc::new(explorer(api.clone(), Arc::new(RecordingNotifier::default()), "expenses"));

        let first = tokio::spawn({
            let ex = ex.clone();
            async move { ex.refresh().await }
        });
        api.wait_pending(1).await;

        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
        );
        ex.configure(range, Period::Quarterly, ChartMode::Stacked, ValueMode::Then).await;

        api.respond(0, statement_json("expenses", 99.0, "USD", &[("expenses:food", 99.0)]));
        assert_eq!(first.await.unwrap(), None);
        assert!(ex.snapshot().await.data().is_none());
    }

    #[tokio::test]
    async fn test_flow_explorer_discards_superseded_response() {
        let api = Arc::new(GatedApi::default());
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        let ex = Arc::new(FlowExplorer::new(
            api.clone(),
            Arc::new(RecordingNotifier::default()),
            &Config::default(),
            range,
        ));

        let first = tokio::spawn({
            let ex = ex.clone();
            async move { ex.refresh().await }
        });
        api.flows.wait(1).await;
        let second = tokio::spawn({
            let ex = ex.clone();
            async move { ex.set_depth(Some(2)).await }
        });
        api.flows.wait(2).await;

        let old = api.flows.respond(
            0,
            json!({
                "currency": "USD",
                "sankeyData": {
                    "nodes": [{ "name": "income" }, { "name": "expenses" }],
                    "links": [{ "source": 0, "target": 1, "value": 900 }]
                }
            }),
        );
        assert_eq!(old.depth, None);
        assert_eq!(first.await.unwrap(), None);

        let new = api.flows.respond(
            0,
            json!({
                "currency": "USD",
                "sankeyData": {
                    "nodes": [{ "name": "income" }, { "name": "expenses" }],
                    "links": [{ "source": 0, "target": 1, "value": 1500 }]
                }
            }),
        );
        assert_eq!(new.depth, Some(2));
        assert_eq!(second.await.unwrap(), Some(Presentation::Ready));
        assert_eq!(ex.snapshot().await.data().unwrap().links[0].value, 1500.0);
    }

    #[tokio::test]
    async fn test_flow_explorer_rejects_zero_depth() {
        let api = Arc::new(FixedApi::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let ex = FlowExplorer::new(api, notifier.clone(), &Config::default(), DateRange::default());

        assert_eq!(ex.set_depth(Some(0)).await, Some(Presentation::Failed));
        assert_eq!(notifier.messages().len(), 1);
        assert!(notifier.messages()[0].contains("depth"));
    }

    #[tokio::test]
    async fn test_networth_explorer_discards_superseded_response() {
        let api = Arc::new(GatedApi::default());
        let ex = Arc::new(NetWorthExplorer::new(
            api.clone(),
            Arc::new(RecordingNotifier::default()),
            &Config::default(),
            DateRange::default(),
        ));

        let first = tokio::spawn({
            let ex = ex.clone();
            async move { ex.refresh().await }
        });
        api.networth.wait(1).await;
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        let second = tokio::spawn({
            let ex = ex.clone();
            async move { ex.set_range(range).await }
        });
        api.networth.wait(2).await;

        let old = api.networth.respond(
            0,
            json!([{ "date": "2020-01-01", "networth": 1, "currency": "USD" }]),
        );
        assert_eq!(old.start, "");
        assert_eq!(first.await.unwrap(), None);

        let new = api.networth.respond(
            0,
            json!([{ "date": "2024-01-01", "networth": 500, "currency": "USD" }]),
        );
        assert_eq!(new.start, "2024-01-01");
        assert_eq!(second.await.unwrap(), Some(Presentation::Ready));
        assert_eq!(ex.snapshot().await.data().unwrap().points[0].value, 500.0);
    }
}
