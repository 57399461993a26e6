//! HTTP implementation of the statement API

use std::time::Duration;

use async_trait::async_trait;
use ledgerlens_config::{ApiConfig, LedgerSettings};
use ledgerlens_core::{
    parse_networth, CoreError, DateWindow, FlowPayload, FlowRequest, NetWorthEntry, OutputFormat,
    PeriodRequest, StatementKind, StatementResponse,
};
use log::debug;

use crate::api::StatementApi;
use crate::error::{ClientError, ClientResult};

const SANKEY_ENDPOINT: &str = "/api/sankey/";
const NETWORTH_ENDPOINT: &str = "/api/networth/";
const CONFIG_ENDPOINT: &str = "/api/getConfig/";

/// Build `path?k=v&..` with percent-encoded values
pub fn build_url(base_url: &str, path: &str, pairs: &[(&str, String)]) -> String {
    let mut url = format!("{}{}", base_url.trim_end_matches('/'), path);
    if !pairs.is_empty() {
        let query: Vec<String> = pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        url.push('?');
        url.push_str(&query.join("&"));
    }
    url
}

/// Status line and body of a 2xx response
struct RawResponse {
    status: u16,
    status_text: String,
    body: String,
}

impl RawResponse {
    fn malformed(self, cause: CoreError) -> ClientError {
        ClientError::malformed(self.status, self.status_text, self.body, cause)
    }
}

/// reqwest-backed statement API client
#[derive(Debug, Clone)]
pub struct HttpStatementClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStatementClient {
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let http = builder.build().map_err(|e| ClientError::InvalidSetup {
            message: e.to_string(),
        })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `url`, failing on a non-2xx status
    async fn get_text(&self, url: &str) -> ClientResult<RawResponse> {
        debug!(target: "ledgerlens::http", "GET {}", url);

        let response = self.http.get(url).send().await.map_err(|e| ClientError::Network {
            message: e.to_string(),
        })?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.map_err(|e| ClientError::Network {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(ClientError::Transport {
                status: status.as_u16(),
                status_text,
                body,
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

#[async_trait]
impl StatementApi for HttpStatementClient {
    async fn statement(
        &self,
        kind: StatementKind,
        request: &PeriodRequest,
    ) -> ClientResult<StatementResponse> {
        let request = request.clone().with_output_format(OutputFormat::Json);
        let url = build_url(&self.base_url, kind.endpoint(), &request.query_pairs());
        let raw = self.get_text(&url).await?;
        StatementResponse::parse(&raw.body).map_err(|e| raw.malformed(e))
    }

    async fn statement_html(&self, kind: StatementKind, request: &PeriodRequest) -> ClientResult<String> {
        let request = request.clone().with_output_format(OutputFormat::Html);
        let url = build_url(&self.base_url, kind.endpoint(), &request.query_pairs());
        Ok(self.get_text(&url).await?.body)
    }

    async fn sankey(&self, request: &FlowRequest) -> ClientResult<FlowPayload> {
        let url = build_url(&self.base_url, SANKEY_ENDPOINT, &request.query_pairs());
        let raw = self.get_text(&url).await?;
        FlowPayload::parse(&raw.body).map_err(|e| raw.malformed(e))
    }

    async fn networth(&self, window: &DateWindow) -> ClientResult<Vec<NetWorthEntry>> {
        let pairs = [("startDate", window.start.clone()), ("endDate", window.end.clone())];
        let url = build_url(&self.base_url, NETWORTH_ENDPOINT, &pairs);
        let raw = self.get_text(&url).await?;
        parse_networth(&raw.body).map_err(|e| raw.malformed(e))
    }

    async fn ledger_settings(&self) -> ClientResult<LedgerSettings> {
        let url = build_url(&self.base_url, CONFIG_ENDPOINT, &[]);
        let raw = self.get_text(&url).await?;
        serde_json::from_str(&raw.body).map_err(|e| raw.malformed(e.into()))
    }
}
