//! Ledgerlens main entry point

use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use ledgerlens_client::{
    ChartMode, FlowExplorer, HttpStatementClient, LogNotifier, NetWorthExplorer, Notifier,
    StatementApi, StatementExplorer,
};
use ledgerlens_config::error::ConfigErrorSeverity;
use ledgerlens_config::Config;
use ledgerlens_core::{DateRange, Period, Presentation, StatementKind, ValueMode};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "ledgerlens")]
#[command(version = "0.1.0")]
#[command(about = "Drill-down statements and money-flow diagrams from a statement API", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the statement API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Do not overlay account roots and locale served by the API
    #[arg(long)]
    no_remote_settings: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one statement chart
    Statement {
        /// incomestatement or balancesheet
        #[arg(long, default_value = "incomestatement")]
        kind: StatementKind,
        /// Root account, defaults to the expense root (income statement)
        /// or the assets root (balance sheet)
        #[arg(long)]
        root: Option<String>,
        /// Accounts to drill into below the root, in order
        #[arg(long = "drill")]
        drill: Vec<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// M, Q or Y for time-series modes
        #[arg(long, default_value = "M")]
        period: Period,
        /// breakdown, stacked or comparison
        #[arg(long, default_value = "breakdown")]
        mode: ChartMode,
        /// then, end or raw; defaults to then (income statement) or end
        /// (balance sheet)
        #[arg(long)]
        value_mode: Option<ValueMode>,
        /// Print the server-rendered HTML instead of chart data
        #[arg(long)]
        html: bool,
    },
    /// Fetch the money-flow diagram
    Sankey {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Hierarchy depth, full when omitted
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Fetch the net worth series
    Networth {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Print a default configuration file
    Config,
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    presentation: Presentation,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    back: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

fn print_output<T: Serialize>(output: &Output<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    if output.presentation == Presentation::Failed {
        return Err(anyhow!(output.error.clone().unwrap_or_default()));
    }
    Ok(())
}

fn load_config(path: PathBuf) -> anyhow::Result<(Config, Option<String>)> {
    match Config::load(path) {
        Ok(config) => Ok((config, None)),
        Err(e) if e.severity() == ConfigErrorSeverity::Warning => {
            Ok((Config::default(), Some(format!("{}, using defaults", e))))
        }
        Err(e) => Err(anyhow!("{}", e.to_details())),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Command::Config = args.command {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let (mut config, config_warning) = load_config(args.config.clone())?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();
    if let Some(message) = config_warning {
        warn!("{}", message);
    }
    if let Some(base_url) = args.base_url.clone() {
        config.api.base_url = base_url;
        config.validate().map_err(|e| anyhow!("{}", e.to_details()))?;
    }

    let rt = Runtime::new()?;
    rt.block_on(run(args, config))
}

async fn run(args: Args, mut config: Config) -> anyhow::Result<()> {
    let client = HttpStatementClient::new(&config.api)
        .context("Failed to build statement API client")?;
    info!("Statement API: {}", client.base_url());

    if !args.no_remote_settings {
        match client.ledger_settings().await {
            Ok(settings) => config.apply_ledger_settings(&settings),
            Err(e) => warn!("Using local account settings: {}", e),
        }
    }

    let api: Arc<dyn StatementApi> = Arc::new(client);
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    match args.command {
        Command::Statement {
            kind,
            root,
            drill,
            from,
            to,
            period,
            mode,
            value_mode,
            html,
        } => {
            let root = root.unwrap_or_else(|| match kind {
                StatementKind::IncomeStatement => config.accounts.expenses.clone(),
                StatementKind::BalanceSheet => config.accounts.assets.clone(),
            });
            let explorer = StatementExplorer::new(api, notifier, kind, &root, &config);
            let value_mode = value_mode.unwrap_or_else(|| kind.value_mode());
            explorer
                .configure(DateRange::new(from, to), period, mode, value_mode)
                .await;

            if html {
                explorer.drill_to(&drill).await;
                println!("{}", explorer.html().await?);
                return Ok(());
            }

            let presentation = explorer
                .drill_to(&drill)
                .await
                .unwrap_or(Presentation::Loading);
            let snapshot = explorer.snapshot().await;
            let path = explorer.path().await;
            print_output(&Output {
                presentation,
                path: Some(path.segments().to_vec()),
                back: explorer.parent_hint().await,
                error: snapshot.last_error().map(str::to_string),
                data: snapshot.data(),
            })
        }
        Command::Sankey { from, to, depth } => {
            let range = match (from, to) {
                (None, None) => DateRange::trailing_year(Local::now().date_naive()),
                _ => DateRange::new(from, to),
            };
            let explorer = FlowExplorer::new(api, notifier, &config, range);
            let presentation = explorer
                .set_depth(depth)
                .await
                .unwrap_or(Presentation::Loading);
            let snapshot = explorer.snapshot().await;
            print_output(&Output {
                presentation,
                path: None,
                back: None,
                error: snapshot.last_error().map(str::to_string),
                data: snapshot.data(),
            })
        }
        Command::Networth { from, to } => {
            let explorer = NetWorthExplorer::new(api, notifier, &config, DateRange::new(from, to));
            let presentation = explorer.refresh().await.unwrap_or(Presentation::Loading);
            let snapshot = explorer.snapshot().await;
            print_output(&Output {
                presentation,
                path: None,
                back: None,
                error: snapshot.last_error().map(str::to_string),
                data: snapshot.data(),
            })
        }
        Command::Config => Ok(()),
    }
}
