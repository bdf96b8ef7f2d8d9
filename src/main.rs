//! `hop` - drive the launcher core from a terminal.
//!
//! Host data (windows, apps, recents, files, shell actions) is read from a
//! JSON snapshot instead of a desktop session.
//!
//! ```bash
//! hop search "w term" --host-data ~/host.json
//! hop search "zurich weather" --wait-ms 4000
//! hop route "time in zurich"
//! hop insights --sort recent --limit 5
//! ```

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use hop_launcher::clock::{system_clock, SharedClock};
use hop_launcher::config::{load_config, load_config_from, Config, Feature};
use hop_launcher::error::ResultExt;
use hop_launcher::http::ureq_json_fetch;
use hop_launcher::learning::{insights, InsightSort, LearningStore, DEFAULT_INSIGHT_LIMIT};
use hop_launcher::logging;
use hop_launcher::providers::host::HostSnapshot;
use hop_launcher::providers::timezone::{builtin_city_resolver, geocoding_city_resolver};
use hop_launcher::providers::{
    CalculatorProvider, CurrencyProvider, EmojiProvider, FeatureFlags, FilesProvider,
    HostProvider, HostSource, ProviderAggregator, TimezoneProvider, UrlOpener,
    WeatherProvider, WebSearchProvider,
};
use hop_launcher::router::route;
use hop_launcher::{EnterAction, ResultItem, SearchResults, SearchSession};

#[derive(Parser)]
#[command(name = "hop")]
#[command(about = "Query routing and ranking for a desktop launcher")]
#[command(version)]
struct Cli {
    /// Path to config file (default: <config_dir>/hop-launcher/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search and print the ranked rows
    Search {
        query: String,

        /// JSON snapshot of windows, apps, recents, files and actions
        #[arg(long)]
        host_data: Option<PathBuf>,

        /// Press Enter on the Nth row (1-based)
        #[arg(long)]
        activate: Option<usize>,

        /// Wait this long for pending network rows, then search again
        #[arg(long, default_value = "0")]
        wait_ms: u64,

        /// Resolve unknown timezone cities through Open-Meteo geocoding
        #[arg(long)]
        online_timezones: bool,
    },

    /// Show how a query is routed
    Route { query: String },

    /// Most used (query, app) pairs from the learning store
    Insights {
        #[arg(short, long, default_value_t = DEFAULT_INSIGHT_LIMIT)]
        limit: usize,

        /// count | recent
        #[arg(short, long, default_value = "count")]
        sort: String,
    },
}

/// Printable form of a result row.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RowView<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    primary_text: &'a str,
    secondary_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    append_to_end: bool,
}

impl<'a> From<&'a ResultItem> for RowView<'a> {
    fn from(item: &'a ResultItem) -> Self {
        RowView {
            kind: item.kind.as_str(),
            id: item.id.as_deref(),
            primary_text: &item.primary_text,
            secondary_text: &item.secondary_text,
            icon: item.kind.hint_icon_name(),
            append_to_end: item.append_to_end,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init();

    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };

    match cli.command {
        Commands::Search {
            query,
            host_data,
            activate,
            wait_ms,
            online_timezones,
        } => run_search(
            &config,
            cli.format,
            &query,
            host_data,
            activate,
            Duration::from_millis(wait_ms),
            online_timezones,
        ),
        Commands::Route { query } => {
            let routed = route(&query);
            match cli.format {
                OutputFormat::Text => println!("{}\t{}", routed.mode, routed.query),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({"mode": routed.mode, "query": routed.query})
                ),
            }
            Ok(())
        }
        Commands::Insights { limit, sort } => {
            let store = LearningStore::load(&config.get_learning_store_path())?;
            let rows = insights(&store, limit, InsightSort::parse(&sort));
            match cli.format {
                OutputFormat::Text => {
                    for row in &rows {
                        println!("{:>6}  {:<24} {}", row.count, row.query, row.app_id);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
            }
            Ok(())
        }
    }
}

fn system_opener() -> UrlOpener {
    Arc::new(|target: &str| {
        info!(url = target, "Opening");
        let _ = open::that(target).warn_on_err();
    })
}

fn build_aggregator(
    config: &Config,
    host: &HostSnapshot,
    clock: SharedClock,
    online_timezones: bool,
) -> ProviderAggregator {
    let flags = FeatureFlags::from_toggles(&config.get_features());
    let opener = system_opener();
    let fetch = ureq_json_fetch();
    let mut aggregator = ProviderAggregator::new();

    let host_sources = [
        (HostSource::Windows, Feature::Windows),
        (HostSource::Apps, Feature::Apps),
        (HostSource::Recents, Feature::Recents),
    ];
    for (source, feature) in host_sources {
        let provider = HostProvider::fixed(source, host.items(source));
        aggregator.register(flags.gate(feature, Box::new(provider)));
    }
    aggregator.register(Box::new(HostProvider::fixed(
        HostSource::Actions,
        host.items(HostSource::Actions),
    )));

    let files = host.files.clone();
    let files_provider = FilesProvider::new()
        .with_loader(Box::new(move || Ok(files.clone())))
        .with_opener(Arc::clone(&opener));
    aggregator.register(flags.gate(Feature::Files, Box::new(files_provider)));

    aggregator.register(flags.gate(Feature::Calculator, Box::new(CalculatorProvider::new())));
    aggregator.register(flags.gate(
        Feature::Currency,
        Box::new(CurrencyProvider::new(
            config.get_currency().rate_ttl_hours,
            Arc::clone(&clock),
        )),
    ));
    aggregator.register(flags.gate(Feature::Emoji, Box::new(EmojiProvider::new())));

    let resolver = if online_timezones {
        geocoding_city_resolver(Arc::clone(&fetch))
    } else {
        builtin_city_resolver()
    };
    aggregator.register(flags.gate(
        Feature::Timezone,
        Box::new(TimezoneProvider::new(
            &config.get_timezone(),
            resolver,
            Arc::clone(&clock),
        )),
    ));
    aggregator.register(flags.gate(
        Feature::Weather,
        Box::new(WeatherProvider::new(&config.get_weather(), fetch, clock)),
    ));
    aggregator.register(flags.gate(
        Feature::WebSearch,
        Box::new(WebSearchProvider::from_settings(&config.get_web_search(), opener)),
    ));

    aggregator
}

fn has_pending_rows(results: &SearchResults) -> bool {
    results.items.iter().any(|item| {
        item.id
            .as_deref()
            .is_some_and(|id| id.starts_with("weather-pending:") || id.starts_with("timezone-pending:"))
    })
}

fn run_search(
    config: &Config,
    format: OutputFormat,
    query: &str,
    host_data: Option<PathBuf>,
    activate: Option<usize>,
    wait: Duration,
    online_timezones: bool,
) -> Result<()> {
    let host = match host_data {
        Some(path) => HostSnapshot::load(&path)?,
        None => HostSnapshot::default(),
    };

    let clock = system_clock();
    let aggregator = build_aggregator(config, &host, Arc::clone(&clock), online_timezones);
    let mut session = SearchSession::new(config, aggregator, clock);

    let (updated_tx, updated_rx) = mpsc::channel::<()>();
    session.set_update_callback(Some(Arc::new(move || {
        let _ = updated_tx.send(());
    })));
    session.refresh();

    let mut results = session.search_now(query);
    if !wait.is_zero() && has_pending_rows(&results) {
        match updated_rx.recv_timeout(wait) {
            Ok(()) => results = session.search_now(query),
            Err(_) => warn!(wait_ms = wait.as_millis() as u64, "Pending rows did not settle"),
        }
    }

    print_results(&results, format)?;

    if let Some(position) = activate {
        let Some(item) = position.checked_sub(1).and_then(|i| results.items.get(i)) else {
            bail!("no row {} to activate ({} rows)", position, results.items.len());
        };
        match session.activate(&results.route.query, item) {
            EnterAction::Copy { text } => println!("copy: {}", text),
            EnterAction::Execute => println!("executed: {}", item.primary_text),
            EnterAction::None => println!("nothing to do for: {}", item.primary_text),
        }
    }
    Ok(())
}

fn print_results(results: &SearchResults, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("[{}] {}", results.route.mode, results.route.query);
            for (n, item) in results.items.iter().enumerate() {
                println!(
                    "{:>3}. {:<8} {}  ({})",
                    n + 1,
                    item.kind.as_str(),
                    item.primary_text,
                    item.secondary_text
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<RowView<'_>> = results.items.iter().map(RowView::from).collect();
            let body = serde_json::json!({
                "mode": results.route.mode,
                "query": results.route.query,
                "generation": results.generation,
                "items": rows,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}
