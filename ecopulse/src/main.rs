use anyhow::Context;
use clap::{Parser, Subcommand};
use ecopulse::{
    ClientConfig, Dashboard, GeminiClient, MockRemoteQuery, NewsCategory, NewsService, PulseError, RateLimiter,
    Region, RemoteQuery, RetryPolicy, API_KEY_VAR,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ecopulse", version, about = "Economic news and market indices from a grounded AI search backend")]
struct Cli {
    /// Gemini API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "ECOPULSE_BASE_URL")]
    base_url: Option<String>,

    /// Use canned sample data instead of calling the backend
    #[arg(long)]
    offline: bool,

    #[arg(long, default_value_t = 3)]
    retries: u32,

    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch news for a region and sector, or search within a region
    News {
        #[arg(long, default_value = "domestic")]
        region: Region,
        #[arg(long, default_value = "ALL")]
        category: NewsCategory,
        #[arg(long)]
        query: Option<String>,
    },
    /// Fetch the latest market index values
    Indices,
    /// Write a market insight report on a topic
    Insight { topic: String },
    /// Load news and indices, then keep the indices fresh until Ctrl-C
    Watch {
        #[arg(long, default_value = "domestic")]
        region: Region,
        #[arg(long, default_value = "ALL")]
        category: NewsCategory,
        /// Index refresh period; defaults to ten minutes
        #[arg(long)]
        refresh_seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(api_key) = &cli.api_key {
        config.api_key = api_key.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    config.max_retries = cli.retries;
    config.retry_delay_ms = cli.retry_delay_ms;

    if cli.offline {
        info!("Running offline with sample data");
        run(cli.command, MockRemoteQuery::sample(), &config).await
    } else {
        let client = GeminiClient::new(config.clone()).context("failed to build HTTP client")?;
        run(cli.command, client, &config).await
    }
}

async fn run<Q: RemoteQuery + 'static>(command: Command, backend: Q, config: &ClientConfig) -> anyhow::Result<()> {
    let service = NewsService::new(backend).with_retry_policy(RetryPolicy::new(config.max_retries, config.retry_delay()));

    if !service.is_configured() {
        return Err(PulseError::MissingApiKey {
            var: API_KEY_VAR.to_string(),
        }
        .into());
    }

    match command {
        Command::News {
            region,
            category,
            query,
        } => {
            let feed = service.fetch_economic_news(region, category, query.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&feed)?);
        }
        Command::Indices => {
            let indices = service.fetch_market_indices().await?;
            println!("{}", serde_json::to_string_pretty(&indices)?);
        }
        Command::Insight { topic } => {
            let report = service.get_deep_insight(&topic).await?;
            println!("{}", report);
        }
        Command::Watch {
            region,
            category,
            refresh_seconds,
        } => {
            let limiter = Arc::new(RateLimiter::with_interval(config.rate_limit_interval()));
            let dashboard = Dashboard::with_limiter(Arc::new(service), limiter);
            dashboard.set_region(region).await;
            dashboard.set_sector(category).await;
            let every = refresh_seconds
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.index_refresh_interval())
                .max(Duration::from_secs(1));
            watch(dashboard, every).await?;
        }
    }

    Ok(())
}

async fn watch<Q: RemoteQuery + 'static>(dashboard: Dashboard<Q>, every: Duration) -> anyhow::Result<()> {
    let (outcome, indices_loaded) = dashboard.refresh_all().await;
    info!("Initial load: news {:?}, indices loaded: {}", outcome, indices_loaded);
    println!("{}", serde_json::to_string_pretty(&dashboard.snapshot().await)?);

    let refresh = dashboard.spawn_index_refresh(every);
    let mut report = tokio::time::interval(every);
    report.tick().await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
            _ = report.tick() => {
                let state = dashboard.snapshot().await;
                if state.indices.is_empty() {
                    warn!("No market indices available");
                }
                println!("{}", serde_json::to_string_pretty(&state.indices)?);
            }
        }
    }

    info!("Stopping market index refresh");
    refresh.stop().await;
    Ok(())
}
