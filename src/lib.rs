pub mod advisor;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod market;
pub mod models;
pub mod report;
pub mod server;
pub mod session;

#[cfg(test)]
mod testutil;

use advisor::AdviceOptions;
use cli::Args;
use config::field_map::load_field_map;
use config::prompt::load_prompts;
use llm::chat::new_client;
use llm::LlmConfig;
use log::info;
use market::coingecko::CoinGeckoClient;
use market::TrendingPoller;
use report::{ create_report_source, ReportAggregator };
use server::api::{ router, AppState };
use server::Server;
use session::SessionStore;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("Market Feed: {}", args.market_base_url);
    info!("Market Category: {} ({} per page)", args.market_category, args.market_per_page);
    info!("Trending Refresh: {}s", args.trending_refresh_secs);
    info!("Report Source: {}", args.report_source);
    info!("Scan Base URL: {}", args.scan_base_url);
    info!("Scan Field Map: {}", args.scan_field_map_path.as_deref().unwrap_or("built-in"));
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("provider default"));
    info!("Sessions: max {} (idle {}s)", args.max_sessions, args.session_idle_secs);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("-------------------------");

    if args.max_sessions == 0 {
        return Err("MAX_SESSIONS must be greater than zero".into());
    }

    let prompts = load_prompts(args.prompts_path.as_deref())?;
    let field_map = load_field_map(args.scan_field_map_path.as_deref())?;

    let feed = Arc::new(CoinGeckoClient::from_args(&args)?);
    let poller = Arc::new(
        TrendingPoller::new(feed, Duration::from_secs(args.trending_refresh_secs))?
    );
    let poll_task = Arc::clone(&poller).spawn();

    let source = create_report_source(&args, field_map)?;
    let aggregator = ReportAggregator::new(source);

    let llm_config = LlmConfig::from_args(&args)?;
    let chat_client = new_client(&llm_config)?;
    info!("Advice model: {}", chat_client.get_model());

    let state = AppState {
        poller,
        aggregator,
        chat_client,
        prompts,
        advice_options: AdviceOptions {
            temperature: args.advice_temperature,
            max_tokens: args.advice_max_tokens,
        },
        sessions: Arc::new(
            SessionStore::new(Duration::from_secs(args.session_idle_secs), args.max_sessions)
        ),
    };

    let server = Server::new(args.server_addr.clone(), router(state), args);
    let result = server.run().await;

    poll_task.abort();
    info!("Trending poller stopped");
    result
}
