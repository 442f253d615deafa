use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Market Data Feed Args ---
    /// Base URL of the CoinGecko-compatible market data API.
    #[arg(long, env = "MARKET_BASE_URL", default_value = "https://api.coingecko.com/api/v3")]
    pub market_base_url: String,

    /// Optional CoinGecko demo API key, sent as x-cg-demo-api-key.
    #[arg(long, env = "MARKET_API_KEY")]
    pub market_api_key: Option<String>,

    /// Quote currency for prices (vs_currency).
    #[arg(long, env = "MARKET_CURRENCY", default_value = "usd")]
    pub market_currency: String,

    /// Category filter for the trending list.
    #[arg(long, env = "MARKET_CATEGORY", default_value = "meme-token")]
    pub market_category: String,

    /// Sort order requested from the market feed.
    #[arg(long, env = "MARKET_ORDER", default_value = "market_cap_desc")]
    pub market_order: String,

    /// Number of trending entries per poll.
    #[arg(long, env = "MARKET_PER_PAGE", default_value = "10")]
    pub market_per_page: u32,

    /// Percentage-change window requested from the market feed.
    #[arg(long, env = "MARKET_PRICE_CHANGE_WINDOW", default_value = "24h")]
    pub market_price_change_window: String,

    /// Seconds between trending feed polls.
    #[arg(long, env = "TRENDING_REFRESH_SECS", default_value = "60")]
    pub trending_refresh_secs: u64,

    /// Timeout in seconds for market data requests.
    #[arg(long, env = "MARKET_TIMEOUT_SECS", default_value = "15")]
    pub market_timeout_secs: u64,

    // --- Report Source Args ---
    /// Where token reports come from: "solsniffer" (real scan) or "demo" (random placeholder data).
    #[arg(long, env = "REPORT_SOURCE", default_value = "demo")]
    pub report_source: String,

    /// Base URL of the token scan service.
    #[arg(long, env = "SCAN_BASE_URL", default_value = "https://solsniffer.com/api/v2")]
    pub scan_base_url: String,

    /// API key for the token scan service, sent as X-API-KEY. Required for the solsniffer source.
    #[arg(long, env = "SCAN_API_KEY", default_value = "", hide_env_values = true)]
    pub scan_api_key: String,

    /// Timeout in seconds for token scan requests.
    #[arg(long, env = "SCAN_TIMEOUT_SECS", default_value = "15")]
    pub scan_timeout_secs: u64,

    /// Optional JSON file mapping scan response fields onto the report.
    #[arg(long, env = "SCAN_FIELD_MAP_PATH")]
    pub scan_field_map_path: Option<String>,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for advice generation (openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider (e.g., OpenAI)
    #[arg(long, env = "CHAT_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for advice generation (e.g., gpt-3.5-turbo, llama3)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Sampling temperature for advice generation.
    #[arg(long, env = "ADVICE_TEMPERATURE", default_value = "0.7")]
    pub advice_temperature: f32,

    /// Maximum tokens in a generated advice reply.
    #[arg(long, env = "ADVICE_MAX_TOKENS", default_value = "500")]
    pub advice_max_tokens: u32,

    /// Timeout in seconds for advice generation requests.
    #[arg(long, env = "ADVICE_TIMEOUT_SECS", default_value = "60")]
    pub advice_timeout_secs: u64,

    /// Optional JSON file overriding the built-in prompts.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- Session Args ---
    /// Seconds a session may sit idle before it is dropped.
    #[arg(long, env = "SESSION_IDLE_SECS", default_value = "1800")]
    pub session_idle_secs: u64,

    /// Maximum number of live sessions.
    #[arg(long, env = "MAX_SESSIONS", default_value = "1000")]
    pub max_sessions: usize,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
