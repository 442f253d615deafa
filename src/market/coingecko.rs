use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::MarketFeed;
use crate::cli::Args;
use crate::error::RugError;
use crate::models::trending::TrendingEntry;

/// Query parameters for the `/coins/markets` endpoint.
#[derive(Debug, Clone)]
pub struct MarketQuery {
    pub vs_currency: String,
    pub category: String,
    pub order: String,
    pub per_page: u32,
    pub sparkline: bool,
    pub price_change_percentage: String,
}

impl Default for MarketQuery {
    fn default() -> Self {
        Self {
            vs_currency: "usd".to_string(),
            category: "meme-token".to_string(),
            order: "market_cap_desc".to_string(),
            per_page: 10,
            sparkline: false,
            price_change_percentage: "24h".to_string(),
        }
    }
}

impl MarketQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", self.vs_currency.clone()),
            ("category", self.category.clone()),
            ("order", self.order.clone()),
            ("per_page", self.per_page.to_string()),
            ("sparkline", self.sparkline.to_string()),
            ("price_change_percentage", self.price_change_percentage.clone())
        ]
    }
}

#[derive(Deserialize, Debug)]
struct CoinMarket {
    id: String,
    name: String,
    symbol: String,
    #[serde(default)]
    image: Option<String>,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
}

pub struct CoinGeckoClient {
    http: HttpClient,
    endpoint: Url,
    api_key: Option<String>,
    query: MarketQuery,
}

impl CoinGeckoClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        query: MarketQuery,
        timeout: Duration
    ) -> Result<Self, RugError> {
        let endpoint = Url::parse(&format!("{}/coins/markets", base_url.trim_end_matches('/')))?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RugError::Config(format!("Failed to build market HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            query,
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, RugError> {
        let query = MarketQuery {
            vs_currency: args.market_currency.clone(),
            category: args.market_category.clone(),
            order: args.market_order.clone(),
            per_page: args.market_per_page,
            sparkline: false,
            price_change_percentage: args.market_price_change_window.clone(),
        };
        Self::new(
            &args.market_base_url,
            args.market_api_key.clone(),
            query,
            Duration::from_secs(args.market_timeout_secs)
        )
    }
}

#[async_trait]
impl MarketFeed for CoinGeckoClient {
    async fn fetch_markets(&self) -> Result<Vec<TrendingEntry>, RugError> {
        let mut req = self.http.get(self.endpoint.clone()).query(&self.query.pairs());
        if let Some(key) = &self.api_key {
            req = req.header("x-cg-demo-api-key", key);
        }

        let coins = req
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CoinMarket>>()
            .await?;

        let entries = coins
            .into_iter()
            .filter_map(|coin| {
                match (coin.current_price, coin.price_change_percentage_24h) {
                    (Some(price), Some(change)) =>
                        Some(TrendingEntry {
                            id: coin.id,
                            name: coin.name,
                            symbol: coin.symbol,
                            image: coin.image.unwrap_or_default(),
                            current_price: price,
                            price_change_24h: change,
                            is_new: true,
                        }),
                    _ => {
                        debug!("Skipping market record '{}' without price data", coin.id);
                        None
                    }
                }
            })
            .collect();

        Ok(entries)
    }
}
