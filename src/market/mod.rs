pub mod coingecko;

use async_trait::async_trait;
use log::{ info, warn };
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{ watch, Mutex };
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::RugError;
use crate::models::trending::TrendingEntry;

pub type Snapshot = Arc<Vec<TrendingEntry>>;

#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Candidate tokens in the order the feed ranks them. `is_new` is not
    /// meaningful here; the poller sets it.
    async fn fetch_markets(&self) -> Result<Vec<TrendingEntry>, RugError>;
}

/// Flags every entry of `next` whose id was absent from `previous`.
pub fn mark_new(previous: &[TrendingEntry], next: Vec<TrendingEntry>) -> Vec<TrendingEntry> {
    let seen: HashSet<&str> = previous
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    next.into_iter()
        .map(|mut entry| {
            entry.is_new = !seen.contains(entry.id.as_str());
            entry
        })
        .collect()
}

/// Owns the trending snapshot. It is the only writer; readers go through
/// `current()` and always see a whole snapshot.
pub struct TrendingPoller {
    feed: Arc<dyn MarketFeed>,
    snapshot: watch::Sender<Snapshot>,
    refreshing: Mutex<()>,
    interval: Duration,
}

impl TrendingPoller {
    pub fn new(feed: Arc<dyn MarketFeed>, interval: Duration) -> Result<Self, RugError> {
        if interval.is_zero() {
            return Err(RugError::Config("trending refresh interval must be greater than zero".into()));
        }
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Ok(Self {
            feed,
            snapshot,
            refreshing: Mutex::new(()),
            interval,
        })
    }

    pub fn current(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Fetches and publishes a new snapshot. On failure the previous
    /// snapshot stays published untouched.
    pub async fn refresh(&self) -> Result<Snapshot, RugError> {
        let _guard = self.refreshing.lock().await;
        let fetched = self.feed.fetch_markets().await?;
        let previous = self.current();
        let next = Arc::new(mark_new(&previous, fetched));
        self.snapshot.send_replace(Arc::clone(&next));
        Ok(next)
    }

    /// Polls once immediately and then every `interval` until the handle is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.refresh().await {
                    Ok(snapshot) => info!("Trending feed refreshed: {} entries", snapshot.len()),
                    Err(e) => warn!("Trending feed refresh failed, keeping previous snapshot: {}", e),
                }
            }
        })
    }
}
