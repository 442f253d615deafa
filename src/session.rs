use chrono::Utc;
use log::{ debug, info, warn };
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{ AtomicI64, AtomicU64, Ordering };
use std::sync::{ Arc, PoisonError, RwLock as StdRwLock, RwLockReadGuard, RwLockWriteGuard };
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::advisor::AdvisorySession;
use crate::error::RugError;
use crate::models::report::Report;
use crate::models::trending::{ format_usd, TrendingEntry };
use crate::report::{ validate_identifier, ReportAggregator };

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// What the report panel should show right now.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportView {
    Empty,
    Pending {
        identifier: String,
    },
    Ready {
        report: Report,
        authoritative: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        banner: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        market_cap_display: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        volume_display: Option<String>,
        generated_at: i64,
    },
    Failed {
        identifier: String,
        message: String,
    },
}

impl ReportView {
    pub fn identifier(&self) -> Option<&str> {
        match self {
            ReportView::Empty => None,
            ReportView::Pending { identifier } | ReportView::Failed { identifier, .. } =>
                Some(identifier),
            ReportView::Ready { report, .. } => Some(&report.identifier),
        }
    }

    fn ready(report: Report) -> Self {
        ReportView::Ready {
            authoritative: report.is_authoritative(),
            banner: report.banner().map(str::to_string),
            market_cap_display: report.market.market_cap.map(format_usd),
            volume_display: report.market.volume_24h.map(format_usd),
            generated_at: Utc::now().timestamp_millis(),
            report,
        }
    }
}

/// How a settled request treats the trending selection.
enum Selection {
    Keep,
    Replace(Option<TrendingEntry>),
}

struct DeskState {
    settled: ReportView,
    pending: Option<(u64, String)>,
    selected: Option<TrendingEntry>,
}

/// Holds the single displayed report of a session. Each request takes a
/// ticket; only the holder of the newest ticket may write its outcome,
/// so a slow stale response can never overwrite a fresher one. The
/// selection is written under the same lock as the outcome.
pub struct ReportDesk {
    generation: AtomicU64,
    state: StdRwLock<DeskState>,
}

/// Clears the pending marker if the request is dropped before it settles.
struct InFlight<'a> {
    desk: &'a ReportDesk,
    ticket: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.desk.write_state();
        if state.pending.as_ref().is_some_and(|(ticket, _)| *ticket == self.ticket) {
            debug!("Report request {} abandoned before completion", self.ticket);
            state.pending = None;
        }
    }
}

impl Default for ReportDesk {
    fn default() -> Self {
        Self {
            generation: AtomicU64::new(0),
            state: StdRwLock::new(DeskState {
                settled: ReportView::Empty,
                pending: None,
                selected: None,
            }),
        }
    }
}

impl ReportDesk {
    fn read_state(&self) -> RwLockReadGuard<'_, DeskState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, DeskState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> ReportView {
        let state = self.read_state();
        match &state.pending {
            Some((_, identifier)) => ReportView::Pending { identifier: identifier.clone() },
            None => state.settled.clone(),
        }
    }

    pub fn selected(&self) -> Option<TrendingEntry> {
        self.read_state().selected.clone()
    }

    /// The selection and the settled view, read together.
    fn context(&self) -> (Option<TrendingEntry>, ReportView) {
        let state = self.read_state();
        (state.selected.clone(), state.settled.clone())
    }

    async fn submit<F>(&self, identifier: &str, selection: Selection, work: F) -> Result<Report, RugError>
        where F: Future<Output = Result<Report, RugError>>
    {
        let ticket = {
            let mut state = self.write_state();
            let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.pending = Some((ticket, identifier.to_string()));
            ticket
        };
        let _in_flight = InFlight { desk: self, ticket };

        let outcome = work.await;

        let current = {
            let mut state = self.write_state();
            let current = self.generation.load(Ordering::SeqCst) == ticket;
            if current {
                state.pending = None;
                state.settled = match &outcome {
                    Ok(report) => ReportView::ready(report.clone()),
                    Err(e) =>
                        ReportView::Failed {
                            identifier: identifier.to_string(),
                            message: failure_message(e),
                        },
                };
                if let Selection::Replace(selected) = selection {
                    state.selected = selected;
                }
            }
            current
        };
        if !current {
            debug!("Discarding superseded report for {}", identifier);
            return Err(RugError::Superseded(identifier.to_string()));
        }
        outcome
    }
}

fn failure_message(err: &RugError) -> String {
    match err {
        RugError::NotFound(_) =>
            "Token not found. Please check the address and try again.".to_string(),
        RugError::MalformedResponse(_) =>
            "The scanner returned an unexpected response. Please try again later.".to_string(),
        _ => "Failed to analyze token. Please check the address and try again.".to_string(),
    }
}

/// Per-UI-session state. The report desk, the selection and the advisory
/// transcript are separate slices so each flow only touches its own.
pub struct Session {
    pub id: Uuid,
    pub reports: ReportDesk,
    pub advisor: AdvisorySession,
    last_seen: AtomicI64,
}

impl Session {
    pub fn new(id: Uuid, advisor: AdvisorySession) -> Self {
        Self {
            id,
            reports: ReportDesk::default(),
            advisor,
            last_seen: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    pub fn selected(&self) -> Option<TrendingEntry> {
        self.reports.selected()
    }

    fn touch(&self) {
        self.last_seen.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_for(&self, now_millis: i64) -> Duration {
        let idle = now_millis.saturating_sub(self.last_seen.load(Ordering::Relaxed));
        Duration::from_millis(idle.max(0) as u64)
    }

    /// Typed-address analysis. Clears any trending selection once it
    /// settles, since the report no longer belongs to it.
    pub async fn analyze(&self, aggregator: &ReportAggregator, identifier: &str) -> Result<Report, RugError> {
        let identifier = validate_identifier(identifier)?;
        self.reports.submit(identifier, Selection::Replace(None), aggregator.analyze(identifier)).await
    }

    pub async fn select(&self, aggregator: &ReportAggregator, entry: TrendingEntry) -> Result<Report, RugError> {
        let identifier = entry.id.clone();
        self.reports.submit(
            &identifier,
            Selection::Replace(Some(entry)),
            aggregator.analyze(&identifier)
        ).await
    }

    pub async fn refresh(&self, aggregator: &ReportAggregator) -> Result<Report, RugError> {
        let identifier = self.reports
            .view()
            .identifier()
            .map(str::to_string)
            .ok_or_else(|| RugError::NotFound("no report to refresh".to_string()))?;
        self.reports.submit(&identifier, Selection::Keep, aggregator.refresh(&identifier)).await
    }

    /// Template prompt for the "ask more" action: the selected trending
    /// coin if there is one, otherwise the report currently on display.
    pub fn ask_more_prompt(&self) -> Result<String, RugError> {
        let prompts = self.advisor.prompts();
        match self.reports.context() {
            (Some(entry), _) => Ok(prompts.selected_token_prompt(&entry.name, &entry.symbol)),
            (None, ReportView::Ready { report, .. }) => Ok(prompts.report_prompt(report.display_name())),
            _ => Err(RugError::Validation("select or analyze a token first".to_string())),
        }
    }
}

/// In-memory sessions. Sessions idle longer than `idle_ttl` are dropped
/// whenever a new one is created, and at most `capacity` live at once.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    idle_ttl: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
            capacity,
        }
    }

    pub async fn create(&self, advisor: AdvisorySession) -> Result<Arc<Session>, RugError> {
        let mut sessions = self.sessions.write().await;

        let now = Utc::now().timestamp_millis();
        let before = sessions.len();
        sessions.retain(|_, s| s.idle_for(now) <= self.idle_ttl);
        if sessions.len() < before {
            info!("Expired {} idle sessions", before - sessions.len());
        }
        if sessions.len() >= self.capacity {
            warn!("Session limit of {} reached", self.capacity);
            return Err(RugError::Busy("too many active sessions, try again later".to_string()));
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Session::new(id, advisor));
        sessions.insert(id, Arc::clone(&session));
        info!("Session {} created", id);
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, RugError> {
        let session = self.sessions
            .read().await
            .get(&id)
            .cloned()
            .ok_or_else(|| RugError::NotFound(format!("session {}", id)))?;
        session.touch();
        Ok(session)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), RugError> {
        self.sessions
            .write().await
            .remove(&id)
            .map(|_| info!("Session {} closed", id))
            .ok_or_else(|| RugError::NotFound(format!("session {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::AdviceOptions;
    use crate::advisor::tests::EchoClient;
    use crate::config::prompt::PromptConfig;
    use crate::models::report::MarketMetrics;
    use crate::report::tests::{ fixed_report, CountingSource };
    use crate::report::ReportSource;
    use async_trait::async_trait;
    use tokio::sync::{ oneshot, Notify };

    fn advisor() -> AdvisorySession {
        AdvisorySession::new(
            Arc::new(EchoClient),
            Arc::new(PromptConfig::default()),
            AdviceOptions::default()
        )
    }

    fn new_session() -> Session {
        Session::new(Uuid::new_v4(), advisor())
    }

    fn dogecoin() -> TrendingEntry {
        TrendingEntry {
            id: "dogecoin".to_string(),
            name: "Dogecoin".to_string(),
            symbol: "doge".to_string(),
            image: String::new(),
            current_price: 0.12,
            price_change_24h: -1.5,
            is_new: false,
        }
    }

    /// Holds analyses of one identifier until released.
    struct HeldSource {
        held: &'static str,
        release: Notify,
    }

    #[async_trait]
    impl ReportSource for HeldSource {
        fn name(&self) -> &str {
            "held"
        }

        async fn analyze(&self, identifier: &str) -> Result<Report, RugError> {
            if identifier == self.held {
                self.release.notified().await;
            }
            Ok(fixed_report(identifier, 64.0))
        }
    }

    #[tokio::test]
    async fn newer_request_wins_over_slow_older_one() {
        let desk = ReportDesk::default();
        let (slow_tx, slow_rx) = oneshot::channel::<()>();

        let slow = desk.submit("old", Selection::Keep, async move {
            let _ = slow_rx.await;
            Ok(fixed_report("old", 10.0))
        });
        let fast = async {
            tokio::task::yield_now().await;
            let result = desk.submit("new", Selection::Keep, async {
                Ok(fixed_report("new", 90.0))
            }).await;
            let _ = slow_tx.send(());
            result
        };
        let (slow_result, fast_result) = tokio::join!(slow, fast);

        assert!(matches!(slow_result, Err(RugError::Superseded(_))));
        assert_eq!(fast_result.unwrap().identifier, "new");
        match desk.view() {
            ReportView::Ready { report, .. } => assert_eq!(report.identifier, "new"),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn failure_replaces_previous_report() {
        let desk = ReportDesk::default();
        desk.submit("a", Selection::Keep, async { Ok(fixed_report("a", 50.0)) }).await.unwrap();
        let err = desk.submit("b", Selection::Keep, async {
            Err(RugError::Network("timeout".into()))
        }).await;

        assert!(err.is_err());
        match desk.view() {
            ReportView::Failed { identifier, message } => {
                assert_eq!(identifier, "b");
                assert!(message.starts_with("Failed to analyze token"));
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn abandoned_request_does_not_stay_pending() {
        let desk = ReportDesk::default();
        desk.submit("a", Selection::Keep, async { Ok(fixed_report("a", 50.0)) }).await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            desk.submit("b", Selection::Keep, std::future::pending())
        ).await;

        assert!(abandoned.is_err());
        match desk.view() {
            ReportView::Ready { report, .. } => assert_eq!(report.identifier, "a"),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn ready_view_formats_market_metrics() {
        let desk = ReportDesk::default();
        let mut report = fixed_report("a", 80.0);
        report.market = MarketMetrics {
            market_cap: Some(2345678.4),
            volume_24h: None,
            holders: Some(1200),
        };
        desk.submit("a", Selection::Keep, async move { Ok(report) }).await.unwrap();

        match desk.view() {
            ReportView::Ready { market_cap_display, volume_display, .. } => {
                assert_eq!(market_cap_display.as_deref(), Some("$2,345,678"));
                assert_eq!(volume_display, None);
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_address_leaves_view_untouched() {
        let session = new_session();
        let aggregator = ReportAggregator::new(Arc::new(CountingSource::default()));

        assert!(matches!(session.analyze(&aggregator, "  ").await, Err(RugError::Validation(_))));
        assert!(matches!(session.reports.view(), ReportView::Empty));
    }

    #[tokio::test]
    async fn selecting_a_coin_seeds_the_advice_prompt() {
        let session = new_session();
        let aggregator = ReportAggregator::new(Arc::new(CountingSource::default()));

        session.select(&aggregator, dogecoin()).await.unwrap();

        assert_eq!(
            session.ask_more_prompt().unwrap(),
            "Please analyze this token: Dogecoin (DOGE) including its recent performance, market trends, and potential risks."
        );
    }

    #[tokio::test]
    async fn typed_address_prompt_uses_report_identity() {
        let session = new_session();
        let aggregator = ReportAggregator::new(Arc::new(CountingSource::default()));

        session.select(&aggregator, dogecoin()).await.unwrap();
        session.analyze(&aggregator, "So1111").await.unwrap();

        assert!(session.selected().is_none());
        assert_eq!(
            session.ask_more_prompt().unwrap(),
            "Please analyze this token: So1111. Include information about market cap, liquidity, and potential risks."
        );
    }

    #[tokio::test]
    async fn superseded_selection_does_not_linger() {
        let session = new_session();
        let source = Arc::new(HeldSource { held: "dogecoin", release: Notify::new() });
        let aggregator = ReportAggregator::new(source.clone());

        let select = session.select(&aggregator, dogecoin());
        let analyze = async {
            tokio::task::yield_now().await;
            let result = session.analyze(&aggregator, "So1111").await;
            source.release.notify_one();
            result
        };
        let (selected, analyzed) = tokio::join!(select, analyze);

        assert!(matches!(selected, Err(RugError::Superseded(_))));
        assert_eq!(analyzed.unwrap().identifier, "So1111");
        assert!(session.selected().is_none());
        assert_eq!(
            session.ask_more_prompt().unwrap(),
            "Please analyze this token: So1111. Include information about market cap, liquidity, and potential risks."
        );
    }

    #[tokio::test]
    async fn refresh_keeps_selection() {
        let session = new_session();
        let aggregator = ReportAggregator::new(Arc::new(CountingSource::default()));

        session.select(&aggregator, dogecoin()).await.unwrap();
        session.refresh(&aggregator).await.unwrap();

        assert_eq!(session.selected().map(|e| e.id), Some("dogecoin".to_string()));
    }

    #[tokio::test]
    async fn refresh_without_report_is_not_found() {
        let session = new_session();
        let aggregator = ReportAggregator::new(Arc::new(CountingSource::default()));
        assert!(matches!(session.refresh(&aggregator).await, Err(RugError::NotFound(_))));
        assert!(matches!(session.ask_more_prompt(), Err(RugError::Validation(_))));
    }

    #[tokio::test]
    async fn store_lookup_and_removal() {
        let store = SessionStore::default();
        let session = store.create(advisor()).await.unwrap();

        assert_eq!(store.get(session.id).await.unwrap().id, session.id);
        store.remove(session.id).await.unwrap();
        assert!(matches!(store.get(session.id).await, Err(RugError::NotFound(_))));
    }

    #[tokio::test]
    async fn idle_sessions_expire_and_store_is_bounded() {
        let store = SessionStore::new(Duration::from_millis(20), 2);
        let idle = store.create(advisor()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let first = store.create(advisor()).await.unwrap();
        assert!(matches!(store.get(idle.id).await, Err(RugError::NotFound(_))));

        store.create(advisor()).await.unwrap();
        assert!(matches!(store.create(advisor()).await, Err(RugError::Busy(_))));
        assert!(store.get(first.id).await.is_ok());
    }
}
