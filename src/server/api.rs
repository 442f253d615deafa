use axum::{
    extract::{ Path, State },
    http::StatusCode,
    response::{ IntoResponse, Response },
    routing::{ delete, get, post },
    Json,
    Router,
};
use log::{ error, info, warn };
use serde::{ Deserialize, Serialize };
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };
use uuid::Uuid;

use crate::advisor::{ AdviceOptions, AdvisorySession };
use crate::config::prompt::PromptConfig;
use crate::error::RugError;
use crate::llm::chat::ChatClient;
use crate::market::TrendingPoller;
use crate::models::chat::{ ChatMessage, Feedback };
use crate::models::trending::TrendingView;
use crate::report::ReportAggregator;
use crate::session::{ ReportView, Session, SessionStore };

#[derive(Clone)]
pub struct AppState {
    pub poller: Arc<TrendingPoller>,
    pub aggregator: ReportAggregator,
    pub chat_client: Arc<dyn ChatClient>,
    pub prompts: Arc<PromptConfig>,
    pub advice_options: AdviceOptions,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    async fn session(&self, id: Uuid) -> Result<Arc<Session>, ApiError> {
        Ok(self.sessions.get(id).await?)
    }
}

pub struct ApiError(RugError);

impl From<RugError> for ApiError {
    fn from(err: RugError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RugError::Validation(_) => StatusCode::BAD_REQUEST,
            RugError::NotFound(_) => StatusCode::NOT_FOUND,
            RugError::Busy(_) | RugError::Superseded(_) => StatusCode::CONFLICT,
            RugError::Network(_) | RugError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            RugError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        let body = ErrorBody {
            success: false,
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub identifier: String,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub coin_id: String,
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub positive: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    report_source: String,
    trending_entries: usize,
}

#[derive(Serialize)]
struct SessionCreated {
    session_id: Uuid,
}

#[derive(Serialize)]
struct SelectResponse {
    report: ReportView,
    suggested_prompt: String,
}

#[derive(Serialize)]
struct ChatView {
    messages: Vec<ChatMessage>,
    generating: bool,
    quick_questions: Vec<String>,
    disclaimer: String,
}

#[derive(Serialize)]
struct AskMoreResponse {
    prompt: String,
    reply: ChatMessage,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/trending", get(trending_handler))
        .route("/api/trending/refresh", post(trending_refresh_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/{id}", delete(close_session_handler))
        .route("/api/sessions/{id}/report", get(report_view_handler).post(analyze_handler))
        .route("/api/sessions/{id}/report/refresh", post(report_refresh_handler))
        .route("/api/sessions/{id}/select", post(select_handler))
        .route("/api/sessions/{id}/chat", get(chat_view_handler).post(ask_handler))
        .route("/api/sessions/{id}/chat/ask-more", post(ask_more_handler))
        .route("/api/sessions/{id}/chat/{message_id}/feedback", post(feedback_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        report_source: state.aggregator.source_name().to_string(),
        trending_entries: state.poller.current().len(),
    })
}

async fn trending_handler(State(state): State<AppState>) -> Json<Vec<TrendingView>> {
    let snapshot = state.poller.current();
    Json(snapshot.iter().map(TrendingView::from).collect())
}

async fn trending_refresh_handler(
    State(state): State<AppState>
) -> Result<Json<Vec<TrendingView>>, ApiError> {
    let snapshot = state.poller.refresh().await.map_err(|e| {
        error!("Manual trending refresh failed: {}", e);
        e
    })?;
    Ok(Json(snapshot.iter().map(TrendingView::from).collect()))
}

async fn create_session_handler(
    State(state): State<AppState>
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let advisor = AdvisorySession::new(
        Arc::clone(&state.chat_client),
        Arc::clone(&state.prompts),
        state.advice_options
    );
    let session = state.sessions.create(advisor).await?;
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id: session.id })))
}

async fn close_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>
) -> Result<StatusCode, ApiError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn report_view_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>
) -> Result<Json<ReportView>, ApiError> {
    let session = state.session(id).await?;
    Ok(Json(session.reports.view()))
}

async fn analyze_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnalyzeRequest>
) -> Result<Json<ReportView>, ApiError> {
    let session = state.session(id).await?;
    let report = session.analyze(&state.aggregator, &req.identifier).await?;
    info!("Session {} analyzed {} (score {})", id, report.identifier, report.risk_score);
    Ok(Json(session.reports.view()))
}

async fn report_refresh_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>
) -> Result<Json<ReportView>, ApiError> {
    let session = state.session(id).await?;
    session.refresh(&state.aggregator).await?;
    Ok(Json(session.reports.view()))
}

async fn select_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectRequest>
) -> Result<Json<SelectResponse>, ApiError> {
    let session = state.session(id).await?;
    let entry = state.poller
        .current()
        .iter()
        .find(|e| e.id == req.coin_id)
        .cloned()
        .ok_or_else(|| RugError::NotFound(format!("trending coin '{}'", req.coin_id)))?;

    session.select(&state.aggregator, entry).await?;
    let suggested_prompt = session.ask_more_prompt()?;
    Ok(
        Json(SelectResponse {
            report: session.reports.view(),
            suggested_prompt,
        })
    )
}

async fn chat_view_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>
) -> Result<Json<ChatView>, ApiError> {
    let session = state.session(id).await?;
    let prompts = session.advisor.prompts();
    Ok(
        Json(ChatView {
            messages: session.advisor.transcript().await,
            generating: session.advisor.is_generating(),
            quick_questions: prompts.quick_questions.clone(),
            disclaimer: prompts.disclaimer.clone(),
        })
    )
}

async fn ask_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>
) -> Result<Json<ChatMessage>, ApiError> {
    let session = state.session(id).await?;
    Ok(Json(session.advisor.ask(&req.prompt).await?))
}

async fn ask_more_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>
) -> Result<Json<AskMoreResponse>, ApiError> {
    let session = state.session(id).await?;
    let prompt = session.ask_more_prompt()?;
    let reply = session.advisor.ask(&prompt).await?;
    Ok(Json(AskMoreResponse { prompt, reply }))
}

async fn feedback_handler(
    State(state): State<AppState>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<FeedbackRequest>
) -> Result<Json<ChatMessage>, ApiError> {
    let session = state.session(id).await?;
    let rated = session.advisor.rate(message_id, Feedback::from(req.positive)).await?;
    Ok(Json(rated))
}
