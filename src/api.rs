// src/api.rs
//! HTTP surface. Handlers are thin: parse and validate input, call the
//! classifier, store or ingestor, and shape the JSON reply.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::ScrapeSection;
use crate::ingest::{totals, Ingestor, RunStats};
use crate::scrape::normalize::parse_time_hint;
use crate::scrape::PageFetcher;
use crate::sentiment::{DynClassifier, SentimentLabel};
use crate::store::{DynStore, HeadlineQuery, NewHeadline, StoredHeadline};

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;
const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_SCRAPE_HEADLINES: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub classifier: DynClassifier,
    pub store: DynStore,
    pub ingestor: Ingestor,
    pub scrape: ScrapeSection,
}

impl AppState {
    pub fn new(
        classifier: DynClassifier,
        store: DynStore,
        fetcher: Arc<dyn PageFetcher>,
        scrape: ScrapeSection,
    ) -> Self {
        let ingestor = Ingestor::new(fetcher, classifier.clone(), store.clone());
        Self {
            classifier,
            store,
            ingestor,
            scrape,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route(
            "/headlines",
            post(create_headline)
                .get(list_headlines)
                .delete(clear_headlines),
        )
        .route("/headlines/{id}", get(get_headline).delete(delete_headline))
        .route("/scrape", post(scrape_one))
        .route("/scrape/all", post(scrape_all))
        .route("/scrape/stats", get(scrape_stats))
        .route("/scrape/recent", get(scrape_recent))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---------- errors ----------

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(e) => {
                error!(error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------- health / analyze ----------

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Financial news sentiment service is running",
        "status": "healthy",
    }))
}

#[derive(Deserialize)]
struct AnalyzeReq {
    headline: String,
}

#[derive(Serialize, Deserialize)]
pub struct AnalyzeResp {
    pub sentiment: SentimentLabel,
    pub commentary: String,
}

async fn analyze(State(state): State<AppState>, Json(body): Json<AnalyzeReq>) -> Json<AnalyzeResp> {
    let r = state.classifier.classify(&body.headline);
    Json(AnalyzeResp {
        sentiment: r.label,
        commentary: r.rationale,
    })
}

// ---------- headlines CRUD ----------

#[derive(Deserialize)]
struct CreateHeadlineReq {
    source: String,
    title: String,
    url: String,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    raw_text: Option<String>,
}

async fn create_headline(
    State(state): State<AppState>,
    Json(body): Json<CreateHeadlineReq>,
) -> ApiResult<StoredHeadline> {
    let r = state.classifier.classify(&body.title);
    let row = state
        .store
        .insert(NewHeadline {
            source: body.source,
            title: body.title,
            url: body.url,
            published_at: body.published_at,
            raw_text: body.raw_text,
            sentiment: Some(r.label),
            commentary: Some(r.rationale),
            model_confidence: Some(r.confidence),
        })
        .await?;
    Ok(Json(row))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    source: Option<String>,
    sentiment: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    q: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct HeadlinesPage {
    pub items: Vec<StoredHeadline>,
    pub total: usize,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn parse_date_param(name: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match non_empty(raw) {
        None => Ok(None),
        Some(s) => parse_time_hint(&s)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid {name}"))),
    }
}

impl ListParams {
    fn into_query(self) -> Result<HeadlineQuery, ApiError> {
        let sentiment = match non_empty(self.sentiment) {
            None => None,
            Some(s) => Some(s.parse::<SentimentLabel>().map_err(|_| {
                ApiError::BadRequest(
                    "sentiment must be one of: positive, neutral, negative".to_string(),
                )
            })?),
        };
        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if !(1..=MAX_LIST_LIMIT).contains(&limit) {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {MAX_LIST_LIMIT}"
            )));
        }
        Ok(HeadlineQuery {
            source: non_empty(self.source),
            sentiment,
            start: parse_date_param("start_date", self.start_date)?,
            end: parse_date_param("end_date", self.end_date)?,
            text: non_empty(self.q),
            limit,
            offset: self.offset.unwrap_or(0),
        })
    }
}

async fn list_headlines(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<HeadlinesPage> {
    let q = params.into_query()?;
    let (items, total) = state.store.query(&q).await?;
    Ok(Json(HeadlinesPage { items, total }))
}

async fn get_headline(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StoredHeadline> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Headline not found".to_string()))
}

async fn delete_headline(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<serde_json::Value> {
    if !state.store.delete(id).await? {
        return Err(ApiError::NotFound("Headline not found".to_string()));
    }
    Ok(Json(json!({
        "message": format!("Headline {id} deleted successfully"),
    })))
}

async fn clear_headlines(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let n = state.store.delete_all().await?;
    info!(deleted = n, "all headlines cleared");
    Ok(Json(json!({
        "message": "All headlines cleared successfully",
        "deleted_count": n,
    })))
}

// ---------- scraping ----------

#[derive(Debug, Deserialize)]
struct ScrapeParams {
    source: Option<String>,
    max_headlines: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct ScrapeResp {
    pub message: String,
    pub results: RunStats,
}

async fn scrape_one(
    State(state): State<AppState>,
    Query(p): Query<ScrapeParams>,
) -> Json<ScrapeResp> {
    let source = non_empty(p.source).unwrap_or_else(|| "CNBC".to_string());
    let max = p
        .max_headlines
        .unwrap_or(state.scrape.default_max_headlines)
        .min(MAX_SCRAPE_HEADLINES);
    let results = state.ingestor.ingest(&source, max, true).await;
    Json(ScrapeResp {
        message: format!("Scraping completed for {source}"),
        results,
    })
}

#[derive(Debug, Deserialize)]
struct ScrapeAllParams {
    max_headlines_per_source: Option<usize>,
}

async fn scrape_all(
    State(state): State<AppState>,
    Query(p): Query<ScrapeAllParams>,
) -> Json<serde_json::Value> {
    let max = p
        .max_headlines_per_source
        .unwrap_or(state.scrape.max_headlines_per_source)
        .min(MAX_SCRAPE_HEADLINES);
    let results = state.ingestor.ingest_all(max, true).await;
    let (total_scraped, total_stored) = totals(&results);
    let sources: Vec<&String> = results.keys().collect();
    Json(json!({
        "message": format!(
            "Scraping completed for all sources. Total: {total_scraped} scraped, {total_stored} stored"
        ),
        "summary": {
            "total_scraped": total_scraped,
            "total_stored": total_stored,
            "sources": sources,
        },
        "results": results,
    }))
}

async fn scrape_stats(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let stats = state.store.stats().await?;
    Ok(Json(json!({
        "message": "Scraping statistics",
        "stats": stats,
    })))
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    source: Option<String>,
    limit: Option<usize>,
}

async fn scrape_recent(
    State(state): State<AppState>,
    Query(p): Query<RecentParams>,
) -> ApiResult<serde_json::Value> {
    let source = non_empty(p.source);
    let limit = p.limit.unwrap_or(DEFAULT_RECENT_LIMIT).min(MAX_LIST_LIMIT);
    let headlines = state.store.recent(source.as_deref(), limit).await?;
    Ok(Json(json!({
        "message": format!("Recent headlines from {}", source.as_deref().unwrap_or("all sources")),
        "headlines": headlines,
    })))
}
