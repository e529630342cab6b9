use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::ListingCache;
use crate::config::{ApiStrategy, Config};
use crate::ebay::browse::BrowseListings;
use crate::ebay::finding::FindingListings;
use crate::ebay::token::TokenManager;
use crate::ebay::trading::{TradingClient, TradingFeedback, TradingListings};
use crate::error::ApiError;
use crate::fetch::PageSource;
use crate::model::{FeedbackEntry, ListingItem};
use crate::service::{
    FEEDBACK_DEFAULT, FEEDBACK_MAX, LISTINGS_DEFAULT, LISTINGS_MAX, ListingOutcome,
    ListingRequest, clamp_limit, fetch_feedback, fetch_listings,
};

pub struct AppState {
    pub config: Config,
    pub http: Client,
    pub cache: ListingCache,
    pub tokens: Option<Arc<TokenManager>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let http = Client::new();
        let tokens = match &config.strategy {
            ApiStrategy::Browse {
                client_id,
                client_secret,
            } => Some(Arc::new(TokenManager::new(
                http.clone(),
                config.environment.token_url().to_string(),
                client_id.clone(),
                client_secret.clone(),
            ))),
            _ => None,
        };
        let cache = ListingCache::new(config.cache_path.clone(), config.cache_ttl);
        Self {
            config,
            http,
            cache,
            tokens,
        }
    }

    /// Builds the listings source for this request under the configured
    /// strategy. The Trading API ignores keyword/seller overrides (the user
    /// token pins the seller); the JSON APIs honor both.
    fn listing_source(
        &self,
        q: Option<&str>,
        seller: Option<&str>,
    ) -> Result<Box<dyn PageSource<Record = ListingItem>>, ApiError> {
        match &self.config.strategy {
            ApiStrategy::Trading { auth_token } => Ok(Box::new(TradingListings::new(
                TradingClient::new(self.http.clone(), &self.config, auth_token.clone()),
            ))),
            ApiStrategy::Browse { .. } => {
                let tokens = self
                    .tokens
                    .clone()
                    .ok_or_else(|| ApiError::MissingConfig("token manager".to_string()))?;
                Ok(Box::new(BrowseListings::new(
                    self.http.clone(),
                    self.config.environment.browse_url().to_string(),
                    tokens,
                    self.config.marketplace.clone(),
                    q.map(str::to_string),
                    seller.map(str::to_string).or_else(|| self.config.seller.clone()),
                )))
            }
            ApiStrategy::Finding { app_id } => Ok(Box::new(FindingListings::new(
                self.http.clone(),
                self.config.environment.finding_url().to_string(),
                app_id.clone(),
                q.map(str::to_string),
                seller.map(str::to_string).or_else(|| self.config.seller.clone()),
            ))),
        }
    }

    fn feedback_source(&self) -> Result<TradingFeedback, ApiError> {
        let token = self.config.user_token.clone().ok_or_else(|| {
            ApiError::MissingConfig(
                "feedback requires EBAY_USER_TOKEN (or EBAY_AUTH_TOKEN)".to_string(),
            )
        })?;
        Ok(TradingFeedback::new(TradingClient::new(
            self.http.clone(),
            &self.config,
            token,
        )))
    }
}

/// Flags arrive as bare presence (`?force`) or truthy strings.
fn flag(value: &Option<String>) -> bool {
    match value.as_deref() {
        Some("") | Some("1") | Some("true") | Some("yes") => true,
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct ListingsQuery {
    limit: Option<String>,
    q: Option<String>,
    /// Alias for `q`, kept for older front-end callers.
    keywords: Option<String>,
    seller: Option<String>,
    /// Alias for `seller`.
    username: Option<String>,
    force: Option<String>,
    debug: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListingsResponse {
    products: Vec<ListingItem>,
    #[serde(rename = "fromCache", skip_serializing_if = "std::ops::Not::not")]
    from_cache: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stale: bool,
}

pub async fn listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingsQuery>,
) -> Result<Response, ApiError> {
    let limit = clamp_limit(params.limit.as_deref(), LISTINGS_DEFAULT, LISTINGS_MAX);
    let q = params.q.or(params.keywords);
    let seller = params.seller.or(params.username);
    let source = state.listing_source(q.as_deref(), seller.as_deref())?;

    if flag(&params.debug) {
        if let Some(raw) = source.raw_page(source.page_size().min(limit as u32)).await? {
            return Ok(Json(raw).into_response());
        }
    }

    let req = ListingRequest {
        limit,
        force: flag(&params.force),
        custom_query: q.is_some() || seller.is_some(),
    };
    let outcome = fetch_listings(source.as_ref(), &state.cache, &req).await?;
    let (products, from_cache, stale) = match outcome {
        ListingOutcome::Fresh(p) => (p, false, false),
        ListingOutcome::Cached(p) => (p, true, false),
        ListingOutcome::Stale(p) => (p, false, true),
    };
    Ok(Json(ListingsResponse {
        products,
        from_cache,
        stale,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    limit: Option<String>,
}

pub async fn feedback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedbackQuery>,
) -> Result<Json<Vec<FeedbackEntry>>, ApiError> {
    let limit = clamp_limit(params.limit.as_deref(), FEEDBACK_DEFAULT, FEEDBACK_MAX);
    let source = state.feedback_source()?;
    let entries = fetch_feedback(&source, limit).await?;
    Ok(Json(entries))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
