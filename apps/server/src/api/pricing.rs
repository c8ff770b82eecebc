use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use cardcatch_pricing::{Condition, PriceSummary, PricedListing, SearchRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

/// Query-string form of a single search request. List fields are
/// comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPriceQuery {
    card_name: Option<String>,
    set_name: Option<String>,
    card_number: Option<String>,
    condition: Option<String>,
    rarity: Option<String>,
    language: Option<String>,
    seller_location: Option<String>,
    graded: Option<bool>,
    grading_company: Option<String>,
    grade: Option<String>,
    must_include: Option<String>,
    must_exclude: Option<String>,
    #[serde(default)]
    global_fallback: bool,
    recency_window_days: Option<u32>,
    #[serde(default)]
    include_listings: bool,
}

impl TryFrom<CardPriceQuery> for SearchRequest {
    type Error = ApiError;

    fn try_from(query: CardPriceQuery) -> Result<Self, Self::Error> {
        let condition = query
            .condition
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.parse::<Condition>())
            .transpose()
            .map_err(ApiError::BadRequest)?;

        Ok(SearchRequest {
            card_name: query.card_name.unwrap_or_default(),
            set_name: query.set_name.unwrap_or_default(),
            card_number: query.card_number,
            condition,
            rarity: query.rarity,
            language: query.language,
            seller_location: query.seller_location,
            graded: query.graded,
            grading_company: query.grading_company,
            grade: query.grade,
            must_include: split_terms(query.must_include),
            must_exclude: split_terms(query.must_exclude),
            global_fallback: query.global_fallback,
            recency_window_days: query.recency_window_days,
        })
    }
}

fn split_terms(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPriceResponse {
    #[serde(flatten)]
    summary: PriceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Vec<PricedListing>>,
}

pub async fn fetch_card_price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CardPriceQuery>,
) -> ApiResult<Json<CardPriceResponse>> {
    let include_listings = query.include_listings;
    let request = SearchRequest::try_from(query)?;
    let resolution = state.orchestrator.resolve_detailed(&request).await?;
    Ok(Json(CardPriceResponse {
        summary: resolution.summary,
        items: include_listings.then_some(resolution.listings),
    }))
}

pub async fn fetch_card_prices(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Vec<PriceSummary>>> {
    let Json(body) =
        body.map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e.body_text())))?;
    if !body.is_array() {
        return Err(ApiError::BadRequest(
            "Request body must be a JSON array of card requests".to_string(),
        ));
    }
    let requests: Vec<SearchRequest> = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid card request: {}", e)))?;

    tracing::info!("Pricing batch of {} cards", requests.len());
    let summaries = state.orchestrator.resolve_batch(&requests).await?;
    Ok(Json(summaries))
}
