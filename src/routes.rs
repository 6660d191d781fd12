use crate::infra::{AmiTableStatus, AppState, Catalog};
use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use metrolist::error::AppError;
use metrolist::workflows::ami::{AmiEstimate, HouseholdProfile};
use metrolist::workflows::search::{
    apply_filter_change, page_from_query, resolve_page, FilterChange, Filters, ListingCounts,
    SearchResults,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub filters: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub filters: Filters,
    pub show_clear_filters: bool,
    pub results: SearchResults,
    pub listing_counts: ListingCounts,
}

#[derive(Debug, Deserialize)]
pub struct FilterChangeRequest {
    #[serde(default)]
    pub filters: Option<Value>,
    pub change: FilterChange,
}

/// Search and estimator endpoints backed by the shared catalog.
pub fn search_router(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .route("/api/v1/search", post(search_endpoint))
        .route("/api/v1/filters/change", post(filter_change_endpoint))
        .route("/api/v1/listing-counts", get(listing_counts_endpoint))
        .route("/api/v1/ami/estimate", post(ami_estimate_endpoint))
        .with_state(catalog)
}

pub fn with_search_routes(catalog: Arc<Catalog>) -> Router {
    search_router(catalog)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let catalog = state.catalog.status().await;
    let payload = json!({
        "status": if ready { "ready" } else { "initializing" },
        "listings": {
            "homes": catalog.homes,
            "fetchedAt": catalog.fetched_at,
        },
        "amiTable": catalog.ami_table,
    });

    (status, Json(payload))
}

pub async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Sanitize the caller's saved filters and return the requested page of matches.
pub async fn search_endpoint(
    State(catalog): State<Arc<Catalog>>,
    RawQuery(query): RawQuery,
    body: Option<Json<SearchRequest>>,
) -> Json<SearchResponse> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let page = resolve_page(query.as_deref().and_then(page_from_query));
    let listings = catalog.listings().await;

    let mut filters = Filters::from_value(request.filters.unwrap_or(Value::Null));
    filters.register_neighborhoods(listings.counts.neighborhoods());
    let show_clear_filters = filters != filters.reset();
    let results = SearchResults::compute(&listings.homes, &filters, catalog.page_size(), page);

    debug!(
        page,
        matches = results.total_matches,
        "search request served"
    );

    Json(SearchResponse {
        filters,
        show_clear_filters,
        results,
        listing_counts: listings.counts.clone(),
    })
}

pub async fn filter_change_endpoint(
    Json(request): Json<FilterChangeRequest>,
) -> Result<Json<Filters>, AppError> {
    let filters = Filters::from_value(request.filters.unwrap_or(Value::Null));
    let next = apply_filter_change(&filters, &request.change)?;
    Ok(Json(next))
}

pub async fn listing_counts_endpoint(State(catalog): State<Arc<Catalog>>) -> Json<ListingCounts> {
    Json(catalog.listings().await.counts.clone())
}

pub async fn ami_estimate_endpoint(
    State(catalog): State<Arc<Catalog>>,
    Json(profile): Json<HouseholdProfile>,
) -> Result<Json<AmiEstimate>, AppError> {
    match catalog.ami_table().await {
        AmiTableStatus::Ready(table) => Ok(Json(AmiEstimate::for_household(&profile, &table))),
        AmiTableStatus::Pending | AmiTableStatus::Unavailable => {
            Err(AppError::Unavailable("AMI income table"))
        }
    }
}
