//! Router-level checks for the search and estimator endpoints.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Extension;
use metrics_exporter_prometheus::PrometheusBuilder;
use metrolist::workflows::ami::AmiIncomeTable;
use metrolist::workflows::search::Home;
use metrolist_api::infra::{AmiTableStatus, AppState, Catalog};
use metrolist_api::routes::with_search_routes;
use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower::ServiceExt;

fn listings() -> Vec<Home> {
    serde_json::from_value(json!([
        {
            "offer": "rent", "city": "Boston", "neighborhood": "Dorchester",
            "type": "apt", "incomeRestricted": true,
            "units": [
                { "bedrooms": 1, "price": 1250, "amiQualification": 60 },
                { "bedrooms": 2, "price": 1600, "amiQualification": 80 }
            ]
        },
        {
            "offer": "sale", "city": "Boston", "neighborhood": "Mattapan",
            "incomeRestricted": true,
            "units": [{ "bedrooms": 3, "price": 310000, "amiQualification": 100 }]
        },
        {
            "offer": "rent", "city": "Quincy", "cardinalDirection": "south",
            "type": "apt", "incomeRestricted": false,
            "units": [{ "bedrooms": 1, "price": 2200 }]
        }
    ]))
    .expect("listings parse")
}

async fn build_router(ready: bool) -> axum::Router {
    let catalog = Arc::new(Catalog::new(2));
    catalog.install_listings(listings()).await;
    catalog
        .set_ami_table(AmiTableStatus::Ready(AmiIncomeTable::boston_2020()))
        .await;

    let state = AppState {
        readiness: Arc::new(AtomicBool::new(ready)),
        metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        catalog: catalog.clone(),
    };
    with_search_routes(catalog).layer(Extension(state))
}

async fn send(router: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("router dispatch");
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, payload)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
        .expect("request")
}

#[tokio::test]
async fn search_applies_saved_filters_and_pages() {
    let router = build_router(true).await;
    let request = post_json(
        "/api/v1/search?page=1",
        json!({ "filters": { "offer": { "rent": true }, "amiQualification": { "lowerBound": 70, "upperBound": 200 } } }),
    );

    let (status, payload) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["results"]["totalMatches"], json!(2));
    assert_eq!(payload["results"]["currentPage"], json!(1));
    assert_eq!(payload["showClearFilters"], json!(true));
    let units = payload["results"]["homes"][0]["units"]
        .as_array()
        .expect("units");
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["amiQualification"], json!(80.0));
    assert_eq!(
        payload["filters"]["location"]["neighborhood"],
        json!({ "Dorchester": false, "Mattapan": false })
    );
}

#[tokio::test]
async fn invalid_page_falls_back_to_first() {
    let router = build_router(true).await;
    let (status, payload) = send(router, post_json("/api/v1/search?page=abc", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["results"]["currentPage"], json!(1));
    assert_eq!(payload["results"]["totalPages"], json!(2));
}

#[tokio::test]
async fn filter_change_returns_next_tree() {
    let router = build_router(true).await;
    let request = post_json(
        "/api/v1/filters/change",
        json!({
            "change": {
                "criterion": "location",
                "name": "cardinalDirection",
                "value": "south",
                "input": { "type": "checkbox", "checked": true }
            }
        }),
    );

    let (status, payload) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["location"]["cardinalDirection"]["south"], json!(true));
    assert_eq!(payload["location"]["city"]["beyondBoston"], json!(true));
}

#[tokio::test]
async fn invalid_filter_change_is_unprocessable() {
    let router = build_router(true).await;
    let request = post_json(
        "/api/v1/filters/change",
        json!({
            "change": {
                "criterion": "amiQualification",
                "name": "lowerBound",
                "value": "a lot",
                "input": { "type": "value" }
            }
        }),
    );

    let (status, payload) = send(router, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(payload["error"].as_str().is_some());
}

#[tokio::test]
async fn estimate_endpoint_uses_loaded_table() {
    let router = build_router(true).await;
    let request = post_json(
        "/api/v1/ami/estimate",
        json!({ "householdSize": "4", "householdIncome": "$5,000.00", "incomeRate": "Monthly" }),
    );

    let (status, payload) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        payload,
        json!({ "estimation": 52, "recommendation": 55, "aboveUpperBound": false })
    );
}

#[tokio::test]
async fn listing_counts_and_readiness() {
    let router = build_router(false).await;
    let (status, counts) = send(
        router.clone(),
        Request::builder()
            .uri("/api/v1/listing-counts")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts["offer"], json!({ "rent": 2, "sale": 1 }));
    assert_eq!(counts["location"]["cardinalDirection"]["south"], json!(1));

    let (status, ready) = send(
        router,
        Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready["status"], json!("initializing"));
    assert_eq!(ready["listings"]["homes"], json!(3));
    assert!(ready["listings"]["fetchedAt"].is_string());
    assert_eq!(ready["amiTable"], json!("ready"));
}
