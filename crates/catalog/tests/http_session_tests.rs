//! CatalogSession against a real local HTTP server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use catalog::{
    profile, BandResolver, CatalogEndpoints, CatalogSession, Query, RetryPolicy, SearchCoordinator,
};
use sat_common::{AcquisitionError, AcquisitionResult};
use test_utils::{copenhagen_aoi, feature_collection, june_2024, stac_feature};

struct ServerState {
    calls: AtomicUsize,
    /// Number of leading requests answered with this status.
    failures: usize,
    failure_status: StatusCode,
    features: Vec<Value>,
}

async fn search(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let call = state.calls.fetch_add(1, Ordering::SeqCst);
    if call < state.failures {
        return (state.failure_status, "upstream unavailable").into_response();
    }

    let limit = body["limit"].as_u64().unwrap_or(10) as usize;
    let offset = body["token"].as_u64().unwrap_or(0) as usize;
    let end = (offset + limit).min(state.features.len());
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("127.0.0.1");
    let next = (end < state.features.len()).then(|| {
        json!({
            "rel": "next",
            "href": format!("http://{}/search", host),
            "method": "POST",
            "body": { "token": end },
            "merge": true
        })
    });
    Json(feature_collection(state.features[offset..end].to_vec(), next)).into_response()
}

async fn not_json() -> &'static str {
    "<html>maintenance</html>"
}

async fn spawn_server(state: ServerState) -> (SocketAddr, Arc<ServerState>) {
    let state = Arc::new(state);
    let app = Router::new()
        .route("/search", post(search))
        .route("/broken", post(not_json))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn features(n: usize) -> Vec<Value> {
    (1..=n)
        .map(|d| {
            stac_feature(
                &format!("S2A_T33UUB_2024060{}", d),
                &format!("2024-06-0{}T10:36:29Z", d),
                (12.0, 55.0, 13.6, 56.0),
                Some(10.0),
                &[("B04", "https://example.test/B04.tif")],
            )
        })
        .collect()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
    }
}

async fn search_at(url: String, page_size: usize) -> AcquisitionResult<Vec<catalog::CatalogItem>> {
    let query = Query::builder("S2MPC", copenhagen_aoi())
        .time_range(june_2024())
        .bands(["red"])
        .build()?;
    let profile = profile(&query.satellite)?;
    let bands = BandResolver::resolve(profile, query.bands.as_deref())?;
    let session = CatalogSession::new(Duration::from_secs(5)).unwrap();

    SearchCoordinator::new(Arc::new(session), fast_retry())
        .with_endpoints(CatalogEndpoints::all(url))
        .with_page_size(page_size)
        .search(&query, profile, &bands)
        .await
}

#[tokio::test]
async fn test_session_follows_post_pagination() {
    let (addr, state) = spawn_server(ServerState {
        calls: AtomicUsize::new(0),
        failures: 0,
        failure_status: StatusCode::OK,
        features: features(3),
    })
    .await;

    let items = search_at(format!("http://{}/search", addr), 2).await.unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(state.calls.load(Ordering::SeqCst), 2);
    assert_eq!(items[0].asset("B04").unwrap().href, "https://example.test/B04.tif");
}

#[tokio::test]
async fn test_session_retries_service_unavailable() {
    let (addr, state) = spawn_server(ServerState {
        calls: AtomicUsize::new(0),
        failures: 1,
        failure_status: StatusCode::SERVICE_UNAVAILABLE,
        features: features(1),
    })
    .await;

    let items = search_at(format!("http://{}/search", addr), 10).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(state.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_session_gives_up_after_max_attempts() {
    let (addr, state) = spawn_server(ServerState {
        calls: AtomicUsize::new(0),
        failures: usize::MAX,
        failure_status: StatusCode::BAD_GATEWAY,
        features: Vec::new(),
    })
    .await;

    let err = search_at(format!("http://{}/search", addr), 10).await.unwrap_err();

    assert!(matches!(err, AcquisitionError::ProviderUnavailable { attempts: 3, .. }));
    assert_eq!(state.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_session_client_error_is_permanent() {
    let (addr, state) = spawn_server(ServerState {
        calls: AtomicUsize::new(0),
        failures: usize::MAX,
        failure_status: StatusCode::BAD_REQUEST,
        features: Vec::new(),
    })
    .await;

    let err = search_at(format!("http://{}/search", addr), 10).await.unwrap_err();

    match err {
        AcquisitionError::Catalog { provider, message } => {
            assert_eq!(provider, "planetary_computer");
            assert!(message.contains("400"), "{}", message);
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_session_rejects_non_stac_body() {
    let (addr, _) = spawn_server(ServerState {
        calls: AtomicUsize::new(0),
        failures: 0,
        failure_status: StatusCode::OK,
        features: Vec::new(),
    })
    .await;

    let err = search_at(format!("http://{}/broken", addr), 10).await.unwrap_err();
    assert!(matches!(err, AcquisitionError::Catalog { .. }));
}
