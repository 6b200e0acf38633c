use std::collections::HashMap;

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use folio_api::{routes, state::AppState};

/// Config pointed at closed loopback ports: nothing here needs a live
/// backend, and connection attempts fail fast.
fn test_config() -> folio_config::Config {
	let vars = HashMap::from([
		("MONGODB_URI", "mongodb://127.0.0.1:1/research_db"),
		("OPENSEARCH_HOSTS", "http://127.0.0.1:1"),
		("REDIS_URL", "redis://127.0.0.1:1"),
		("EMBEDDING_SERVICE_URL", "http://127.0.0.1:1"),
		("EMBEDDING_TIMEOUT", "1"),
		("MAX_RETRIES", "1"),
	]);

	folio_config::Config::from_lookup(|key| vars.get(key).map(|value| value.to_string()))
		.expect("test config")
}

async fn test_app() -> axum::Router {
	let state = AppState::new(test_config()).await.expect("app state");

	routes::router(state)
}

async fn post_search(payload: serde_json::Value) -> (StatusCode, serde_json::Value) {
	let app = test_app().await;
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/v1/search")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("build request"),
		)
		.await
		.expect("call /search");
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
	let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

	(status, json)
}

#[tokio::test]
async fn empty_query_is_rejected() {
	let (status, json) = post_search(serde_json::json!({ "query": "" })).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "validation_error");
}

#[tokio::test]
async fn per_page_above_limit_is_rejected() {
	let (status, _) =
		post_search(serde_json::json!({ "query": "nanotubes", "per_page": 101 })).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_embedding_service_maps_to_503() {
	let (status, json) =
		post_search(serde_json::json!({ "query": "nanotubes", "per_page": 10 })).await;

	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(json["error_code"], "embedding_unavailable");
	assert_eq!(json["message"], "Embedding service unavailable.");
}

#[tokio::test]
async fn malformed_document_id_is_not_found() {
	let app = test_app().await;
	let response = app
		.oneshot(
			Request::builder()
				.uri("/api/v1/document/not-a-hex-id")
				.body(Body::empty())
				.expect("build request"),
		)
		.await
		.expect("call /document");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_unreachable_backends() {
	let app = test_app().await;
	let response = app
		.oneshot(
			Request::builder()
				.uri("/api/v1/search/health")
				.body(Body::empty())
				.expect("build request"),
		)
		.await
		.expect("call /search/health");

	assert_eq!(response.status(), StatusCode::OK);

	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("parse health");

	assert_eq!(json["healthy"], false);
	assert_eq!(json["embedding"], false);
	assert_eq!(json["cache"], false);
}
