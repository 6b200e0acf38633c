use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use folio_service::{
	SearchRequest, SearchResponse,
	documents::{
		AuthorDocumentsResponse, CollaboratorsResponse, DocumentResponse, SimilarResponse,
	},
	health::HealthReport,
};

const SEARCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/api/v1/search", post(search))
		.route("/api/v1/document/:id", get(document))
		.route("/api/v1/document/:id/similar", get(similar))
		.route("/api/v1/documents/by-author/:author_id", get(documents_by_author))
		.route("/api/v1/author/:id/collaborators", get(collaborators))
		.route("/api/v1/search/health", get(health))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
	page: Option<u32>,
	per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SimilarQuery {
	limit: Option<usize>,
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = tokio::time::timeout(SEARCH_TIMEOUT, state.service.search(payload))
		.await
		.map_err(|_| ApiError {
			status: StatusCode::INTERNAL_SERVER_ERROR,
			error_code: "timeout",
			message: "Search request timed out.".to_string(),
		})??;

	Ok(Json(response))
}

async fn document(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
	let response = state.service.get_document(&id).await?;

	Ok(Json(response))
}

async fn documents_by_author(
	State(state): State<AppState>,
	Path(author_id): Path<String>,
	Query(query): Query<PageQuery>,
) -> Result<Json<AuthorDocumentsResponse>, ApiError> {
	let response = state
		.service
		.documents_by_author(&author_id, query.page.unwrap_or(1), query.per_page.unwrap_or(10))
		.await?;

	Ok(Json(response))
}

async fn similar(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Query(query): Query<SimilarQuery>,
) -> Result<Json<SimilarResponse>, ApiError> {
	let response = state.service.similar_documents(&id, query.limit.unwrap_or(5)).await?;

	Ok(Json(response))
}

async fn collaborators(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<CollaboratorsResponse>, ApiError> {
	let response = state.service.collaborators(&id).await?;

	Ok(Json(response))
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
	Json(state.service.health().await)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}

impl From<folio_service::Error> for ApiError {
	fn from(err: folio_service::Error) -> Self {
		match err {
			folio_service::Error::InvalidRequest { message } =>
				Self { status: StatusCode::BAD_REQUEST, error_code: "validation_error", message },
			folio_service::Error::EmbeddingUnavailable { message } => {
				tracing::error!(detail = %message, "Embedding service unavailable.");

				Self {
					status: StatusCode::SERVICE_UNAVAILABLE,
					error_code: "embedding_unavailable",
					message: "Embedding service unavailable.".to_string(),
				}
			},
			folio_service::Error::Engine { message } => {
				tracing::error!(detail = %message, "Engine request failed.");

				Self {
					status: StatusCode::BAD_GATEWAY,
					error_code: "engine_error",
					message: "Search engine unavailable.".to_string(),
				}
			},
			folio_service::Error::NotFound { message } =>
				Self { status: StatusCode::NOT_FOUND, error_code: "not_found", message },
			folio_service::Error::Store { message } => {
				tracing::error!(detail = %message, "Document store request failed.");

				Self {
					status: StatusCode::INTERNAL_SERVER_ERROR,
					error_code: "internal_error",
					message: "Internal server error.".to_string(),
				}
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code.to_string(), message: self.message };

		(self.status, Json(body)).into_response()
	}
}
