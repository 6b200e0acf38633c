use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
	Error, Result, SearchService,
	search::{PaperHit, Pagination},
};

const SIMILAR_DEFAULT_LIMIT: usize = 5;
const SIMILAR_OVERFETCH: usize = 5;
const COLLABORATOR_LIMIT: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
	pub document: PaperHit,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorDocumentsResponse {
	pub documents: Vec<PaperHit>,
	pub pagination: Pagination,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarResponse {
	pub source: SimilarSource,
	pub similar: Vec<SimilarHit>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarSource {
	pub id: String,
	pub title: String,
	pub subject_areas: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarHit {
	#[serde(flatten)]
	pub document: PaperHit,
	pub similarity_score: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollaboratorsResponse {
	pub author_id: String,
	pub total_papers: u64,
	pub collaborators: Vec<Collaborator>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Collaborator {
	pub author_id: String,
	pub author_name: String,
	pub author_affiliation: String,
	pub joint_papers: u64,
}

impl SearchService {
	pub async fn get_document(&self, id: &str) -> Result<DocumentResponse> {
		let paper = self
			.store
			.get(id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("document {id} not found.") })?;

		Ok(DocumentResponse { document: PaperHit::from_paper(&paper, 0.0) })
	}

	pub async fn documents_by_author(
		&self,
		author_id: &str,
		page: u32,
		per_page: u32,
	) -> Result<AuthorDocumentsResponse> {
		if author_id.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "author id must be non-empty.".to_string(),
			});
		}

		let page = page.max(1);
		let per_page = per_page.clamp(1, crate::request::MAX_PER_PAGE);
		let (papers, total) =
			self.store.fetch_by_author(author_id, page as u64, per_page as u64).await?;
		let documents =
			papers.iter().map(|paper| PaperHit::from_paper(paper, 0.0)).collect();

		Ok(AuthorDocumentsResponse {
			documents,
			pagination: Pagination {
				page,
				per_page,
				total,
				total_pages: total.div_ceil(per_page as u64),
			},
		})
	}

	/// Nearest neighbours of an already-indexed document: fetch its stored
	/// vector, run a k-NN with the source excluded, hydrate in engine order.
	pub async fn similar_documents(&self, id: &str, limit: usize) -> Result<SimilarResponse> {
		let limit = if limit == 0 { SIMILAR_DEFAULT_LIMIT } else { limit };
		let source_body = json!({
			"size": 1,
			"query": { "term": { "mongo_id": id } },
			"_source": ["mongo_id", "title", "subject_area", "embedding"]
		});
		let source_response = self.engine.search(source_body).await?;
		let Some(source_hit) = source_response["hits"]["hits"].as_array().and_then(|h| h.first())
		else {
			return Err(Error::NotFound { message: format!("document {id} is not indexed.") });
		};
		let vector = parse_vector(&source_hit["_source"]["embedding"])?;
		let source = SimilarSource {
			id: id.to_string(),
			title: source_hit["_source"]["title"].as_str().unwrap_or_default().to_string(),
			subject_areas: string_list(&source_hit["_source"]["subject_area"]),
		};
		let k = limit + SIMILAR_OVERFETCH;
		let knn_body = json!({
			"size": k,
			"query": {
				"bool": {
					"must": [
						{ "knn": { "embedding": { "vector": vector, "k": k } } }
					],
					"must_not": [
						{ "term": { "mongo_id": id } }
					]
				}
			},
			"_source": ["mongo_id"]
		});
		let response = self.engine.search(knn_body).await?;
		let (hits, _) = crate::search::parse_hits(&response);
		let ids: Vec<String> = hits.iter().map(|hit| hit.mongo_id.clone()).collect();
		let papers = self.store.fetch_by_ids(&ids).await?;
		let (documents, _) = crate::search::hydrate_in_order(&hits, &papers);
		let similar = documents
			.into_iter()
			.take(limit)
			.map(|document| {
				let similarity_score = document.score;

				SimilarHit { document, similarity_score }
			})
			.collect();

		Ok(SimilarResponse { source, similar })
	}

	/// Co-author aggregation: authors co-occurring on this author's papers,
	/// excluding the author, with one top hit for the display fields.
	pub async fn collaborators(&self, author_id: &str) -> Result<CollaboratorsResponse> {
		if author_id.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "author id must be non-empty.".to_string(),
			});
		}

		let body = json!({
			"size": 0,
			"track_total_hits": true,
			"query": {
				"nested": {
					"path": "authors",
					"query": { "term": { "authors.author_id": author_id } }
				}
			},
			"aggs": {
				"authors": {
					"nested": { "path": "authors" },
					"aggs": {
						"collaborators": {
							"terms": {
								"field": "authors.author_id",
								"size": COLLABORATOR_LIMIT,
								"exclude": [author_id]
							},
							"aggs": {
								"details": {
									"top_hits": {
										"size": 1,
										"_source": [
											"authors.author_name",
											"authors.author_affiliation"
										]
									}
								}
							}
						}
					}
				}
			}
		});
		let response = self.engine.search(body).await?;
		let total_papers = crate::search::total_hits(&response);
		let collaborators = parse_collaborators(&response);

		Ok(CollaboratorsResponse { author_id: author_id.to_string(), total_papers, collaborators })
	}
}

fn parse_collaborators(response: &Value) -> Vec<Collaborator> {
	response["aggregations"]["authors"]["collaborators"]["buckets"]
		.as_array()
		.map(|buckets| {
			buckets
				.iter()
				.filter_map(|bucket| {
					let author_id = bucket["key"].as_str()?.to_string();
					let source =
						&bucket["details"]["hits"]["hits"][0]["_source"];

					Some(Collaborator {
						author_id,
						author_name: source["author_name"].as_str().unwrap_or_default().to_string(),
						author_affiliation: source["author_affiliation"]
							.as_str()
							.unwrap_or_default()
							.to_string(),
						joint_papers: bucket["doc_count"].as_u64().unwrap_or(0),
					})
				})
				.collect()
		})
		.unwrap_or_default()
}

fn parse_vector(value: &Value) -> Result<Vec<f32>> {
	value
		.as_array()
		.map(|values| values.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
		.filter(|vector: &Vec<f32>| !vector.is_empty())
		.ok_or_else(|| Error::Engine {
			message: "indexed document is missing its embedding vector.".to_string(),
		})
}

fn string_list(value: &Value) -> Vec<String> {
	value
		.as_array()
		.map(|values| {
			values.iter().filter_map(|v| v.as_str()).map(|v| v.to_string()).collect()
		})
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parse_vector_rejects_missing_embeddings() {
		assert!(parse_vector(&json!([0.1, 0.2])).is_ok());
		assert!(parse_vector(&json!([])).is_err());
		assert!(parse_vector(&json!(null)).is_err());
	}

	#[test]
	fn parse_collaborators_reads_nested_buckets() {
		let response = json!({
			"aggregations": {
				"authors": {
					"collaborators": {
						"buckets": [
							{
								"key": "AID7",
								"doc_count": 12,
								"details": {
									"hits": {
										"hits": [
											{
												"_source": {
													"author_name": "C. Coauthor",
													"author_affiliation": "Example University"
												}
											}
										]
									}
								}
							}
						]
					}
				}
			}
		});
		let collaborators = parse_collaborators(&response);

		assert_eq!(collaborators.len(), 1);
		assert_eq!(collaborators[0].author_id, "AID7");
		assert_eq!(collaborators[0].author_name, "C. Coauthor");
		assert_eq!(collaborators[0].joint_papers, 12);
	}
}
