use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::{Result, SearchService, query, request::SearchRequest, result_cache};
use folio_storage::models::{Paper, Person};

pub const NO_RESULTS_MESSAGE: &str = "No relevant results found for your query";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub results: Vec<PaperHit>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub related_people: Option<Vec<RelatedPerson>>,
	pub facets: Facets,
	pub pagination: Pagination,
	pub meta: SearchMeta,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaperHit {
	pub id: String,
	pub title: String,
	#[serde(rename = "abstract")]
	pub abstract_text: String,
	pub authors: Vec<AuthorView>,
	pub publication_year: i32,
	pub field_associated: String,
	pub document_type: String,
	pub subject_area: Vec<String>,
	pub citation_count: i64,
	pub reference_count: i64,
	pub score: f64,
}
impl PaperHit {
	pub fn from_paper(paper: &Paper, score: f64) -> Self {
		Self {
			id: paper.id.to_hex(),
			title: paper.title.clone(),
			abstract_text: paper.abstract_text.clone(),
			authors: paper
				.authors
				.iter()
				.map(|author| AuthorView {
					author_id: author.author_id.clone(),
					author_name: author.author_name.clone(),
					author_position: author.author_position.clone(),
					author_affiliation: author.author_affiliation.clone(),
				})
				.collect(),
			publication_year: paper.publication_year,
			field_associated: paper.field_associated.clone(),
			document_type: paper.document_type.clone(),
			subject_area: paper.subject_area.clone(),
			citation_count: paper.citation_count,
			reference_count: paper.reference_count,
			score,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorView {
	pub author_id: String,
	pub author_name: String,
	pub author_position: String,
	pub author_affiliation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelatedPerson {
	pub id: String,
	pub name: String,
	pub email: String,
	pub department: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Facets {
	pub years: Vec<FacetBucket>,
	pub year_ranges: Vec<FacetBucket>,
	pub document_types: Vec<FacetBucket>,
	pub fields: Vec<FacetBucket>,
	pub subject_areas: Vec<FacetBucket>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
	pub key: String,
	pub count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pagination {
	pub page: u32,
	pub per_page: u32,
	pub total: u64,
	pub total_pages: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchMeta {
	pub took_ms: u64,
	pub cache_hit: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineHit {
	pub mongo_id: String,
	pub score: f64,
}

impl SearchService {
	/// Top-level hybrid search: result cache, query embedding, BM25
	/// pre-check, mode-specific engine query, order-preserving hydration,
	/// optional related-people enrichment.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		req.validate()?;

		let started = Instant::now();
		let key = result_cache::cache_key(&req);

		if let Some(raw) = self.results.get(&key).await
			&& let Ok(mut cached) = serde_json::from_value::<SearchResponse>(raw)
		{
			cached.meta.cache_hit = true;
			cached.meta.took_ms = started.elapsed().as_millis() as u64;

			return Ok(cached);
		}

		let query_text = req.query.trim().to_string();
		let query_vector = self.embedder.embed_query(&query_text).await?;

		// Lexical gate: a query with zero BM25 hits short-circuits before
		// the vector path can surface semantically-near but lexically
		// unrelated papers. The empty response is not cached.
		let precheck = self.engine.search(query::precheck(&query_text)).await?;

		if total_hits(&precheck) == 0 {
			return Ok(empty_response(&req, started.elapsed().as_millis() as u64));
		}

		let min_score = query::runtime_min_score(req.sort);
		let body = query::build(
			&req,
			&query_vector,
			min_score,
			OffsetDateTime::now_utc().year(),
		);
		let response = self.engine.search(body).await?;
		let (hits, total) = parse_hits(&response);
		let facets = parse_facets(&response["aggregations"]);
		let ids: Vec<String> = hits.iter().map(|hit| hit.mongo_id.clone()).collect();
		let papers = self.store.fetch_by_ids(&ids).await?;
		let (results, dropped) = hydrate_in_order(&hits, &papers);

		if dropped > 0 {
			tracing::warn!(dropped, "Hydration dropped hits missing from the document store.");
		}

		let related_people = if self.cfg.search.related_people_enabled {
			Some(self.related_people(&papers).await)
		} else {
			None
		};
		let shaped = SearchResponse {
			results,
			related_people,
			facets,
			pagination: pagination(&req, total),
			meta: SearchMeta { took_ms: started.elapsed().as_millis() as u64, cache_hit: false },
			message: None,
		};

		if let Ok(raw) = serde_json::to_value(&shaped) {
			self.results.put(&key, &raw).await;
		}

		Ok(shaped)
	}

	/// Email-prefix lookup into the people collection, deduplicated by id.
	/// Failures degrade to an empty list.
	async fn related_people(&self, papers: &[Paper]) -> Vec<RelatedPerson> {
		let mut prefixes: Vec<String> = papers
			.iter()
			.flat_map(|paper| paper.authors.iter())
			.filter(|author| {
				author.matched_profile_id.as_deref().is_some_and(|id| !id.trim().is_empty())
			})
			.filter_map(|author| author.email_prefix())
			.collect();

		prefixes.sort_unstable();
		prefixes.dedup();

		if prefixes.is_empty() {
			return Vec::new();
		}

		let people = match self.store.people_by_email_prefixes(&prefixes).await {
			Ok(people) => people,
			Err(err) => {
				tracing::warn!(error = %err, "Related-people lookup failed.");

				return Vec::new();
			},
		};

		dedupe_people(people)
	}
}

pub(crate) fn total_hits(response: &Value) -> u64 {
	response["hits"]["total"]["value"].as_u64().unwrap_or(0)
}

pub(crate) fn parse_hits(response: &Value) -> (Vec<EngineHit>, u64) {
	let hits = response["hits"]["hits"]
		.as_array()
		.map(|hits| {
			hits.iter()
				.filter_map(|hit| {
					let mongo_id = hit["_source"]["mongo_id"].as_str()?.to_string();
					let score = hit["_score"].as_f64().unwrap_or(0.0);

					Some(EngineHit { mongo_id, score })
				})
				.collect()
		})
		.unwrap_or_default();

	(hits, total_hits(response))
}

/// Re-emits hydrated records in the engine's hit order. Ids that failed to
/// hydrate are dropped without disturbing the ordering of the rest.
pub(crate) fn hydrate_in_order(hits: &[EngineHit], papers: &[Paper]) -> (Vec<PaperHit>, usize) {
	let by_id: HashMap<String, &Paper> =
		papers.iter().map(|paper| (paper.id.to_hex(), paper)).collect();
	let mut results = Vec::with_capacity(hits.len());
	let mut dropped = 0;

	for hit in hits {
		match by_id.get(&hit.mongo_id) {
			Some(paper) => results.push(PaperHit::from_paper(paper, hit.score)),
			None => dropped += 1,
		}
	}

	(results, dropped)
}

pub(crate) fn parse_facets(aggregations: &Value) -> Facets {
	Facets {
		years: buckets(&aggregations["years"]),
		year_ranges: buckets(&aggregations["year_ranges"]),
		document_types: buckets(&aggregations["document_types"]),
		fields: buckets(&aggregations["fields"]),
		subject_areas: buckets(&aggregations["subject_areas"]),
	}
}

fn buckets(aggregation: &Value) -> Vec<FacetBucket> {
	aggregation["buckets"]
		.as_array()
		.map(|buckets| {
			buckets
				.iter()
				.filter_map(|bucket| {
					let key = match &bucket["key"] {
						Value::String(key) => key.clone(),
						Value::Number(key) => key.to_string(),
						_ => return None,
					};

					Some(FacetBucket { key, count: bucket["doc_count"].as_u64().unwrap_or(0) })
				})
				.collect()
		})
		.unwrap_or_default()
}

fn pagination(req: &SearchRequest, total: u64) -> Pagination {
	Pagination {
		page: req.page,
		per_page: req.per_page,
		total,
		total_pages: total.div_ceil(req.per_page as u64),
	}
}

fn empty_response(req: &SearchRequest, took_ms: u64) -> SearchResponse {
	SearchResponse {
		results: Vec::new(),
		related_people: None,
		facets: Facets::default(),
		pagination: pagination(req, 0),
		meta: SearchMeta { took_ms, cache_hit: false },
		message: Some(NO_RESULTS_MESSAGE.to_string()),
	}
}

fn dedupe_people(people: Vec<Person>) -> Vec<RelatedPerson> {
	let mut seen = std::collections::HashSet::new();
	let mut out = Vec::new();

	for person in people {
		let id = person.id.to_hex();

		if seen.insert(id.clone()) {
			out.push(RelatedPerson {
				id,
				name: person.name,
				email: person.email,
				department: person.department,
			});
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use folio_storage::models::Paper;

	fn paper(hex: &str, title: &str) -> Paper {
		serde_json::from_value(json!({
			"_id": { "$oid": hex },
			"title": title,
			"abstract": "",
			"authors": [],
			"publication_year": 2020,
			"field_associated": "",
			"document_type": "",
			"subject_area": [],
			"citation_count": 0,
			"reference_count": 0
		}))
		.expect("paper fixture")
	}

	const ID_A: &str = "65f1a2b3c4d5e6f708192a01";
	const ID_B: &str = "65f1a2b3c4d5e6f708192a02";
	const ID_C: &str = "65f1a2b3c4d5e6f708192a03";

	#[test]
	fn parse_hits_reads_scores_and_total() {
		let response = json!({
			"hits": {
				"total": { "value": 2 },
				"hits": [
					{ "_score": 0.72, "_source": { "mongo_id": ID_A } },
					{ "_score": 0.41, "_source": { "mongo_id": ID_B } }
				]
			}
		});
		let (hits, total) = parse_hits(&response);

		assert_eq!(total, 2);
		assert_eq!(hits.len(), 2);
		assert_eq!(hits[0].mongo_id, ID_A);
		assert_eq!(hits[0].score, 0.72);
		assert_eq!(hits[1].score, 0.41);
	}

	#[test]
	fn hydration_preserves_engine_order() {
		let hits = vec![
			EngineHit { mongo_id: ID_B.to_string(), score: 0.9 },
			EngineHit { mongo_id: ID_A.to_string(), score: 0.5 },
		];
		// Store returns records in its own order.
		let papers = vec![paper(ID_A, "first"), paper(ID_B, "second")];
		let (results, dropped) = hydrate_in_order(&hits, &papers);

		assert_eq!(dropped, 0);
		assert_eq!(results[0].id, ID_B);
		assert_eq!(results[1].id, ID_A);
	}

	#[test]
	fn hydration_drops_missing_ids_without_reordering() {
		let hits = vec![
			EngineHit { mongo_id: ID_A.to_string(), score: 0.9 },
			EngineHit { mongo_id: ID_C.to_string(), score: 0.7 },
			EngineHit { mongo_id: ID_B.to_string(), score: 0.5 },
		];
		let papers = vec![paper(ID_A, "a"), paper(ID_B, "b")];
		let (results, dropped) = hydrate_in_order(&hits, &papers);

		assert_eq!(dropped, 1);
		assert_eq!(results.len(), 2);
		assert_eq!(results[0].id, ID_A);
		assert_eq!(results[1].id, ID_B);
	}

	#[test]
	fn facets_parse_numeric_and_string_keys() {
		let aggregations = json!({
			"years": { "buckets": [ { "key": 2024, "doc_count": 7 }, { "key": 2023, "doc_count": 3 } ] },
			"year_ranges": { "buckets": [ { "key": "<2000", "doc_count": 1 } ] },
			"document_types": { "buckets": [ { "key": "Article", "doc_count": 9 } ] },
			"fields": { "buckets": [] },
			"subject_areas": { "buckets": [ { "key": "PHYS", "doc_count": 4 } ] }
		});
		let facets = parse_facets(&aggregations);

		assert_eq!(facets.years[0], FacetBucket { key: "2024".to_string(), count: 7 });
		assert_eq!(facets.year_ranges[0].key, "<2000");
		assert_eq!(facets.document_types[0].count, 9);
		assert!(facets.fields.is_empty());
		assert_eq!(facets.subject_areas[0].key, "PHYS");
	}

	#[test]
	fn pagination_rounds_total_pages_up() {
		let req = SearchRequest {
			query: "q".to_string(),
			filters: Default::default(),
			sort: Default::default(),
			page: 1,
			per_page: 10,
			search_in: None,
		};

		assert_eq!(pagination(&req, 0).total_pages, 0);
		assert_eq!(pagination(&req, 10).total_pages, 1);
		assert_eq!(pagination(&req, 11).total_pages, 2);
	}

	#[test]
	fn empty_response_carries_the_fixed_message() {
		let req = SearchRequest {
			query: "zzzqqq".to_string(),
			filters: Default::default(),
			sort: Default::default(),
			page: 1,
			per_page: 10,
			search_in: None,
		};
		let response = empty_response(&req, 4);

		assert!(response.results.is_empty());
		assert_eq!(response.pagination.total, 0);
		assert!(!response.meta.cache_hit);
		assert_eq!(response.message.as_deref(), Some(NO_RESULTS_MESSAGE));
	}
}
