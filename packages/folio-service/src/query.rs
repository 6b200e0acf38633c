use serde_json::{Value, json};

use crate::request::{SearchField, SearchFilters, SearchRequest, SortMode, effective_search_in};

/// Informational per-mode floors. The orchestrator commits the runtime
/// value from `runtime_min_score`.
pub const MIN_SCORE_HYBRID: f64 = 5.0;
pub const MIN_SCORE_IMPACT: f64 = 5.0;
pub const MIN_SCORE_NORMALIZED: f64 = 0.3;
pub const RELAXED_MIN_SCORE: f64 = 1.0;

pub const KNN_K: u64 = 100;
pub const BM25_WEIGHT: f64 = 0.4;
pub const VECTOR_WEIGHT: f64 = 0.6;
pub const CITATION_FACTOR: f64 = 0.3;
pub const PHRASE_BOOST: f64 = 2.5;
pub const PHRASE_SLOP: u64 = 2;
/// Multiplier applied to base boosts when the caller names the logical
/// field explicitly in `search_in`.
const EXPLICIT_FIELD_MULTIPLIER: f64 = 1.5;

const NORMALIZED_SCRIPT: &str = "\
double bm25 = _score / (1.0 + _score); \
double cos = cosineSimilarity(params.query_vector, doc['embedding']); \
double knn = (cos + 1.0) / 2.0; \
return params.bm25_weight * bm25 + params.vector_weight * knn;";

/// The score floor the orchestrator actually sends: the normalized mode
/// keeps its own scale, everything else relaxes to 1.0.
pub fn runtime_min_score(sort: SortMode) -> f64 {
	match sort {
		SortMode::Normalized => MIN_SCORE_NORMALIZED,
		_ => RELAXED_MIN_SCORE,
	}
}

/// Builds the complete engine query body for the requested ranking mode.
pub fn build(
	req: &SearchRequest,
	query_vector: &[f32],
	min_score: f64,
	current_year: i32,
) -> Value {
	let query = req.query.trim();
	let filters = compile_filters(&req.filters);
	let fields = boosted_fields(req.search_in.as_deref());
	let mut body = match req.sort {
		SortMode::Impact => impact_query(query, &fields, filters, current_year),
		SortMode::Normalized => normalized_query(query, &fields, filters, query_vector),
		_ => hybrid_query(query, &fields, filters, query_vector),
	};

	body["min_score"] = json!(min_score);
	body["aggs"] = aggregations();
	body["track_total_hits"] = json!(true);
	body["_source"] = json!(["mongo_id"]);
	body["from"] = json!(req.page.saturating_sub(1) * req.per_page);
	body["size"] = json!(req.per_page);

	if let Some(sort) = sort_clause(req.sort) {
		body["sort"] = sort;
	}

	body
}

/// Cheap BM25-only pre-check used to gate the vector path: `size=0`, total
/// hits only.
pub fn precheck(query: &str) -> Value {
	json!({
		"size": 0,
		"track_total_hits": true,
		"query": {
			"multi_match": {
				"query": query,
				"fields": ["title", "abstract", "author_names", "subject_area"]
			}
		}
	})
}

fn hybrid_query(
	query: &str,
	fields: &[String],
	filters: Vec<Value>,
	query_vector: &[f32],
) -> Value {
	let mut should = lexical_clauses(query, fields);

	should.push(json!({
		"knn": {
			"embedding": {
				"vector": query_vector,
				"k": KNN_K
			}
		}
	}));

	json!({
		"query": {
			"bool": {
				"should": should,
				"minimum_should_match": 1,
				"filter": filters
			}
		}
	})
}

// The vector clause is deliberately absent here: keyword gating keeps the
// impact ranking from drifting into unrelated highly-cited content.
fn impact_query(query: &str, fields: &[String], filters: Vec<Value>, current_year: i32) -> Value {
	let mut should = lexical_clauses(query, fields);
	let must = should.remove(0);

	json!({
		"query": {
			"function_score": {
				"query": {
					"bool": {
						"must": [must],
						"should": should,
						"filter": filters
					}
				},
				"functions": [
					{
						"field_value_factor": {
							"field": "citation_count",
							"modifier": "log1p",
							"factor": CITATION_FACTOR,
							"missing": 0
						},
						"weight": 1.2
					},
					{
						"gauss": {
							"publication_year": {
								"origin": current_year,
								"scale": 5,
								"decay": 0.5
							}
						},
						"weight": 0.8
					}
				],
				"score_mode": "sum",
				"boost_mode": "multiply"
			}
		}
	})
}

fn normalized_query(
	query: &str,
	fields: &[String],
	filters: Vec<Value>,
	query_vector: &[f32],
) -> Value {
	let should = lexical_clauses(query, fields);

	json!({
		"query": {
			"script_score": {
				"query": {
					"bool": {
						"should": should,
						"minimum_should_match": 1,
						"filter": filters
					}
				},
				"script": {
					"source": NORMALIZED_SCRIPT,
					"params": {
						"query_vector": query_vector,
						"bm25_weight": BM25_WEIGHT,
						"vector_weight": VECTOR_WEIGHT
					}
				}
			}
		}
	})
}

/// Shared lexical clauses: weighted multi-match first, then the subject and
/// field matches, then the optional multi-word phrase boost.
fn lexical_clauses(query: &str, fields: &[String]) -> Vec<Value> {
	let mut clauses = vec![
		json!({
			"multi_match": {
				"query": query,
				"fields": fields,
				"type": "best_fields",
				"tie_breaker": 0.3,
				"fuzziness": "AUTO"
			}
		}),
		json!({
			"match": {
				"subject_area": {
					"query": query,
					"boost": 2.0
				}
			}
		}),
		json!({
			"match": {
				"field_associated": {
					"query": query,
					"boost": 1.5
				}
			}
		}),
	];

	if let Some(phrase) = phrase_clause(query) {
		clauses.push(phrase);
	}

	clauses
}

/// Phrase boost applies only to multi-word queries.
fn phrase_clause(query: &str) -> Option<Value> {
	if query.trim().split_whitespace().count() < 2 {
		return None;
	}

	Some(json!({
		"multi_match": {
			"query": query,
			"type": "phrase",
			"fields": ["title^5", "abstract^2"],
			"slop": PHRASE_SLOP,
			"boost": PHRASE_BOOST
		}
	}))
}

/// Expands the logical `search_in` set into concrete engine fields with the
/// default boost table; explicitly requested fields get a 1.5x bump.
fn boosted_fields(search_in: Option<&[SearchField]>) -> Vec<String> {
	let explicit = search_in.is_some_and(|fields| !fields.is_empty());
	let multiplier = if explicit { EXPLICIT_FIELD_MULTIPLIER } else { 1.0 };
	let mut out = Vec::new();

	for field in effective_search_in(search_in) {
		for (name, boost) in base_boosts(field) {
			out.push(format!("{name}^{}", boost * multiplier));
		}
	}

	out
}

fn base_boosts(field: SearchField) -> &'static [(&'static str, f64)] {
	match field {
		SearchField::Title => &[("title", 4.0), ("title.exact", 5.0)],
		SearchField::Abstract => &[("abstract", 1.5)],
		SearchField::SubjectArea => &[("subject_area", 3.0), ("subject_area.ngram", 2.0)],
		SearchField::Author => &[
			("author_names", 2.0),
			("author_names.ngram", 1.5),
			("author_name_variants", 2.5),
			("author_name_variants.ngram", 1.5),
		],
		SearchField::Field => &[("field_associated", 2.5), ("field_associated.ngram", 1.5)],
	}
}

/// Compiles the enumerated filters into an array of filter clauses. Author
/// conditions are nested so they hold on a single author element.
fn compile_filters(filters: &SearchFilters) -> Vec<Value> {
	let mut clauses = Vec::new();

	if filters.year_from.is_some() || filters.year_to.is_some() {
		let mut range = serde_json::Map::new();

		if let Some(from) = filters.year_from {
			range.insert("gte".to_string(), json!(from));
		}
		if let Some(to) = filters.year_to {
			range.insert("lte".to_string(), json!(to));
		}

		clauses.push(json!({ "range": { "publication_year": range } }));
	}
	if let Some(field) = non_empty(filters.field_associated.as_deref()) {
		clauses.push(json!({ "term": { "field_associated.keyword": field } }));
	}
	if let Some(doc_type) = non_empty(filters.document_type.as_deref()) {
		clauses.push(json!({ "term": { "document_type": doc_type } }));
	}
	if let Some(types) = filters.document_types.as_ref().filter(|types| !types.is_empty()) {
		clauses.push(json!({ "terms": { "document_type": types } }));
	}
	if let Some(areas) = filters.subject_area.as_ref().filter(|areas| !areas.is_empty()) {
		clauses.push(json!({ "terms": { "subject_area.keyword": areas } }));
	}
	if let Some(author_id) = non_empty(filters.author_id.as_deref()) {
		clauses.push(json!({
			"nested": {
				"path": "authors",
				"query": { "term": { "authors.author_id": author_id } }
			}
		}));
	}
	if let Some(affiliation) = non_empty(filters.affiliation.as_deref()) {
		clauses.push(json!({
			"nested": {
				"path": "authors",
				"query": { "match": { "authors.author_affiliation": affiliation } }
			}
		}));
	}
	if filters.first_author_only == Some(true) {
		clauses.push(json!({
			"nested": {
				"path": "authors",
				"query": { "term": { "authors.author_position": 1 } }
			}
		}));
	}
	if filters.interdisciplinary == Some(true) {
		clauses.push(json!({ "range": { "subject_area_count": { "gte": 3 } } }));
	}

	clauses
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}

fn sort_clause(sort: SortMode) -> Option<Value> {
	match sort {
		SortMode::Date => Some(json!([{ "publication_year": { "order": "desc" } }, "_score"])),
		SortMode::Citations => Some(json!([{ "citation_count": { "order": "desc" } }, "_score"])),
		_ => None,
	}
}

/// The facet aggregations shipped with every search.
fn aggregations() -> Value {
	json!({
		"years": {
			"terms": {
				"field": "publication_year",
				"size": 30,
				"order": { "_key": "desc" }
			}
		},
		"year_ranges": {
			"range": {
				"field": "publication_year",
				"ranges": [
					{ "key": "<2000", "to": 2000 },
					{ "key": "2000-2009", "from": 2000, "to": 2010 },
					{ "key": "2010-2019", "from": 2010, "to": 2020 },
					{ "key": "2020-Present", "from": 2020 }
				]
			}
		},
		"document_types": {
			"terms": { "field": "document_type", "size": 15 }
		},
		"fields": {
			"terms": { "field": "field_associated.keyword", "size": 30 }
		},
		"subject_areas": {
			"terms": { "field": "subject_area.keyword", "size": 50 }
		}
	})
}
