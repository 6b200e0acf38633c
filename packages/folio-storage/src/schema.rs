use serde_json::{Value, json};

use folio_domain::EMBEDDING_DIM;

/// Declarative mapping for the paper index: custom BM25 tuned for academic
/// text, ngram and shingle analyzers, nested authors, and the HNSW vector
/// field.
pub fn index_mapping() -> Value {
	json!({
		"settings": {
			"index": {
				"knn": true,
				"knn.algo_param.ef_search": 300,
				"number_of_shards": 3,
				"number_of_replicas": 1,
				"max_ngram_diff": 2,
				"max_shingle_diff": 2
			},
			"similarity": {
				"custom_bm25": {
					"type": "BM25",
					"k1": 1.8,
					"b": 0.6
				}
			},
			"analysis": {
				"filter": {
					"ngram_filter": {
						"type": "ngram",
						"min_gram": 2,
						"max_gram": 4
					},
					"shingle_filter": {
						"type": "shingle",
						"min_shingle_size": 2,
						"max_shingle_size": 3,
						"output_unigrams": true
					}
				},
				"analyzer": {
					"ngram_analyzer": {
						"type": "custom",
						"tokenizer": "standard",
						"filter": ["lowercase", "ngram_filter"]
					},
					"shingle_analyzer": {
						"type": "custom",
						"tokenizer": "standard",
						"filter": ["lowercase", "shingle_filter"]
					}
				}
			}
		},
		"mappings": {
			"properties": {
				"mongo_id": { "type": "keyword", "doc_values": true },
				"title": {
					"type": "text",
					"analyzer": "english",
					"similarity": "custom_bm25",
					"fields": {
						"exact": { "type": "keyword" },
						"shingles": { "type": "text", "analyzer": "shingle_analyzer" }
					}
				},
				"abstract": {
					"type": "text",
					"analyzer": "english",
					"similarity": "custom_bm25",
					"fields": {
						"shingles": { "type": "text", "analyzer": "shingle_analyzer" }
					}
				},
				"authors": {
					"type": "nested",
					"properties": {
						"author_id": { "type": "keyword" },
						"author_name": {
							"type": "text",
							"analyzer": "standard",
							"fields": {
								"keyword": { "type": "keyword" },
								"ngram": { "type": "text", "analyzer": "ngram_analyzer" }
							}
						},
						"author_name_variants": {
							"type": "text",
							"analyzer": "standard",
							"fields": {
								"keyword": { "type": "keyword" },
								"ngram": { "type": "text", "analyzer": "ngram_analyzer" }
							}
						},
						"author_position": { "type": "integer" },
						"author_affiliation": {
							"type": "text",
							"fields": { "keyword": { "type": "keyword" } }
						},
						"author_email": { "type": "keyword" },
						"has_matched_profile": { "type": "boolean" }
					}
				},
				"author_names": {
					"type": "text",
					"analyzer": "standard",
					"fields": {
						"keyword": { "type": "keyword" },
						"ngram": { "type": "text", "analyzer": "ngram_analyzer" }
					}
				},
				"author_name_variants": {
					"type": "text",
					"analyzer": "standard",
					"fields": {
						"keyword": { "type": "keyword" },
						"ngram": { "type": "text", "analyzer": "ngram_analyzer" }
					}
				},
				"publication_year": { "type": "integer" },
				"field_associated": {
					"type": "text",
					"analyzer": "standard",
					"fields": {
						"keyword": { "type": "keyword" },
						"ngram": { "type": "text", "analyzer": "ngram_analyzer" }
					}
				},
				"document_type": { "type": "keyword" },
				"subject_area": {
					"type": "text",
					"analyzer": "standard",
					"fields": {
						"keyword": { "type": "keyword" },
						"ngram": { "type": "text", "analyzer": "ngram_analyzer" }
					}
				},
				"subject_area_count": { "type": "integer" },
				"citation_count": { "type": "integer" },
				"reference_count": { "type": "integer" },
				"embedding": {
					"type": "knn_vector",
					"dimension": EMBEDDING_DIM,
					"method": {
						"name": "hnsw",
						"space_type": "cosinesimil",
						"engine": "faiss",
						"parameters": {
							"ef_construction": 512,
							"m": 32
						}
					}
				}
			}
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mapping_declares_vector_field_with_fixed_dimension() {
		let mapping = index_mapping();
		let embedding = &mapping["mappings"]["properties"]["embedding"];

		assert_eq!(embedding["type"], "knn_vector");
		assert_eq!(embedding["dimension"], EMBEDDING_DIM);
		assert_eq!(embedding["method"]["parameters"]["ef_construction"], 512);
		assert_eq!(embedding["method"]["parameters"]["m"], 32);
	}

	#[test]
	fn mapping_declares_custom_bm25() {
		let mapping = index_mapping();
		let similarity = &mapping["settings"]["similarity"]["custom_bm25"];

		assert_eq!(similarity["k1"], 1.8);
		assert_eq!(similarity["b"], 0.6);
		assert_eq!(mapping["mappings"]["properties"]["title"]["similarity"], "custom_bm25");
	}

	#[test]
	fn mapping_keeps_authors_nested() {
		let mapping = index_mapping();
		let authors = &mapping["mappings"]["properties"]["authors"];

		assert_eq!(authors["type"], "nested");
		assert_eq!(authors["properties"]["author_position"]["type"], "integer");
	}
}
