use serde::{Deserialize, Serialize};

use crate::paper::CacheEntry;

/// Per-author record under the engine's nested `authors` path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineAuthor {
	pub author_id: String,
	pub author_name: String,
	pub author_name_variants: Vec<String>,
	pub author_position: i32,
	pub author_affiliation: String,
	pub author_email: String,
	pub has_matched_profile: bool,
}

/// Projection of a paper into the search engine. The authoritative id is
/// kept as a keyword field; the engine generates its own document id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineDocument {
	pub mongo_id: String,
	pub title: String,
	#[serde(rename = "abstract")]
	pub abstract_text: String,
	pub authors: Vec<EngineAuthor>,
	pub author_names: Vec<String>,
	pub author_name_variants: Vec<String>,
	pub publication_year: i32,
	pub field_associated: String,
	pub document_type: String,
	pub subject_area: Vec<String>,
	pub subject_area_count: usize,
	pub citation_count: i64,
	pub reference_count: i64,
	pub embedding: Vec<f32>,
}

impl EngineDocument {
	pub fn from_entry(entry: &CacheEntry) -> Self {
		let authors: Vec<EngineAuthor> = entry
			.authors
			.iter()
			.map(|author| EngineAuthor {
				author_id: author.author_id.clone(),
				author_name: author.author_name.clone(),
				author_name_variants: author.author_available_names.clone(),
				author_position: author.author_position.trim().parse().unwrap_or(0),
				author_affiliation: author.author_affiliation.clone(),
				author_email: author.author_email.clone(),
				has_matched_profile: author
					.matched_profile_id
					.as_deref()
					.is_some_and(|id| !id.trim().is_empty()),
			})
			.collect();
		let author_names = authors.iter().map(|author| author.author_name.clone()).collect();
		// Duplicates are preserved; the ngram analyzer deduplicates at
		// token level.
		let author_name_variants =
			authors.iter().flat_map(|author| author.author_name_variants.clone()).collect();

		Self {
			mongo_id: entry.mongo_id.clone(),
			title: entry.title.clone(),
			abstract_text: entry.abstract_text.clone(),
			authors,
			author_names,
			author_name_variants,
			publication_year: entry.publication_year,
			field_associated: entry.field_associated.clone(),
			document_type: entry.document_type.clone(),
			subject_area: entry.subject_area.clone(),
			subject_area_count: entry.subject_area.len(),
			citation_count: entry.citation_count,
			reference_count: entry.reference_count,
			embedding: entry.embedding.clone(),
		}
	}
}
