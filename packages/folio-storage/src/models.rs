use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use folio_domain::{CacheEntry, CachedAuthor};

/// Authoritative paper record. Created and updated externally; this system
/// only reads it and maintains `open_search_id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Paper {
	#[serde(rename = "_id")]
	pub id: ObjectId,
	#[serde(default)]
	pub title: String,
	#[serde(default, rename = "abstract")]
	pub abstract_text: String,
	#[serde(default)]
	pub authors: Vec<PaperAuthor>,
	#[serde(default)]
	pub publication_year: i32,
	#[serde(default)]
	pub field_associated: String,
	#[serde(default)]
	pub document_type: String,
	#[serde(default)]
	pub subject_area: Vec<String>,
	#[serde(default)]
	pub citation_count: i64,
	#[serde(default)]
	pub reference_count: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub open_search_id: Option<String>,
}
impl Paper {
	pub fn to_cache_entry(&self, embedding: Vec<f32>, processed_at: i64) -> CacheEntry {
		CacheEntry {
			mongo_id: self.id.to_hex(),
			title: self.title.clone(),
			abstract_text: self.abstract_text.clone(),
			authors: self
				.authors
				.iter()
				.map(|author| CachedAuthor {
					author_id: author.author_id.clone(),
					author_name: author.author_name.clone(),
					author_position: author.author_position.clone(),
					author_email: author.author_email.clone(),
					author_available_names: author.author_available_names.clone(),
					author_affiliation: author.author_affiliation.clone(),
					matched_profile_id: author.matched_profile_id.clone(),
				})
				.collect(),
			publication_year: self.publication_year,
			field_associated: self.field_associated.clone(),
			document_type: self.document_type.clone(),
			subject_area: self.subject_area.clone(),
			citation_count: self.citation_count,
			reference_count: self.reference_count,
			embedding,
			processed_at,
		}
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaperAuthor {
	#[serde(default)]
	pub author_id: String,
	#[serde(default)]
	pub author_name: String,
	#[serde(default)]
	pub author_position: String,
	#[serde(default)]
	pub author_email: String,
	#[serde(default)]
	pub author_available_names: Vec<String>,
	#[serde(default)]
	pub author_affiliation: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub matched_profile_id: Option<String>,
}

/// Institutional person record used for the related-people enrichment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Person {
	#[serde(rename = "_id")]
	pub id: ObjectId,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub email: String,
	#[serde(default)]
	pub department: String,
}

/// A resolved authoritative-id → engine-id pair awaiting back-sync.
#[derive(Clone, Debug)]
pub struct IdUpdate {
	pub mongo_id: ObjectId,
	pub engine_id: String,
}
