use serde::{Deserialize, Serialize};

/// Checkpointed projection of an authoritative paper together with its
/// computed embedding. An entry exists iff embedding generation succeeded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
	pub mongo_id: String,
	pub title: String,
	pub abstract_text: String,
	pub authors: Vec<CachedAuthor>,
	pub publication_year: i32,
	pub field_associated: String,
	pub document_type: String,
	pub subject_area: Vec<String>,
	pub citation_count: i64,
	pub reference_count: i64,
	pub embedding: Vec<f32>,
	/// Unix seconds at which the embedding was computed.
	pub processed_at: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedAuthor {
	pub author_id: String,
	pub author_name: String,
	/// Ordering within the paper, 1-based, stringly typed in the source
	/// store. Parsed to an integer at engine-mapping time.
	pub author_position: String,
	pub author_email: String,
	pub author_available_names: Vec<String>,
	pub author_affiliation: String,
	pub matched_profile_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
	pub version: u32,
	pub created_at: i64,
	pub last_modified: i64,
	pub total_docs: u64,
	pub reindex_all: bool,
}
