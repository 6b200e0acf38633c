use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::request::{SearchRequest, effective_search_in};
use folio_storage::kv::KvStore;

const RESULT_CACHE_NAMESPACE: &str = "search:";

/// TTL'd store of shaped response bodies. Every failure is a warning; a
/// missing Redis connection simply disables caching.
pub struct ResultCache {
	kv: Option<KvStore>,
	ttl_secs: u64,
	bypass: bool,
}
impl ResultCache {
	pub fn new(kv: Option<KvStore>, ttl_secs: u64) -> Self {
		Self { kv, ttl_secs, bypass: false }
	}

	pub fn disabled() -> Self {
		Self { kv: None, ttl_secs: 0, bypass: false }
	}

	/// Debugging escape hatch: skip reads while still writing.
	pub fn with_bypass(mut self, bypass: bool) -> Self {
		self.bypass = bypass;

		self
	}

	pub async fn get(&self, key: &str) -> Option<Value> {
		if self.bypass {
			return None;
		}

		let kv = self.kv.as_ref()?;

		match kv.get(key).await {
			Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
			Ok(None) => None,
			Err(err) => {
				tracing::warn!(error = %err, "Result cache read failed.");

				None
			},
		}
	}

	pub async fn put(&self, key: &str, value: &Value) {
		let Some(kv) = self.kv.as_ref() else {
			return;
		};

		if let Err(err) = kv.set_ex(key, &value.to_string(), self.ttl_secs).await {
			tracing::warn!(error = %err, "Result cache write failed.");
		}
	}
}

/// Deterministic key: `search:` plus the first 16 hex chars of the SHA-256
/// of the canonical request JSON. serde_json maps serialize with sorted
/// keys, so the rendering is stable by construction.
pub fn cache_key(req: &SearchRequest) -> String {
	let canonical = canonical_request(req).to_string();
	let digest = Sha256::digest(canonical.as_bytes());
	let mut hex = String::with_capacity(16);

	for byte in digest.iter().take(8) {
		hex.push_str(&format!("{byte:02x}"));
	}

	format!("{RESULT_CACHE_NAMESPACE}{hex}")
}

/// Canonical request shape: trimmed query, filters with null/empty values
/// dropped, the resolved `search_in` set (default expansion applied) in
/// sorted order.
fn canonical_request(req: &SearchRequest) -> Value {
	let mut filters = Map::new();
	let f = &req.filters;

	if let Some(year_from) = f.year_from {
		filters.insert("year_from".to_string(), json!(year_from));
	}
	if let Some(year_to) = f.year_to {
		filters.insert("year_to".to_string(), json!(year_to));
	}
	insert_string(&mut filters, "field_associated", f.field_associated.as_deref());
	insert_string(&mut filters, "document_type", f.document_type.as_deref());
	insert_list(&mut filters, "document_types", f.document_types.as_deref());
	insert_list(&mut filters, "subject_area", f.subject_area.as_deref());
	insert_string(&mut filters, "author_id", f.author_id.as_deref());
	insert_string(&mut filters, "affiliation", f.affiliation.as_deref());

	if let Some(first_author_only) = f.first_author_only {
		filters.insert("first_author_only".to_string(), json!(first_author_only));
	}
	if let Some(interdisciplinary) = f.interdisciplinary {
		filters.insert("interdisciplinary".to_string(), json!(interdisciplinary));
	}

	let mut search_in: Vec<&str> = effective_search_in(req.search_in.as_deref())
		.into_iter()
		.map(|field| field.as_str())
		.collect();

	search_in.sort_unstable();
	search_in.dedup();

	json!({
		"query": req.query.trim(),
		"filters": filters,
		"sort": req.sort.as_str(),
		"page": req.page,
		"per_page": req.per_page,
		"search_in": search_in,
	})
}

fn insert_string(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
	if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
		map.insert(key.to_string(), json!(value));
	}
}

fn insert_list(map: &mut Map<String, Value>, key: &str, value: Option<&[String]>) {
	if let Some(values) = value.filter(|values| !values.is_empty()) {
		map.insert(key.to_string(), json!(values));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::request::{SearchField, SearchFilters, SortMode};

	fn request() -> SearchRequest {
		SearchRequest {
			query: "carbon nanotubes".to_string(),
			filters: SearchFilters::default(),
			sort: SortMode::Relevance,
			page: 1,
			per_page: 10,
			search_in: None,
		}
	}

	#[test]
	fn key_is_namespaced_and_short() {
		let key = cache_key(&request());

		assert!(key.starts_with("search:"));
		assert_eq!(key.len(), "search:".len() + 16);
	}

	#[test]
	fn empty_filter_values_do_not_change_the_key() {
		let bare = cache_key(&request());
		let mut with_empties = request();

		with_empties.filters.field_associated = Some(String::new());
		with_empties.filters.author_id = Some("  ".to_string());
		with_empties.filters.document_types = Some(Vec::new());

		assert_eq!(bare, cache_key(&with_empties));
	}

	#[test]
	fn default_and_explicit_search_in_agree() {
		let implicit = cache_key(&request());
		let mut explicit = request();

		explicit.search_in = Some(SearchField::DEFAULT_SET.to_vec());

		assert_eq!(implicit, cache_key(&explicit));

		let mut reordered = request();

		reordered.search_in = Some(vec![
			SearchField::Field,
			SearchField::Author,
			SearchField::Title,
			SearchField::SubjectArea,
			SearchField::Abstract,
		]);

		assert_eq!(implicit, cache_key(&reordered));
	}

	#[test]
	fn meaningful_changes_change_the_key() {
		let base = cache_key(&request());
		let mut paged = request();

		paged.page = 2;

		assert_ne!(base, cache_key(&paged));

		let mut sorted = request();

		sorted.sort = SortMode::Impact;

		assert_ne!(base, cache_key(&sorted));

		let mut filtered = request();

		filtered.filters.author_id = Some("AID42".to_string());

		assert_ne!(base, cache_key(&filtered));

		let mut narrowed = request();

		narrowed.search_in = Some(vec![SearchField::Title]);

		assert_ne!(base, cache_key(&narrowed));
	}

	#[test]
	fn query_whitespace_is_normalized() {
		let base = cache_key(&request());
		let mut padded = request();

		padded.query = "  carbon nanotubes  ".to_string();

		assert_eq!(base, cache_key(&padded));
	}
}
