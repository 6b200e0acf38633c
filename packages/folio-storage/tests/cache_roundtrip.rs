use std::fs;

use folio_domain::{CacheEntry, CachedAuthor};
use folio_storage::cache::DocumentCache;

fn entry(id: &str) -> CacheEntry {
	CacheEntry {
		mongo_id: id.to_string(),
		title: format!("Paper {id}"),
		abstract_text: "An abstract.".to_string(),
		authors: vec![CachedAuthor {
			author_id: "AID1".to_string(),
			author_name: "A. Researcher".to_string(),
			author_position: "1".to_string(),
			author_email: "a@uni.edu".to_string(),
			author_available_names: vec!["Researcher A.".to_string()],
			author_affiliation: "Example University".to_string(),
			matched_profile_id: None,
		}],
		publication_year: 2020,
		field_associated: "Physics".to_string(),
		document_type: "Article".to_string(),
		subject_area: vec!["PHYS".to_string()],
		citation_count: 3,
		reference_count: 12,
		embedding: vec![0.5; 8],
		processed_at: 1_700_000_000,
	}
}

#[test]
fn save_and_reload_preserves_entries_and_processed_set() {
	let dir = tempfile::tempdir().expect("tempdir");
	let cache = DocumentCache::open(dir.path()).expect("open cache");

	cache.set_metadata(2, false);
	cache.add_entries(vec![entry("a1"), entry("b2")]);

	assert!(cache.is_processed("a1"));
	assert!(cache.is_processed("b2"));
	assert!(!cache.is_processed("c3"));

	cache.save().expect("save cache");

	let reloaded = DocumentCache::open(dir.path()).expect("reopen cache");

	assert_eq!(reloaded.count(), 2);
	assert!(reloaded.is_processed("a1"));
	assert!(reloaded.is_processed("b2"));
	assert_eq!(reloaded.entries()[0], entry("a1"));

	let metadata = reloaded.metadata();

	assert_eq!(metadata.total_docs, 2);
	assert!(!metadata.reindex_all);
	assert!(metadata.last_modified > 0);
}

#[test]
fn truncated_blob_is_treated_as_absent() {
	let dir = tempfile::tempdir().expect("tempdir");
	let cache = DocumentCache::open(dir.path()).expect("open cache");

	cache.add_entries(vec![entry("a1")]);
	cache.save().expect("save cache");

	let entries_path = dir.path().join("embeddings.bin");
	let bytes = fs::read(&entries_path).expect("read blob");

	fs::write(&entries_path, &bytes[..bytes.len() / 2]).expect("truncate blob");

	let reloaded = DocumentCache::open(dir.path()).expect("reopen cache");

	assert_eq!(reloaded.count(), 0);
	assert!(!reloaded.is_processed("a1"));
}

#[test]
fn foreign_file_is_treated_as_absent() {
	let dir = tempfile::tempdir().expect("tempdir");

	fs::write(dir.path().join("metadata.bin"), b"not a cache file").expect("write junk");

	let cache = DocumentCache::open(dir.path()).expect("open cache");

	assert_eq!(cache.count(), 0);
}

#[test]
fn clear_removes_files_and_state() {
	let dir = tempfile::tempdir().expect("tempdir");
	let cache = DocumentCache::open(dir.path()).expect("open cache");

	cache.add_entries(vec![entry("a1")]);
	cache.save().expect("save cache");

	assert!(cache.exists());

	cache.clear().expect("clear cache");

	assert!(!cache.exists());
	assert_eq!(cache.count(), 0);
	assert!(!cache.is_processed("a1"));

	let (count, size) = cache.stats();

	assert_eq!(count, 0);
	assert_eq!(size, 0);
}

#[test]
fn entries_returns_a_defensive_copy() {
	let dir = tempfile::tempdir().expect("tempdir");
	let cache = DocumentCache::open(dir.path()).expect("open cache");

	cache.add_entries(vec![entry("a1")]);

	let mut copy = cache.entries();

	copy.clear();

	assert_eq!(cache.count(), 1);
}
