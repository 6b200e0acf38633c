use folio_domain::{CacheEntry, CachedAuthor, EngineDocument, embedding_text};

fn entry() -> CacheEntry {
	CacheEntry {
		mongo_id: "65f1a2b3c4d5e6f708192a3b".to_string(),
		title: "Carbon nanotube field emission".to_string(),
		abstract_text: "We study field emission from carbon nanotubes.".to_string(),
		authors: vec![
			CachedAuthor {
				author_id: "AID1".to_string(),
				author_name: "A. Researcher".to_string(),
				author_position: "1".to_string(),
				author_email: "a.researcher@uni.edu".to_string(),
				author_available_names: vec![
					"Researcher A.".to_string(),
					"A Researcher".to_string(),
				],
				author_affiliation: "Example University".to_string(),
				matched_profile_id: Some("profile-9".to_string()),
			},
			CachedAuthor {
				author_id: "AID2".to_string(),
				author_name: "B. Author".to_string(),
				author_position: "second".to_string(),
				author_email: String::new(),
				author_available_names: vec!["Researcher A.".to_string()],
				author_affiliation: String::new(),
				matched_profile_id: Some("  ".to_string()),
			},
		],
		publication_year: 2021,
		field_associated: "Physics".to_string(),
		document_type: "Article".to_string(),
		subject_area: vec!["PHYS".to_string(), "MATE".to_string(), "ENGI".to_string()],
		citation_count: 42,
		reference_count: 31,
		embedding: vec![0.25; 768],
		processed_at: 1_700_000_000,
	}
}

#[test]
fn mapper_preserves_author_order_and_names() {
	let doc = EngineDocument::from_entry(&entry());

	assert_eq!(doc.author_names, vec!["A. Researcher".to_string(), "B. Author".to_string()]);
	assert_eq!(doc.authors[0].author_position, 1);
	assert_eq!(doc.authors[0].author_id, "AID1");
	assert_eq!(doc.authors[1].author_id, "AID2");
}

#[test]
fn mapper_zeroes_unparseable_positions() {
	let doc = EngineDocument::from_entry(&entry());

	assert_eq!(doc.authors[1].author_position, 0);
}

#[test]
fn mapper_unions_name_variants_with_duplicates() {
	let doc = EngineDocument::from_entry(&entry());

	assert_eq!(
		doc.author_name_variants,
		vec![
			"Researcher A.".to_string(),
			"A Researcher".to_string(),
			"Researcher A.".to_string(),
		]
	);
}

#[test]
fn mapper_counts_subject_areas() {
	let doc = EngineDocument::from_entry(&entry());

	assert_eq!(doc.subject_area_count, doc.subject_area.len());
	assert_eq!(doc.subject_area_count, 3);
}

#[test]
fn mapper_requires_non_blank_matched_profile() {
	let doc = EngineDocument::from_entry(&entry());

	assert!(doc.authors[0].has_matched_profile);
	assert!(!doc.authors[1].has_matched_profile);
}

#[test]
fn mapper_keeps_authoritative_id_and_embedding() {
	let source = entry();
	let doc = EngineDocument::from_entry(&source);

	assert_eq!(doc.mongo_id, source.mongo_id);
	assert_eq!(doc.embedding.len(), folio_domain::EMBEDDING_DIM);
}

#[test]
fn engine_document_serializes_abstract_under_wire_name() {
	let doc = EngineDocument::from_entry(&entry());
	let value = serde_json::to_value(&doc).expect("engine document serializes");

	assert!(value.get("abstract").is_some());
	assert!(value.get("abstract_text").is_none());
}

#[test]
fn embedding_text_joins_title_and_abstract() {
	assert_eq!(embedding_text("Title", "Abstract."), "Title [SEP] Abstract.");
	assert_eq!(embedding_text("  Title  ", ""), "Title");
	assert_eq!(embedding_text("", "Abstract."), "Abstract.");
	assert_eq!(embedding_text("", ""), "");
}
