//! End-to-end Phase 2 against live backends. Opt in with:
//! FOLIO_MONGODB_URI, FOLIO_OPENSEARCH_URL (and optionally
//! FOLIO_OPENSEARCH_USER / FOLIO_OPENSEARCH_PASSWORD).

use std::{collections::HashMap, env, sync::Arc};

use mongodb::bson::{doc, oid::ObjectId};
use tokio::sync::watch;

use folio_pipeline::run_phase2;
use folio_storage::{db::DocumentStore, engine::EngineStore, models::Paper};

fn live_env() -> Option<HashMap<&'static str, String>> {
	let mongo = env::var("FOLIO_MONGODB_URI").ok()?;
	let engine = env::var("FOLIO_OPENSEARCH_URL").ok()?;
	let mut vars = HashMap::from([
		("MONGODB_URI", mongo),
		("OPENSEARCH_HOSTS", engine),
		("OPENSEARCH_INDEX", format!("folio_test_{}", ObjectId::new().to_hex())),
	]);

	if let Ok(user) = env::var("FOLIO_OPENSEARCH_USER") {
		vars.insert("OPENSEARCH_USER", user);
	}
	if let Ok(password) = env::var("FOLIO_OPENSEARCH_PASSWORD") {
		vars.insert("OPENSEARCH_PASSWORD", password);
	}

	Some(vars)
}

fn paper(title: &str) -> Paper {
	Paper {
		id: ObjectId::new(),
		title: title.to_string(),
		abstract_text: "Acceptance fixture.".to_string(),
		authors: Vec::new(),
		publication_year: 2022,
		field_associated: "Physics".to_string(),
		document_type: "Article".to_string(),
		subject_area: vec!["PHYS".to_string()],
		citation_count: 1,
		reference_count: 1,
		open_search_id: None,
	}
}

#[tokio::test]
#[ignore = "Requires external MongoDB and OpenSearch. Set FOLIO_MONGODB_URI and FOLIO_OPENSEARCH_URL to run."]
async fn phase2_back_syncs_engine_ids_idempotently() {
	let Some(vars) = live_env() else {
		eprintln!("Skipping phase2 live test; set FOLIO_MONGODB_URI and FOLIO_OPENSEARCH_URL.");

		return;
	};
	let cfg = folio_config::Config::from_lookup(|key| vars.get(key).cloned())
		.expect("live test config");
	let papers = vec![paper("Acceptance alpha"), paper("Acceptance beta")];
	let client = mongodb::Client::with_uri_str(&cfg.mongo.uri).await.expect("mongo client");
	let collection = client
		.default_database()
		.expect("database in uri")
		.collection::<Paper>(&cfg.mongo.collection);

	collection.insert_many(papers.clone()).await.expect("seed papers");

	let store = Arc::new(DocumentStore::connect(&cfg).await.expect("document store"));
	let engine = Arc::new(EngineStore::connect(&cfg).expect("engine store"));
	let entries: Vec<_> =
		papers.iter().map(|paper| paper.to_cache_entry(vec![0.25; 768], 1)).collect();
	let (_cancel_tx, cancel_rx) = watch::channel(false);
	let report = run_phase2(
		entries.clone(),
		engine.clone(),
		store.clone(),
		cfg.indexing.engine_bulk_size,
		cancel_rx.clone(),
	)
	.await
	.expect("phase 2 runs");

	assert_eq!(report.indexed, 2);
	assert_eq!(report.errors, 0);
	assert_eq!(report.synced, 2);
	assert_eq!(report.sync_errors, 0);

	for paper in &papers {
		let stored = collection
			.find_one(doc! { "_id": paper.id })
			.await
			.expect("fetch stored paper")
			.expect("stored paper exists");

		assert!(
			stored.open_search_id.as_deref().is_some_and(|id| !id.is_empty()),
			"cross-reference id must be set after phase 2"
		);
	}

	// A second run over the same cache is idempotent on the authoritative
	// side: ids stay non-empty and the run reports no new errors.
	let report = run_phase2(entries, engine.clone(), store, cfg.indexing.engine_bulk_size, cancel_rx)
		.await
		.expect("phase 2 reruns");

	assert_eq!(report.errors, 0);

	engine.delete_index().await.expect("cleanup index");
	collection
		.delete_many(doc! { "_id": { "$in": papers.iter().map(|p| p.id).collect::<Vec<_>>() } })
		.await
		.expect("cleanup papers");
}
