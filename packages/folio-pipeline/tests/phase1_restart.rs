use std::{sync::Arc, time::Duration};

use mongodb::bson::oid::ObjectId;
use tokio::sync::{mpsc, watch};

use folio_pipeline::{Phase1Options, run_phase1};
use folio_providers::{BoxFuture, EmbeddingProvider};
use folio_storage::{cache::DocumentCache, models::Paper};

/// Embedder stub that fails any sub-batch whose text mentions the marker.
struct StubEmbedder {
	fail_marker: Option<&'static str>,
}
impl EmbeddingProvider for StubEmbedder {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, folio_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			if let Some(marker) = self.fail_marker
				&& texts.iter().any(|text| text.contains(marker))
			{
				return Err(folio_providers::Error::Unavailable {
					message: "synthetic failure".to_string(),
				});
			}

			Ok(texts.iter().map(|_| vec![0.5_f32; 8]).collect())
		})
	}
}

fn paper(hex: &str, title: &str) -> Paper {
	Paper {
		id: ObjectId::parse_str(hex).expect("object id"),
		title: title.to_string(),
		abstract_text: "An abstract.".to_string(),
		authors: Vec::new(),
		publication_year: 2020,
		field_associated: "Physics".to_string(),
		document_type: "Article".to_string(),
		subject_area: vec!["PHYS".to_string()],
		citation_count: 1,
		reference_count: 2,
		open_search_id: None,
	}
}

const ID_A: &str = "65f1a2b3c4d5e6f708192a01";
const ID_B: &str = "65f1a2b3c4d5e6f708192a02";
const ID_C: &str = "65f1a2b3c4d5e6f708192a03";

fn options() -> Phase1Options {
	Phase1Options {
		workers: 2,
		mongo_batch_size: 2,
		embed_batch_size: 2,
		autosave_interval: Duration::from_secs(30),
		total: 3,
	}
}

async fn feed(papers: Vec<Paper>) -> mpsc::Receiver<Paper> {
	let (tx, rx) = mpsc::channel(8);

	for paper in papers {
		tx.send(paper).await.expect("feed paper");
	}

	rx
}

#[tokio::test]
async fn failed_batch_is_dropped_and_restart_picks_it_up() {
	let dir = tempfile::tempdir().expect("tempdir");
	let cache = Arc::new(DocumentCache::open(dir.path()).expect("open cache"));
	let (_cancel_tx, cancel_rx) = watch::channel(false);

	// Batches of two: {A, B} then {C}. The sub-batch holding C fails, so
	// only the first batch lands in the cache.
	let docs = feed(vec![paper(ID_A, "alpha"), paper(ID_B, "beta"), paper(ID_C, "gamma")]).await;
	let embedder = Arc::new(StubEmbedder { fail_marker: Some("gamma") });
	let report = run_phase1(docs, embedder, cache.clone(), options(), cancel_rx.clone())
		.await
		.expect("phase 1 runs");

	assert_eq!(report.processed, 2);
	assert_eq!(report.errors, 1);
	assert_eq!(report.skipped, 0);
	assert_eq!(report.cached_total, 2);
	assert!(cache.is_processed(ID_A));
	assert!(cache.is_processed(ID_B));
	assert!(!cache.is_processed(ID_C));
	assert!(cache.exists(), "final save must be written");

	// Restart with identical input and a healthy embedder: cached ids are
	// skipped, only C is embedded.
	let reopened = Arc::new(DocumentCache::open(dir.path()).expect("reopen cache"));
	let docs = feed(vec![paper(ID_A, "alpha"), paper(ID_B, "beta"), paper(ID_C, "gamma")]).await;
	let embedder = Arc::new(StubEmbedder { fail_marker: None });
	let report = run_phase1(docs, embedder, reopened.clone(), options(), cancel_rx)
		.await
		.expect("phase 1 restarts");

	assert_eq!(report.skipped, 2);
	assert_eq!(report.processed, 1);
	assert_eq!(report.errors, 0);
	assert_eq!(report.cached_total, 3);
	assert!(reopened.is_processed(ID_C));
}

#[tokio::test]
async fn cache_entries_carry_embeddings_for_every_id() {
	let dir = tempfile::tempdir().expect("tempdir");
	let cache = Arc::new(DocumentCache::open(dir.path()).expect("open cache"));
	let (_cancel_tx, cancel_rx) = watch::channel(false);
	let docs = feed(vec![paper(ID_A, "alpha"), paper(ID_B, "beta")]).await;
	let embedder = Arc::new(StubEmbedder { fail_marker: None });

	run_phase1(docs, embedder, cache.clone(), options(), cancel_rx)
		.await
		.expect("phase 1 runs");

	for entry in cache.entries() {
		assert_eq!(entry.embedding.len(), 8);
		assert!(entry.embedding.iter().all(|value| value.is_finite()));
		assert!(entry.processed_at > 0);
	}
}

#[tokio::test]
async fn cancellation_still_writes_a_final_save() {
	let dir = tempfile::tempdir().expect("tempdir");
	let cache = Arc::new(DocumentCache::open(dir.path()).expect("open cache"));
	let (cancel_tx, cancel_rx) = watch::channel(false);

	cancel_tx.send(true).expect("cancel");

	let docs = feed(vec![paper(ID_A, "alpha")]).await;
	let embedder = Arc::new(StubEmbedder { fail_marker: None });
	let report = run_phase1(docs, embedder, cache.clone(), options(), cancel_rx)
		.await
		.expect("cancelled phase 1 still completes");

	assert!(cache.exists(), "cancellation must not skip the final save");
	assert_eq!(report.cached_total, cache.count());
}
