use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use tokio::sync::{mpsc, watch};

use crate::Result;
use folio_domain::{CacheEntry, EngineDocument};
use folio_storage::{
	db::DocumentStore,
	engine::EngineStore,
	models::IdUpdate,
};

const SYNC_QUEUE_DEPTH: usize = 8;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Phase2Report {
	pub indexed: u64,
	pub errors: u64,
	pub synced: u64,
	pub sync_errors: u64,
}

/// Index-and-update stage: cache entries go to the engine in bulk slices,
/// and the ids the engine hands back are synced onto the authoritative
/// records by a single throttled worker.
pub async fn run_phase2(
	entries: Vec<CacheEntry>,
	engine: Arc<EngineStore>,
	store: Arc<DocumentStore>,
	bulk_size: usize,
	cancel: watch::Receiver<bool>,
) -> Result<Phase2Report> {
	engine.create_index().await?;

	let (sync_tx, sync_rx) = mpsc::channel::<Vec<IdUpdate>>(SYNC_QUEUE_DEPTH);
	// One sync worker only: the authoritative store sits on a constrained
	// connection budget.
	let sync_worker = tokio::spawn(run_sync_worker(sync_rx, store));
	let mut indexed = 0_u64;
	let mut errors = 0_u64;

	for slice in entries.chunks(bulk_size.max(1)) {
		if *cancel.borrow() {
			break;
		}

		let docs: Vec<EngineDocument> = slice.iter().map(EngineDocument::from_entry).collect();
		let id_map = match engine.bulk_index(&docs).await {
			Ok(id_map) => id_map,
			Err(err) => {
				tracing::warn!(error = %err, slice = slice.len(), "Bulk index failed. Skipping slice.");
				errors += slice.len() as u64;

				continue;
			},
		};

		indexed += id_map.len() as u64;
		errors += (slice.len() - id_map.len()) as u64;

		let updates = collect_updates(slice, &id_map);

		if !updates.is_empty() && sync_tx.send(updates).await.is_err() {
			break;
		}
	}

	drop(sync_tx);

	let (synced, sync_errors) = sync_worker
		.await
		.map_err(|err| crate::Error::Pipeline(format!("sync worker panicked: {err}")))?;

	Ok(Phase2Report { indexed, errors, synced, sync_errors })
}

/// Back-sync failures are counted and logged; the engine write is never
/// unwound. Unmarked records are picked up by the next Phase 2 run.
async fn run_sync_worker(
	mut updates_rx: mpsc::Receiver<Vec<IdUpdate>>,
	store: Arc<DocumentStore>,
) -> (u64, u64) {
	let mut synced = 0_u64;
	let mut sync_errors = 0_u64;

	while let Some(updates) = updates_rx.recv().await {
		match store.set_engine_ids(&updates).await {
			Ok(()) => synced += updates.len() as u64,
			Err(err) => {
				tracing::warn!(error = %err, count = updates.len(), "Id back-sync failed.");
				sync_errors += updates.len() as u64;
			},
		}
	}

	(synced, sync_errors)
}

pub(crate) fn collect_updates(
	slice: &[CacheEntry],
	id_map: &std::collections::HashMap<String, String>,
) -> Vec<IdUpdate> {
	slice
		.iter()
		.filter_map(|entry| {
			let engine_id = id_map.get(&entry.mongo_id)?;
			let mongo_id = match ObjectId::parse_str(&entry.mongo_id) {
				Ok(oid) => oid,
				Err(err) => {
					tracing::warn!(error = %err, id = %entry.mongo_id, "Unparseable cache id.");

					return None;
				},
			};

			Some(IdUpdate { mongo_id, engine_id: engine_id.clone() })
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn entry(id: &str) -> CacheEntry {
		CacheEntry {
			mongo_id: id.to_string(),
			title: "t".to_string(),
			abstract_text: String::new(),
			authors: Vec::new(),
			publication_year: 2020,
			field_associated: String::new(),
			document_type: String::new(),
			subject_area: Vec::new(),
			citation_count: 0,
			reference_count: 0,
			embedding: vec![0.0; 4],
			processed_at: 0,
		}
	}

	#[test]
	fn collect_updates_pairs_engine_ids_with_object_ids() {
		let a = "65f1a2b3c4d5e6f708192a01";
		let b = "65f1a2b3c4d5e6f708192a02";
		let slice = vec![entry(a), entry(b), entry("65f1a2b3c4d5e6f708192a03")];
		let id_map = HashMap::from([
			(a.to_string(), "e1".to_string()),
			(b.to_string(), "e2".to_string()),
		]);
		let updates = collect_updates(&slice, &id_map);

		assert_eq!(updates.len(), 2);
		assert_eq!(updates[0].mongo_id.to_hex(), a);
		assert_eq!(updates[0].engine_id, "e1");
		assert_eq!(updates[1].engine_id, "e2");
	}

	#[test]
	fn collect_updates_skips_unparseable_ids() {
		let slice = vec![entry("not-an-object-id")];
		let id_map = HashMap::from([("not-an-object-id".to_string(), "e1".to_string())]);

		assert!(collect_updates(&slice, &id_map).is_empty());
	}
}
