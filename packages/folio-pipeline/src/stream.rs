use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::{
	sync::{Mutex, mpsc, watch},
	time::Instant,
};

use crate::{Error, Result, phase1, phase2, stats::PipelineStats};
use folio_providers::EmbeddingProvider;
use folio_storage::{
	db::DocumentStore,
	engine::EngineStore,
	models::{IdUpdate, Paper},
};

const PROGRESS_TICK: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct RunOptions {
	pub workers: usize,
	pub mongo_batch_size: usize,
	pub embed_batch_size: usize,
	pub engine_bulk_size: usize,
	pub total: u64,
}
impl RunOptions {
	pub fn from_config(cfg: &folio_config::Config, total: u64) -> Self {
		Self {
			workers: cfg.indexing.num_workers,
			mongo_batch_size: cfg.indexing.mongo_batch_size,
			embed_batch_size: cfg.indexing.embed_batch_size,
			engine_bulk_size: cfg.indexing.engine_bulk_size,
			total,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
	pub processed: u64,
	pub indexed: u64,
	pub errors: u64,
	pub synced: u64,
	pub sync_errors: u64,
	pub elapsed_secs: f64,
}

struct EmbeddedBatch {
	docs: Vec<Paper>,
	embeddings: Vec<Vec<f32>>,
}

/// Single-shot streaming mode: fetch, embed, index, and back-sync run
/// concurrently over bounded channels; the on-disk cache is bypassed.
pub async fn run_streaming(
	docs: mpsc::Receiver<Paper>,
	embedder: Arc<dyn EmbeddingProvider>,
	engine: Arc<EngineStore>,
	store: Arc<DocumentStore>,
	opts: RunOptions,
	cancel: watch::Receiver<bool>,
) -> Result<RunReport> {
	let started = Instant::now();

	engine.create_index().await?;

	let stats = Arc::new(PipelineStats::default());
	let workers = opts.workers.max(phase1::MIN_WORKERS);
	let ticker = crate::stats::spawn_progress_ticker(stats.clone(), opts.total, PROGRESS_TICK);

	let (batch_tx, batch_rx) = mpsc::channel::<Vec<Paper>>(workers * 2);
	let (embedded_tx, embedded_rx) = mpsc::channel::<EmbeddedBatch>(workers * 2);
	let (sync_tx, sync_rx) = mpsc::channel::<Vec<IdUpdate>>(workers * 4);

	let batcher = tokio::spawn(run_batcher(
		docs,
		batch_tx,
		opts.mongo_batch_size,
		cancel.clone(),
	));

	let shared_batches = Arc::new(Mutex::new(batch_rx));
	let mut embed_handles = Vec::with_capacity(workers);

	for _ in 0..workers {
		embed_handles.push(tokio::spawn(embed_worker(
			shared_batches.clone(),
			embedded_tx.clone(),
			embedder.clone(),
			stats.clone(),
			opts.embed_batch_size,
			cancel.clone(),
		)));
	}

	drop(embedded_tx);

	let shared_embedded = Arc::new(Mutex::new(embedded_rx));
	let mut index_handles = Vec::with_capacity(workers);

	for _ in 0..workers {
		index_handles.push(tokio::spawn(index_worker(
			shared_embedded.clone(),
			sync_tx.clone(),
			engine.clone(),
			stats.clone(),
			opts.engine_bulk_size,
			cancel.clone(),
		)));
	}

	drop(sync_tx);

	let sync_worker = tokio::spawn(sync_worker(sync_rx, store, stats.clone()));
	let mut indexed = 0_u64;

	for handle in index_handles {
		indexed += handle
			.await
			.map_err(|err| Error::Pipeline(format!("index worker panicked: {err}")))?;
	}
	for handle in embed_handles {
		handle
			.await
			.map_err(|err| Error::Pipeline(format!("embed worker panicked: {err}")))?;
	}

	let _ = batcher.await;
	let (synced, sync_errors) = sync_worker
		.await
		.map_err(|err| Error::Pipeline(format!("sync worker panicked: {err}")))?;

	ticker.abort();

	Ok(RunReport {
		processed: stats.processed(),
		indexed,
		errors: stats.errors(),
		synced,
		sync_errors,
		elapsed_secs: started.elapsed().as_secs_f64(),
	})
}

async fn run_batcher(
	mut docs: mpsc::Receiver<Paper>,
	batch_tx: mpsc::Sender<Vec<Paper>>,
	batch_size: usize,
	mut cancel: watch::Receiver<bool>,
) {
	let mut batch = Vec::with_capacity(batch_size);

	loop {
		if *cancel.borrow() {
			return;
		}

		let doc = tokio::select! {
			_ = cancel.changed() => return,
			doc = docs.recv() => doc,
		};
		let Some(doc) = doc else {
			break;
		};

		batch.push(doc);

		if batch.len() >= batch_size {
			let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));

			tokio::select! {
				_ = cancel.changed() => return,
				sent = batch_tx.send(full) => {
					if sent.is_err() {
						return;
					}
				},
			}
		}
	}

	if !batch.is_empty() {
		tokio::select! {
			_ = cancel.changed() => {},
			_ = batch_tx.send(batch) => {},
		}
	}
}

async fn embed_worker(
	shared_rx: Arc<Mutex<mpsc::Receiver<Vec<Paper>>>>,
	embedded_tx: mpsc::Sender<EmbeddedBatch>,
	embedder: Arc<dyn EmbeddingProvider>,
	stats: Arc<PipelineStats>,
	embed_batch_size: usize,
	mut cancel: watch::Receiver<bool>,
) {
	loop {
		if *cancel.borrow() {
			return;
		}

		let batch = {
			let mut rx = shared_rx.lock().await;

			tokio::select! {
				_ = cancel.changed() => None,
				batch = rx.recv() => batch,
			}
		};
		let Some(batch) = batch else {
			return;
		};

		PipelineStats::enter(&stats.docs_in_embed, batch.len());

		let embeddings = phase1::embed_batch(&*embedder, &batch, embed_batch_size).await;

		PipelineStats::leave(&stats.docs_in_embed, batch.len());

		let Some(embeddings) = embeddings else {
			stats.add_errors(batch.len());

			continue;
		};

		tokio::select! {
			_ = cancel.changed() => return,
			sent = embedded_tx.send(EmbeddedBatch { docs: batch, embeddings }) => {
				if sent.is_err() {
					return;
				}
			},
		}
	}
}

async fn index_worker(
	shared_rx: Arc<Mutex<mpsc::Receiver<EmbeddedBatch>>>,
	sync_tx: mpsc::Sender<Vec<IdUpdate>>,
	engine: Arc<EngineStore>,
	stats: Arc<PipelineStats>,
	engine_bulk_size: usize,
	mut cancel: watch::Receiver<bool>,
) -> u64 {
	let mut indexed = 0_u64;

	loop {
		if *cancel.borrow() {
			return indexed;
		}

		let batch = {
			let mut rx = shared_rx.lock().await;

			tokio::select! {
				_ = cancel.changed() => None,
				batch = rx.recv() => batch,
			}
		};
		let Some(batch) = batch else {
			return indexed;
		};
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let entries: Vec<_> = batch
			.docs
			.iter()
			.zip(batch.embeddings)
			.map(|(paper, embedding)| paper.to_cache_entry(embedding, now))
			.collect();

		PipelineStats::enter(&stats.docs_in_index, entries.len());

		for slice in entries.chunks(engine_bulk_size.max(1)) {
			let docs: Vec<_> = slice.iter().map(folio_domain::EngineDocument::from_entry).collect();

			match engine.bulk_index(&docs).await {
				Ok(id_map) => {
					indexed += id_map.len() as u64;
					stats.add_processed(id_map.len());
					stats.add_errors(slice.len() - id_map.len());

					let updates = phase2::collect_updates(slice, &id_map);

					if !updates.is_empty() {
						PipelineStats::enter(&stats.docs_in_sync, updates.len());

						tokio::select! {
							_ = cancel.changed() => return indexed,
							sent = sync_tx.send(updates) => {
								if sent.is_err() {
									return indexed;
								}
							},
						}
					}
				},
				Err(err) => {
					tracing::warn!(error = %err, slice = slice.len(), "Bulk index failed. Skipping slice.");
					stats.add_errors(slice.len());
				},
			}
		}

		PipelineStats::leave(&stats.docs_in_index, entries.len());
	}
}

async fn sync_worker(
	mut updates_rx: mpsc::Receiver<Vec<IdUpdate>>,
	store: Arc<DocumentStore>,
	stats: Arc<PipelineStats>,
) -> (u64, u64) {
	let mut synced = 0_u64;
	let mut sync_errors = 0_u64;

	while let Some(updates) = updates_rx.recv().await {
		let count = updates.len();

		match store.set_engine_ids(&updates).await {
			Ok(()) => synced += count as u64,
			Err(err) => {
				tracing::warn!(error = %err, count, "Id back-sync failed.");
				sync_errors += count as u64;
			},
		}

		PipelineStats::leave(&stats.docs_in_sync, count);
	}

	(synced, sync_errors)
}
