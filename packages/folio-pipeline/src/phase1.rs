use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::{
	sync::{Mutex, mpsc, watch},
	time::Instant,
};

use crate::{Error, Result, stats::PipelineStats};
use folio_domain::embedding_text;
use folio_providers::EmbeddingProvider;
use folio_storage::{cache::DocumentCache, models::Paper};

pub const MIN_WORKERS: usize = 2;
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);
const PROGRESS_TICK: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct Phase1Options {
	pub workers: usize,
	pub mongo_batch_size: usize,
	pub embed_batch_size: usize,
	pub autosave_interval: Duration,
	pub total: u64,
}
impl Phase1Options {
	pub fn from_config(cfg: &folio_config::Config, total: u64) -> Self {
		Self {
			workers: cfg.indexing.num_workers,
			mongo_batch_size: cfg.indexing.mongo_batch_size,
			embed_batch_size: cfg.indexing.embed_batch_size,
			autosave_interval: AUTOSAVE_INTERVAL,
			total,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Phase1Report {
	pub processed: u64,
	pub skipped: u64,
	pub errors: u64,
	pub cached_total: usize,
}

/// Fetch-and-embed stage. Streamed documents are batched, already-cached
/// ids are dropped, and embed workers fill the cache. The cache is saved at
/// least once if this function runs at all, cancellation included.
pub async fn run_phase1(
	docs: mpsc::Receiver<Paper>,
	embedder: Arc<dyn EmbeddingProvider>,
	cache: Arc<DocumentCache>,
	opts: Phase1Options,
	cancel: watch::Receiver<bool>,
) -> Result<Phase1Report> {
	let stats = Arc::new(PipelineStats::default());
	let workers = opts.workers.max(MIN_WORKERS);
	let (batch_tx, batch_rx) = mpsc::channel::<Vec<Paper>>(workers * 2);
	let batcher = tokio::spawn(run_batcher(
		docs,
		batch_tx,
		cache.clone(),
		stats.clone(),
		opts.mongo_batch_size,
		cancel.clone(),
	));
	let shared_rx = Arc::new(Mutex::new(batch_rx));
	let last_save = Arc::new(Mutex::new(Instant::now()));
	let ticker = crate::stats::spawn_progress_ticker(stats.clone(), opts.total, PROGRESS_TICK);
	let mut handles = Vec::with_capacity(workers);

	for _ in 0..workers {
		handles.push(tokio::spawn(embed_worker(
			shared_rx.clone(),
			embedder.clone(),
			cache.clone(),
			stats.clone(),
			last_save.clone(),
			opts.clone(),
			cancel.clone(),
		)));
	}

	let mut first_error = None;

	for handle in handles {
		match handle.await {
			Ok(Ok(())) => {},
			Ok(Err(err)) =>
				if first_error.is_none() {
					first_error = Some(err);
				},
			Err(err) =>
				if first_error.is_none() {
					first_error = Some(Error::Pipeline(format!("embed worker panicked: {err}")));
				},
		}
	}

	let _ = batcher.await;

	ticker.abort();

	// The final save is unconditional and runs to completion even when the
	// pipeline was cancelled mid-flight.
	cache.save()?;

	if let Some(err) = first_error {
		return Err(err);
	}

	Ok(Phase1Report {
		processed: stats.processed(),
		skipped: stats.skipped(),
		errors: stats.errors(),
		cached_total: cache.count(),
	})
}

/// Collects streamed documents into outer batches, dropping ids the cache
/// already holds.
async fn run_batcher(
	mut docs: mpsc::Receiver<Paper>,
	batch_tx: mpsc::Sender<Vec<Paper>>,
	cache: Arc<DocumentCache>,
	stats: Arc<PipelineStats>,
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

		if cache.is_processed(&doc.id.to_hex()) {
			stats.add_skipped(1);

			continue;
		}

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

/// One embed worker: each outer batch is split into embed-sized sub-batches,
/// one remote call each. Any sub-batch failure drops the whole outer batch;
/// partial embeddings are discarded.
async fn embed_worker(
	shared_rx: Arc<Mutex<mpsc::Receiver<Vec<Paper>>>>,
	embedder: Arc<dyn EmbeddingProvider>,
	cache: Arc<DocumentCache>,
	stats: Arc<PipelineStats>,
	last_save: Arc<Mutex<Instant>>,
	opts: Phase1Options,
	mut cancel: watch::Receiver<bool>,
) -> Result<()> {
	loop {
		if *cancel.borrow() {
			return Ok(());
		}

		let batch = {
			let mut rx = shared_rx.lock().await;

			tokio::select! {
				_ = cancel.changed() => None,
				batch = rx.recv() => batch,
			}
		};
		let Some(batch) = batch else {
			return Ok(());
		};

		PipelineStats::enter(&stats.docs_in_embed, batch.len());

		let embeddings = embed_batch(&*embedder, &batch, opts.embed_batch_size).await;

		PipelineStats::leave(&stats.docs_in_embed, batch.len());

		let Some(embeddings) = embeddings else {
			stats.add_errors(batch.len());

			continue;
		};
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let entries = batch
			.iter()
			.zip(embeddings)
			.map(|(paper, embedding)| paper.to_cache_entry(embedding, now))
			.collect();

		cache.add_entries(entries);
		stats.add_processed(batch.len());
		autosave(&cache, &last_save, opts.autosave_interval).await?;
	}
}

pub(crate) async fn embed_batch(
	embedder: &dyn EmbeddingProvider,
	batch: &[Paper],
	embed_batch_size: usize,
) -> Option<Vec<Vec<f32>>> {
	let texts: Vec<String> = batch
		.iter()
		.map(|paper| embedding_text(&paper.title, &paper.abstract_text))
		.collect();
	let mut embeddings = Vec::with_capacity(texts.len());

	for chunk in texts.chunks(embed_batch_size) {
		match embedder.embed(chunk).await {
			Ok(vectors) => embeddings.extend(vectors),
			Err(err) => {
				tracing::warn!(error = %err, batch = batch.len(), "Embedding failed. Dropping batch.");

				return None;
			},
		}
	}

	Some(embeddings)
}

/// Persists the cache when the autosave interval elapsed. Save errors are
/// fatal to Phase 1.
async fn autosave(
	cache: &DocumentCache,
	last_save: &Mutex<Instant>,
	interval: Duration,
) -> Result<()> {
	let mut last = last_save.lock().await;

	if last.elapsed() < interval {
		return Ok(());
	}

	cache.save()?;

	*last = Instant::now();

	Ok(())
}
