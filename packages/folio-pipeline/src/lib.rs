pub mod phase1;
pub mod phase2;
pub mod stats;
pub mod stream;

pub use phase1::{Phase1Options, Phase1Report, run_phase1};
pub use phase2::{Phase2Report, run_phase2};
pub use stream::{RunOptions, RunReport, run_streaming};

use std::sync::Arc;

use tokio::sync::watch;

use folio_config::Config;
use folio_providers::{EmbeddingClient, EmbeddingProvider};
use folio_storage::{cache::DocumentCache, db::DocumentStore, engine::EngineStore, kv::KvStore};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] folio_storage::Error),
	#[error(transparent)]
	Embedding(#[from] folio_providers::Error),
	#[error("Pipeline failure: {0}")]
	Pipeline(String),
}

/// Batch indexer wiring: authoritative store, engine, embedding client, and
/// the on-disk checkpoint cache.
pub struct Indexer {
	pub cfg: Config,
	pub store: Arc<DocumentStore>,
	pub engine: Arc<EngineStore>,
	pub embedder: Arc<dyn EmbeddingProvider>,
	pub cache: Arc<DocumentCache>,
}
impl Indexer {
	pub async fn connect(cfg: Config) -> Result<Self> {
		let store = DocumentStore::connect(&cfg).await?;

		store.ping().await?;
		tracing::info!("Connected to document store.");

		let engine = EngineStore::connect(&cfg)?;
		let kv = match KvStore::connect(&cfg.redis.url).await {
			Ok(kv) => Some(kv),
			Err(err) => {
				tracing::warn!(error = %err, "Redis unavailable. Query-embedding cache disabled.");

				None
			},
		};
		let embedder = EmbeddingClient::new(&cfg, kv)?;
		let cache = DocumentCache::open(&cfg.indexing.cache_dir)?;

		Ok(Self {
			store: Arc::new(store),
			engine: Arc::new(engine),
			embedder: Arc::new(embedder),
			cache: Arc::new(cache),
			cfg,
		})
	}

	/// Phase 1: stream pending documents and fill the embedding cache.
	pub async fn phase1(
		&self,
		limit: usize,
		reindex_all: bool,
		workers: Option<usize>,
		cancel: watch::Receiver<bool>,
	) -> Result<Phase1Report> {
		let total = self.remaining(limit, reindex_all).await?;

		if total == 0 {
			tracing::info!("No documents to index.");

			return Ok(Phase1Report { cached_total: self.cache.count(), ..Default::default() });
		}

		tracing::info!(total, "Phase 1: fetch and embed.");
		self.cache.set_metadata(total, reindex_all);

		let docs = self.store.stream_to_index(reindex_all, limit).await?;
		let mut opts = Phase1Options::from_config(&self.cfg, total);

		if let Some(workers) = workers {
			opts.workers = workers;
		}

		run_phase1(docs, self.embedder.clone(), self.cache.clone(), opts, cancel).await
	}

	/// Phase 2: bulk-index the cache and back-sync engine ids.
	pub async fn phase2(&self, cancel: watch::Receiver<bool>) -> Result<Phase2Report> {
		let entries = self.cache.entries();

		if entries.is_empty() {
			tracing::info!("Cache is empty. Nothing to index.");

			return Ok(Phase2Report::default());
		}

		tracing::info!(entries = entries.len(), "Phase 2: index and update.");

		run_phase2(
			entries,
			self.engine.clone(),
			self.store.clone(),
			self.cfg.indexing.engine_bulk_size,
			cancel,
		)
		.await
	}

	/// Fully-streaming single-shot run; the cache step is bypassed.
	pub async fn run(
		&self,
		limit: usize,
		reindex_all: bool,
		workers: Option<usize>,
		cancel: watch::Receiver<bool>,
	) -> Result<RunReport> {
		let total = self.remaining(limit, reindex_all).await?;

		if total == 0 {
			tracing::info!("No documents to index.");

			return Ok(RunReport::default());
		}

		tracing::info!(total, "Pipeline mode: fetch, embed, index, and sync run concurrently.");

		let docs = self.store.stream_to_index(reindex_all, limit).await?;
		let mut opts = RunOptions::from_config(&self.cfg, total);

		if let Some(workers) = workers {
			opts.workers = workers;
		}

		run_streaming(
			docs,
			self.embedder.clone(),
			self.engine.clone(),
			self.store.clone(),
			opts,
			cancel,
		)
		.await
	}

	pub async fn create_index(&self) -> Result<bool> {
		let created = self.engine.create_index().await?;

		Ok(created)
	}

	/// Full reindex: drop the index, recreate it, clear cross-reference ids
	/// and the cache, then run both phases with reindex-all.
	pub async fn reindex_full(&self, cancel: watch::Receiver<bool>) -> Result<(Phase1Report, Phase2Report)> {
		self.engine.delete_index().await?;
		self.engine.create_index().await?;

		let cleared = self.store.clear_engine_ids().await?;

		tracing::info!(cleared, "Cleared cross-reference ids.");
		self.cache.clear()?;

		let phase1 = self.phase1(0, true, None, cancel.clone()).await?;
		let phase2 = self.phase2(cancel).await?;

		Ok((phase1, phase2))
	}

	async fn remaining(&self, limit: usize, reindex_all: bool) -> Result<u64> {
		let mut total = self.store.count_to_index(reindex_all).await?;

		if limit > 0 {
			total = total.min(limit as u64);
		}

		Ok(total)
	}
}
