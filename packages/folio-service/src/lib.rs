pub mod documents;
pub mod health;
pub mod query;
pub mod request;
pub mod result_cache;
pub mod search;

mod error;

pub use error::{Error, Result};
pub use request::{SearchField, SearchFilters, SearchRequest, SortMode};
pub use result_cache::ResultCache;
pub use search::{NO_RESULTS_MESSAGE, SearchResponse};

use std::sync::Arc;

use folio_config::Config;
use folio_providers::EmbeddingProvider;
use folio_storage::{db::DocumentStore, engine::EngineStore, kv::KvStore};

/// Top-level query service: owns the store and engine handles, the
/// embedding provider, and the result cache.
pub struct SearchService {
	pub cfg: Config,
	pub store: DocumentStore,
	pub engine: EngineStore,
	pub embedder: Arc<dyn EmbeddingProvider>,
	pub results: ResultCache,
	pub kv: Option<KvStore>,
}
impl SearchService {
	pub fn new(
		cfg: Config,
		store: DocumentStore,
		engine: EngineStore,
		embedder: Arc<dyn EmbeddingProvider>,
		kv: Option<KvStore>,
	) -> Self {
		let results = ResultCache::new(kv.clone(), cfg.search.result_cache_ttl_secs);

		Self { cfg, store, engine, embedder, results, kv }
	}
}
