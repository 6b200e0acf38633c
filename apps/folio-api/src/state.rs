use std::sync::Arc;

use folio_providers::EmbeddingClient;
use folio_service::SearchService;
use folio_storage::{db::DocumentStore, engine::EngineStore, kv::KvStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SearchService>,
}
impl AppState {
	pub async fn new(cfg: folio_config::Config) -> color_eyre::Result<Self> {
		let store = DocumentStore::connect(&cfg).await?;
		let engine = EngineStore::connect(&cfg)?;
		let kv = match KvStore::connect(&cfg.redis.url).await {
			Ok(kv) => Some(kv),
			Err(err) => {
				tracing::warn!(error = %err, "Redis unavailable. Caching disabled.");

				None
			},
		};
		let embedder = Arc::new(EmbeddingClient::new(&cfg, kv.clone())?);
		let service = SearchService::new(cfg, store, engine, embedder, kv);

		Ok(Self { service: Arc::new(service) })
	}
}
