use serde::{Deserialize, Serialize};

use crate::SearchService;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthReport {
	pub healthy: bool,
	pub engine: String,
	pub embedding: bool,
	pub cache: bool,
}

impl SearchService {
	/// Liveness of the engine cluster, the embedding endpoint, and the
	/// result-cache store. Engine counts as healthy on green or yellow.
	pub async fn health(&self) -> HealthReport {
		let engine = match self.engine.cluster_status().await {
			Ok(status) => status,
			Err(err) => {
				tracing::warn!(error = %err, "Engine health check failed.");

				"unreachable".to_string()
			},
		};
		let embedding = self.embedder.health().await;
		let cache = match &self.kv {
			Some(kv) => kv.ping().await.is_ok(),
			None => false,
		};
		let engine_ok = matches!(engine.as_str(), "green" | "yellow");

		HealthReport { healthy: engine_ok && embedding, engine, embedding, cache }
	}
}
