pub mod embedding;

mod error;

pub use embedding::EmbeddingClient;
pub use error::{Error, Result};

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Seam over the remote embedding service so the pipeline and the search
/// orchestrator can run against stubs in tests.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	/// Embeds a batch of texts. The result preserves input order and has
	/// equal length.
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

	/// Embeds a single query text. The default goes through `embed`;
	/// `EmbeddingClient` overrides it with a cached path.
	fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			let texts = vec![text.to_string()];
			let mut vectors = self.embed(&texts).await?;

			vectors.pop().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding service returned no vectors.".to_string(),
			})
		})
	}

	/// Liveness of the backing service. Stubs are always healthy.
	fn health<'a>(&'a self) -> BoxFuture<'a, bool> {
		Box::pin(async { true })
	}
}
