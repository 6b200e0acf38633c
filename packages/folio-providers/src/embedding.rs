use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::{
	sync::{Mutex, Semaphore},
	time::Instant,
};

use crate::{BoxFuture, EmbeddingProvider, Error, Result};
use folio_storage::kv::KvStore;

/// Upper bound on concurrent requests to the embedding service, regardless
/// of how many pipeline workers are feeding it.
const MAX_IN_FLIGHT: usize = 2;
/// Minimum gap between consecutive requests.
const MIN_REQUEST_GAP: Duration = Duration::from_millis(100);
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(10);
const EMBED_CACHE_NAMESPACE: &str = "embed:";

#[derive(Serialize)]
struct EmbedRequest<'a> {
	texts: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
	embeddings: Vec<Vec<f32>>,
}

/// HTTP client for the remote embedding service with a fixed concurrency
/// cap, request pacing, retry with exponential backoff, and a keyed cache
/// for single-text query embeddings.
pub struct EmbeddingClient {
	http: Client,
	base_url: String,
	max_retries: u32,
	semaphore: Semaphore,
	last_request: Mutex<Option<Instant>>,
	cache: Option<KvStore>,
	cache_ttl_secs: u64,
}
impl EmbeddingClient {
	pub fn new(cfg: &folio_config::Config, cache: Option<KvStore>) -> Result<Self> {
		let http = Client::builder()
			.timeout(Duration::from_secs(cfg.embedding.timeout_secs))
			.build()?;

		Ok(Self {
			http,
			base_url: cfg.embedding.service_url.trim_end_matches('/').to_string(),
			max_retries: cfg.embedding.max_retries,
			semaphore: Semaphore::new(MAX_IN_FLIGHT),
			last_request: Mutex::new(None),
			cache,
			cache_ttl_secs: cfg.search.embed_cache_ttl_secs,
		})
	}

	/// Fetches embeddings for `texts`, preserving order. Retries transport
	/// failures and non-2xx replies.
	pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		// The semaphore lives as long as the client and is never closed.
		let _permit = self.semaphore.acquire().await.map_err(|_| Error::Unavailable {
			message: "embedding client semaphore closed".to_string(),
		})?;

		self.pace().await;

		let mut last_err = None;

		for attempt in 0..self.max_retries {
			match self.request(texts).await {
				Ok(vectors) => return Ok(vectors),
				Err(err) => {
					tracing::warn!(error = %err, attempt, "Embedding request failed.");
					last_err = Some(err);
				},
			}

			if attempt + 1 < self.max_retries {
				tokio::time::sleep(backoff_for_attempt(attempt)).await;
			}
		}

		Err(Error::Unavailable {
			message: format!(
				"failed after {} attempts: {}",
				self.max_retries,
				last_err.map(|err| err.to_string()).unwrap_or_default()
			),
		})
	}

	/// Single-text embedding with a keyed cache. Cache reads and writes are
	/// best-effort; only the remote call itself can fail the operation.
	pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
		let key = embed_cache_key(text);

		if let Some(cache) = &self.cache {
			match cache.get(&key).await {
				Ok(Some(raw)) =>
					if let Ok(vector) = serde_json::from_str::<Vec<f32>>(&raw) {
						return Ok(vector);
					},
				Ok(None) => {},
				Err(err) => {
					tracing::warn!(error = %err, "Embedding cache read failed.");
				},
			}
		}

		let texts = vec![text.to_string()];
		let mut vectors = self.embed(&texts).await?;
		let vector = vectors.pop().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding service returned no vectors.".to_string(),
		})?;

		if let Some(cache) = &self.cache
			&& let Ok(raw) = serde_json::to_string(&vector)
			&& let Err(err) = cache.set_ex(&key, &raw, self.cache_ttl_secs).await
		{
			tracing::warn!(error = %err, "Embedding cache write failed.");
		}

		Ok(vector)
	}

	pub async fn health(&self) -> bool {
		let url = format!("{}/health", self.base_url);

		match self.http.get(url).send().await {
			Ok(response) => response.status().is_success(),
			Err(_) => false,
		}
	}

	async fn pace(&self) {
		let mut last = self.last_request.lock().await;

		if let Some(previous) = *last {
			let elapsed = previous.elapsed();

			if elapsed < MIN_REQUEST_GAP {
				tokio::time::sleep(MIN_REQUEST_GAP - elapsed).await;
			}
		}

		*last = Some(Instant::now());
	}

	async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let url = format!("{}/embed", self.base_url);
		let response =
			self.http.post(url).json(&EmbedRequest { texts }).send().await?.error_for_status()?;
		let parsed: EmbedResponse = response.json().await?;

		if parsed.embeddings.len() != texts.len() {
			return Err(Error::InvalidResponse {
				message: format!(
					"expected {} embeddings, got {}",
					texts.len(),
					parsed.embeddings.len()
				),
			});
		}

		Ok(parsed.embeddings)
	}
}

impl EmbeddingProvider for EmbeddingClient {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(self.embed(texts))
	}

	fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(self.embed_query(text))
	}

	fn health<'a>(&'a self) -> BoxFuture<'a, bool> {
		Box::pin(self.health())
	}
}

fn backoff_for_attempt(attempt: u32) -> Duration {
	let exp = attempt.min(6);

	(BACKOFF_BASE * 2_u32.pow(exp)).min(BACKOFF_CAP)
}

/// `embed:` plus the first 16 hex chars of SHA-256 of the text.
pub fn embed_cache_key(text: &str) -> String {
	let digest = Sha256::digest(text.as_bytes());
	let mut hex = String::with_capacity(16);

	for byte in digest.iter().take(8) {
		hex.push_str(&format!("{byte:02x}"));
	}

	format!("{EMBED_CACHE_NAMESPACE}{hex}")
}
