mod types;

pub use types::{Config, Embedding, Engine, Indexing, Mongo, Redis, Search, Service};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid configuration: {0}")]
	Invalid(String),
}

impl Config {
	/// Builds the configuration from process environment variables,
	/// falling back to the documented defaults.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let cfg = Self {
			service: Service {
				host: string(&lookup, "HOST", "0.0.0.0"),
				port: parse(&lookup, "PORT", 3000)?,
			},
			mongo: Mongo {
				uri: string(&lookup, "MONGODB_URI", "mongodb://localhost:27017/research_db"),
				collection: string(&lookup, "MONGODB_COLLECTION", "research_papers"),
				people_collection: string(&lookup, "MONGODB_PEOPLE_COLLECTION", "people"),
				bulk_delay_ms: parse(&lookup, "MONGO_BULK_DELAY_MS", 50)?,
			},
			engine: Engine {
				hosts: string(&lookup, "OPENSEARCH_HOSTS", "https://localhost:9200")
					.split(',')
					.map(|host| host.trim().to_string())
					.filter(|host| !host.is_empty())
					.collect(),
				user: string(&lookup, "OPENSEARCH_USER", "admin"),
				password: string(&lookup, "OPENSEARCH_PASSWORD", "admin"),
				index: string(&lookup, "OPENSEARCH_INDEX", "research_documents"),
				verify_certs: flag(&lookup, "OPENSEARCH_VERIFY_CERTS", false),
			},
			redis: Redis { url: string(&lookup, "REDIS_URL", "redis://localhost:6379") },
			embedding: Embedding {
				service_url: string(&lookup, "EMBEDDING_SERVICE_URL", "http://localhost:8001"),
				timeout_secs: parse(&lookup, "EMBEDDING_TIMEOUT", 60)?,
				max_retries: parse(&lookup, "MAX_RETRIES", 3)?,
			},
			indexing: Indexing {
				mongo_batch_size: parse(&lookup, "MONGO_BATCH_SIZE", 100)?,
				embed_batch_size: parse(&lookup, "EMBED_BATCH_SIZE", 128)?,
				engine_bulk_size: parse(&lookup, "OPENSEARCH_BULK_SIZE", 100)?,
				num_workers: parse(&lookup, "NUM_WORKERS", 8)?,
				cache_dir: string(&lookup, "CACHE_DIR", ".cache"),
			},
			search: Search {
				result_cache_ttl_secs: parse(&lookup, "RESULT_CACHE_TTL_SECS", 300)?,
				embed_cache_ttl_secs: parse(&lookup, "EMBED_CACHE_TTL_SECS", 86_400)?,
				related_people_enabled: flag(&lookup, "RELATED_PEOPLE_ENABLED", false),
			},
		};

		validate(&cfg)?;

		Ok(cfg)
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.mongo.uri.trim().is_empty() {
		return Err(Error::Invalid("MONGODB_URI must be non-empty.".to_string()));
	}
	if cfg.mongo.collection.trim().is_empty() {
		return Err(Error::Invalid("MONGODB_COLLECTION must be non-empty.".to_string()));
	}
	if cfg.engine.hosts.is_empty() {
		return Err(Error::Invalid("OPENSEARCH_HOSTS must list at least one node.".to_string()));
	}
	if cfg.engine.index.trim().is_empty() {
		return Err(Error::Invalid("OPENSEARCH_INDEX must be non-empty.".to_string()));
	}
	if cfg.embedding.service_url.trim().is_empty() {
		return Err(Error::Invalid("EMBEDDING_SERVICE_URL must be non-empty.".to_string()));
	}
	if cfg.embedding.timeout_secs == 0 {
		return Err(Error::Invalid("EMBEDDING_TIMEOUT must be greater than zero.".to_string()));
	}
	if cfg.embedding.max_retries == 0 {
		return Err(Error::Invalid("MAX_RETRIES must be greater than zero.".to_string()));
	}
	if cfg.indexing.mongo_batch_size == 0 {
		return Err(Error::Invalid("MONGO_BATCH_SIZE must be greater than zero.".to_string()));
	}
	if cfg.indexing.embed_batch_size == 0 {
		return Err(Error::Invalid("EMBED_BATCH_SIZE must be greater than zero.".to_string()));
	}
	if cfg.indexing.engine_bulk_size == 0 {
		return Err(Error::Invalid("OPENSEARCH_BULK_SIZE must be greater than zero.".to_string()));
	}
	if cfg.indexing.num_workers == 0 {
		return Err(Error::Invalid("NUM_WORKERS must be greater than zero.".to_string()));
	}
	if cfg.indexing.cache_dir.trim().is_empty() {
		return Err(Error::Invalid("CACHE_DIR must be non-empty.".to_string()));
	}
	if cfg.search.result_cache_ttl_secs == 0 {
		return Err(Error::Invalid("RESULT_CACHE_TTL_SECS must be greater than zero.".to_string()));
	}
	if cfg.search.embed_cache_ttl_secs == 0 {
		return Err(Error::Invalid("EMBED_CACHE_TTL_SECS must be greater than zero.".to_string()));
	}

	Ok(())
}

fn string<F>(lookup: &F, key: &str, default: &str) -> String
where
	F: Fn(&str) -> Option<String>,
{
	match lookup(key) {
		Some(value) if !value.trim().is_empty() => value,
		_ => default.to_string(),
	}
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
	F: Fn(&str) -> Option<String>,
{
	match lookup(key) {
		Some(value) => value.trim().eq_ignore_ascii_case("true"),
		None => default,
	}
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
	F: Fn(&str) -> Option<String>,
	T: std::str::FromStr,
{
	match lookup(key) {
		Some(value) if !value.trim().is_empty() => value
			.trim()
			.parse()
			.map_err(|_| Error::Invalid(format!("{key} must be a valid number, got {value:?}."))),
		_ => Ok(default),
	}
}
