#[derive(Clone, Debug)]
pub struct Config {
	pub service: Service,
	pub mongo: Mongo,
	pub engine: Engine,
	pub redis: Redis,
	pub embedding: Embedding,
	pub indexing: Indexing,
	pub search: Search,
}

#[derive(Clone, Debug)]
pub struct Service {
	pub host: String,
	pub port: u16,
}

#[derive(Clone, Debug)]
pub struct Mongo {
	pub uri: String,
	pub collection: String,
	pub people_collection: String,
	/// Post-write throttle for bulk id back-sync, in milliseconds.
	pub bulk_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Engine {
	pub hosts: Vec<String>,
	pub user: String,
	pub password: String,
	pub index: String,
	pub verify_certs: bool,
}

#[derive(Clone, Debug)]
pub struct Redis {
	pub url: String,
}

#[derive(Clone, Debug)]
pub struct Embedding {
	pub service_url: String,
	pub timeout_secs: u64,
	pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct Indexing {
	pub mongo_batch_size: usize,
	pub embed_batch_size: usize,
	pub engine_bulk_size: usize,
	pub num_workers: usize,
	pub cache_dir: String,
}

#[derive(Clone, Debug)]
pub struct Search {
	pub result_cache_ttl_secs: u64,
	pub embed_cache_ttl_secs: u64,
	pub related_people_enabled: bool,
}
