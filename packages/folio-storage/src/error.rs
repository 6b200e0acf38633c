pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Mongo(#[from] mongodb::error::Error),
	#[error(transparent)]
	Engine(#[from] Box<opensearch::Error>),
	#[error("Engine request failed: {0}")]
	EngineStatus(String),
	#[error(transparent)]
	Kv(#[from] redis::RedisError),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("Cache codec failure: {0}")]
	Codec(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
}
impl From<opensearch::Error> for Error {
	fn from(err: opensearch::Error) -> Self {
		Self::Engine(Box::new(err))
	}
}
