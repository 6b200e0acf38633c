pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Embedding service unavailable: {message}")]
	EmbeddingUnavailable { message: String },
	#[error("Engine error: {message}")]
	Engine { message: String },
	#[error("Storage error: {message}")]
	Store { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
}
impl From<folio_storage::Error> for Error {
	fn from(err: folio_storage::Error) -> Self {
		match err {
			folio_storage::Error::NotFound(message) => Self::NotFound { message },
			folio_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			folio_storage::Error::Engine(inner) => Self::Engine { message: inner.to_string() },
			folio_storage::Error::EngineStatus(message) => Self::Engine { message },
			other => Self::Store { message: other.to_string() },
		}
	}
}

impl From<folio_providers::Error> for Error {
	fn from(err: folio_providers::Error) -> Self {
		Self::EmbeddingUnavailable { message: err.to_string() }
	}
}
