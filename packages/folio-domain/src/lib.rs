mod embed_text;
mod engine;
mod paper;

pub use embed_text::embedding_text;
pub use engine::{EngineAuthor, EngineDocument};
pub use paper::{CacheEntry, CacheMetadata, CachedAuthor};

/// Dimensionality of the embedding vector field. Constant across the index.
pub const EMBEDDING_DIM: usize = 768;
