use std::{
	collections::HashSet,
	fs,
	path::{Path, PathBuf},
	sync::RwLock,
};

use serde::{Serialize, de::DeserializeOwned};
use time::OffsetDateTime;

use crate::{Error, Result};
use folio_domain::{CacheEntry, CacheMetadata};

const CACHE_MAGIC: [u8; 4] = *b"FODC";
const CACHE_VERSION: u32 = 1;
const ENTRIES_FILE: &str = "embeddings.bin";
const METADATA_FILE: &str = "metadata.bin";

/// On-disk checkpoint of fetched documents and their embeddings. Entries
/// are append-only in memory and persisted wholesale by `save`; a
/// write-then-rename keeps a crash from leaving a half-written file in
/// place of a good one.
pub struct DocumentCache {
	dir: PathBuf,
	inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
	metadata: CacheMetadata,
	entries: Vec<CacheEntry>,
	processed: HashSet<String>,
}

impl DocumentCache {
	/// Opens the cache directory and loads any existing checkpoint. A
	/// missing or corrupt checkpoint starts fresh with a warning.
	pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
		let dir = dir.as_ref().to_path_buf();

		fs::create_dir_all(&dir)?;

		let cache = Self { dir, inner: RwLock::new(Inner::default()) };

		cache.load();

		Ok(cache)
	}

	fn entries_path(&self) -> PathBuf {
		self.dir.join(ENTRIES_FILE)
	}

	fn metadata_path(&self) -> PathBuf {
		self.dir.join(METADATA_FILE)
	}

	fn load(&self) {
		let metadata: CacheMetadata = match read_blob(&self.metadata_path()) {
			Ok(Some(metadata)) => metadata,
			Ok(None) => return,
			Err(err) => {
				tracing::warn!(error = %err, "Cache metadata unreadable. Starting fresh.");

				return;
			},
		};
		let entries: Vec<CacheEntry> = match read_blob(&self.entries_path()) {
			Ok(Some(entries)) => entries,
			Ok(None) => return,
			Err(err) => {
				tracing::warn!(error = %err, "Cache entries unreadable. Starting fresh.");

				return;
			},
		};
		let processed = entries.iter().map(|entry| entry.mongo_id.clone()).collect();
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());

		inner.metadata = metadata;
		inner.entries = entries;
		inner.processed = processed;
	}

	pub fn save(&self) -> Result<()> {
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());

		inner.metadata.version = CACHE_VERSION;
		inner.metadata.last_modified = now_unix();

		write_blob(&self.metadata_path(), &inner.metadata)?;
		write_blob(&self.entries_path(), &inner.entries)?;

		Ok(())
	}

	pub fn add_entry(&self, entry: CacheEntry) {
		self.add_entries(vec![entry]);
	}

	/// Appends entries. The processed set is updated in the same critical
	/// section, so `is_processed` is true for every appended id before any
	/// reader observes the new entries.
	pub fn add_entries(&self, entries: Vec<CacheEntry>) {
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());

		for entry in &entries {
			inner.processed.insert(entry.mongo_id.clone());
		}

		inner.entries.extend(entries);
	}

	pub fn is_processed(&self, mongo_id: &str) -> bool {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());

		inner.processed.contains(mongo_id)
	}

	/// Returns a defensive copy of all entries.
	pub fn entries(&self) -> Vec<CacheEntry> {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());

		inner.entries.clone()
	}

	pub fn count(&self) -> usize {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());

		inner.entries.len()
	}

	pub fn set_metadata(&self, total_docs: u64, reindex_all: bool) {
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());

		if inner.metadata.created_at == 0 {
			inner.metadata.created_at = now_unix();
		}

		inner.metadata.total_docs = total_docs;
		inner.metadata.reindex_all = reindex_all;
	}

	pub fn metadata(&self) -> CacheMetadata {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());

		inner.metadata.clone()
	}

	pub fn clear(&self) -> Result<()> {
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());

		inner.metadata = CacheMetadata::default();
		inner.entries.clear();
		inner.processed.clear();

		for path in [self.entries_path(), self.metadata_path()] {
			if let Err(err) = fs::remove_file(&path)
				&& err.kind() != std::io::ErrorKind::NotFound
			{
				return Err(err.into());
			}
		}

		Ok(())
	}

	pub fn exists(&self) -> bool {
		self.entries_path().exists()
	}

	/// Entry count plus on-disk size of the entries blob.
	pub fn stats(&self) -> (usize, u64) {
		let count = self.count();
		let size = fs::metadata(self.entries_path()).map(|meta| meta.len()).unwrap_or(0);

		(count, size)
	}
}

fn write_blob<T: Serialize>(path: &Path, value: &T) -> Result<()> {
	let payload = bincode::serialize(value).map_err(|err| Error::Codec(err.to_string()))?;
	let mut bytes = Vec::with_capacity(payload.len() + 8);

	bytes.extend_from_slice(&CACHE_MAGIC);
	bytes.extend_from_slice(&CACHE_VERSION.to_le_bytes());
	bytes.extend_from_slice(&payload);

	let tmp = path.with_extension("tmp");

	fs::write(&tmp, &bytes)?;
	fs::rename(&tmp, path)?;

	Ok(())
}

fn read_blob<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(err) => return Err(err.into()),
	};

	if bytes.len() < 8 || bytes[..4] != CACHE_MAGIC {
		return Err(Error::Codec(format!("{} is not a cache blob", path.display())));
	}

	let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

	if version != CACHE_VERSION {
		return Err(Error::Codec(format!("unsupported cache version {version}")));
	}

	let value =
		bincode::deserialize(&bytes[8..]).map_err(|err| Error::Codec(err.to_string()))?;

	Ok(Some(value))
}

fn now_unix() -> i64 {
	OffsetDateTime::now_utc().unix_timestamp()
}
