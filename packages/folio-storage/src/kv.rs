use redis::{AsyncCommands, aio::ConnectionManager};

use crate::Result;

/// Thin handle over the Redis key-value store backing the query-embedding
/// and search-result caches.
#[derive(Clone)]
pub struct KvStore {
	conn: ConnectionManager,
}
impl KvStore {
	pub async fn connect(url: &str) -> Result<Self> {
		let client = redis::Client::open(url)?;
		let conn = client.get_connection_manager().await?;

		Ok(Self { conn })
	}

	pub async fn get(&self, key: &str) -> Result<Option<String>> {
		let mut conn = self.conn.clone();
		let value = conn.get(key).await?;

		Ok(value)
	}

	pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
		let mut conn = self.conn.clone();
		let _: () = conn.set_ex(key, value, ttl_secs).await?;

		Ok(())
	}

	pub async fn ping(&self) -> Result<()> {
		let mut conn = self.conn.clone();
		let _: String = redis::cmd("PING").query_async(&mut conn).await?;

		Ok(())
	}
}
