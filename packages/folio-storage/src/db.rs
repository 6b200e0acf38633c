use std::time::Duration;

use futures_util::TryStreamExt;
use mongodb::{
	Client, Collection,
	bson::{Bson, doc, oid::ObjectId},
	options::{UpdateOneModel, WriteModel},
};
use tokio::sync::mpsc;

use crate::{
	Error, Result,
	models::{IdUpdate, Paper, PaperAuthor, Person},
};

/// Wrapper around the authoritative MongoDB store.
pub struct DocumentStore {
	client: Client,
	papers: Collection<Paper>,
	people: Collection<Person>,
	batch_size: usize,
	bulk_delay: Duration,
}
impl DocumentStore {
	pub async fn connect(cfg: &folio_config::Config) -> Result<Self> {
		let client = Client::with_uri_str(&cfg.mongo.uri).await?;
		let database = client.default_database().ok_or_else(|| {
			Error::InvalidArgument("MONGODB_URI must include a database name.".to_string())
		})?;
		let papers = database.collection(&cfg.mongo.collection);
		let people = database.collection(&cfg.mongo.people_collection);

		Ok(Self {
			client,
			papers,
			people,
			batch_size: cfg.indexing.mongo_batch_size,
			bulk_delay: Duration::from_millis(cfg.mongo.bulk_delay_ms),
		})
	}

	pub async fn ping(&self) -> Result<()> {
		self.client.database("admin").run_command(doc! { "ping": 1 }).await?;

		Ok(())
	}

	pub async fn count_to_index(&self, reindex_all: bool) -> Result<u64> {
		let count = self.papers.count_documents(to_index_filter(reindex_all)).await?;

		Ok(count)
	}

	/// Streams documents pending indexing into a bounded channel. The
	/// channel buffer is the only back-pressure; the cursor task ends when
	/// the receiver is dropped.
	pub async fn stream_to_index(
		&self,
		reindex_all: bool,
		limit: usize,
	) -> Result<mpsc::Receiver<Paper>> {
		let mut find = self
			.papers
			.find(to_index_filter(reindex_all))
			.batch_size(self.batch_size as u32);

		if limit > 0 {
			find = find.limit(limit as i64);
		}

		let mut cursor = find.await?;
		let (tx, rx) = mpsc::channel(self.batch_size * 2);

		tokio::spawn(async move {
			loop {
				match cursor.try_next().await {
					Ok(Some(paper)) =>
						if tx.send(paper).await.is_err() {
							return;
						},
					Ok(None) => return,
					Err(err) => {
						tracing::warn!(error = %err, "Document cursor ended early.");

						return;
					},
				}
			}
		});

		Ok(rx)
	}

	pub async fn get(&self, id: &str) -> Result<Option<Paper>> {
		let Ok(oid) = ObjectId::parse_str(id) else {
			return Ok(None);
		};
		let paper = self.papers.find_one(doc! { "_id": oid }).await?;

		Ok(paper)
	}

	/// Batch lookup for hydration. Order of the result is unspecified; the
	/// caller re-emits in engine order.
	pub async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Paper>> {
		let oids: Vec<ObjectId> =
			ids.iter().filter_map(|id| ObjectId::parse_str(id).ok()).collect();

		if oids.is_empty() {
			return Ok(Vec::new());
		}

		let cursor = self.papers.find(doc! { "_id": { "$in": oids } }).await?;
		let papers = cursor.try_collect().await?;

		Ok(papers)
	}

	pub async fn fetch_by_author(
		&self,
		author_id: &str,
		page: u64,
		per_page: u64,
	) -> Result<(Vec<Paper>, u64)> {
		let filter = doc! { "authors.author_id": author_id };
		let total = self.papers.count_documents(filter.clone()).await?;
		let cursor = self
			.papers
			.find(filter)
			.sort(doc! { "publication_year": -1 })
			.skip(page.saturating_sub(1) * per_page)
			.limit(per_page as i64)
			.await?;
		let papers = cursor.try_collect().await?;

		Ok((papers, total))
	}

	/// Back-syncs engine ids onto the authoritative records as one unordered
	/// bulk write, then sleeps for the configured free-tier throttle.
	pub async fn set_engine_ids(&self, updates: &[IdUpdate]) -> Result<()> {
		if updates.is_empty() {
			return Ok(());
		}

		let namespace = self.papers.namespace();
		let models: Vec<WriteModel> = updates
			.iter()
			.map(|update| {
				WriteModel::UpdateOne(
					UpdateOneModel::builder()
						.namespace(namespace.clone())
						.filter(doc! { "_id": update.mongo_id })
						.update(doc! { "$set": { "open_search_id": &update.engine_id } })
						.build(),
				)
			})
			.collect();

		let result = self.client.bulk_write(models).ordered(false).await;

		// The throttle applies whether the write succeeded or not; a
		// rate-limited failure is exactly the case that needs the pause.
		if !self.bulk_delay.is_zero() {
			tokio::time::sleep(self.bulk_delay).await;
		}

		result?;

		Ok(())
	}

	pub async fn clear_engine_ids(&self) -> Result<u64> {
		let result =
			self.papers.update_many(doc! {}, doc! { "$unset": { "open_search_id": "" } }).await?;

		Ok(result.modified_count)
	}

	/// Looks up people whose email local part matches one of the given
	/// prefixes. Used by the optional related-people enrichment.
	pub async fn people_by_email_prefixes(&self, prefixes: &[String]) -> Result<Vec<Person>> {
		let clauses: Vec<Bson> = prefixes
			.iter()
			.filter(|prefix| !prefix.trim().is_empty())
			.map(|prefix| {
				Bson::Document(doc! {
					"email": { "$regex": format!("^{}@", escape_regex(prefix)) }
				})
			})
			.collect();

		if clauses.is_empty() {
			return Ok(Vec::new());
		}

		let cursor = self.people.find(doc! { "$or": clauses }).await?;
		let people = cursor.try_collect().await?;

		Ok(people)
	}
}

fn to_index_filter(reindex_all: bool) -> mongodb::bson::Document {
	if reindex_all {
		doc! {}
	} else {
		doc! { "open_search_id": { "$in": [Bson::Null, ""] } }
	}
}

fn escape_regex(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if ch.is_ascii_alphanumeric() {
			out.push(ch);
		} else {
			out.push('\\');
			out.push(ch);
		}
	}

	out
}

impl PaperAuthor {
	/// Local part of the author email, if any. Empty emails yield `None`.
	pub fn email_prefix(&self) -> Option<String> {
		let email = self.author_email.trim();

		if email.is_empty() {
			return None;
		}

		email.split('@').next().map(|prefix| prefix.to_string()).filter(|p| !p.is_empty())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn to_index_filter_skips_marked_documents() {
		let filter = to_index_filter(false);

		assert!(filter.get("open_search_id").is_some());
		assert!(to_index_filter(true).is_empty());
	}

	#[test]
	fn escape_regex_neutralizes_metacharacters() {
		assert_eq!(escape_regex("a.b+c"), "a\\.b\\+c");
		assert_eq!(escape_regex("plain123"), "plain123");
	}

	#[test]
	fn email_prefix_strips_domain() {
		let author = PaperAuthor {
			author_email: "j.doe@uni.edu".to_string(),
			..PaperAuthor::default()
		};

		assert_eq!(author.email_prefix().as_deref(), Some("j.doe"));

		let blank = PaperAuthor::default();

		assert_eq!(blank.email_prefix(), None);
	}
}
