use std::collections::HashMap;

use opensearch::{
	BulkParts, OpenSearch, SearchParts,
	auth::Credentials,
	cert::CertificateValidation,
	cluster::ClusterHealthParts,
	http::{
		Url,
		request::JsonBody,
		transport::{SingleNodeConnectionPool, TransportBuilder},
	},
	indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts},
	params::Refresh,
};
use serde_json::Value;

use crate::{Error, Result, schema};
use folio_domain::EngineDocument;

/// Wrapper around the OpenSearch engine.
pub struct EngineStore {
	client: OpenSearch,
	pub index: String,
}
impl EngineStore {
	pub fn connect(cfg: &folio_config::Config) -> Result<Self> {
		let host = cfg.engine.hosts.first().ok_or_else(|| {
			Error::InvalidArgument("OPENSEARCH_HOSTS must list at least one node.".to_string())
		})?;
		let url = Url::parse(host)
			.map_err(|err| Error::InvalidArgument(format!("Invalid engine host {host:?}: {err}")))?;
		let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url)).auth(
			Credentials::Basic(cfg.engine.user.clone(), cfg.engine.password.clone()),
		);

		if !cfg.engine.verify_certs {
			builder = builder.cert_validation(CertificateValidation::None);
		}

		let transport =
			builder.build().map_err(|err| Error::EngineStatus(err.to_string()))?;

		Ok(Self { client: OpenSearch::new(transport), index: cfg.engine.index.clone() })
	}

	/// Indexes one slice of documents as a single bulk request with
	/// immediate refresh. Returns the authoritative-id → engine-id map for
	/// the items the engine accepted with a 2xx status.
	pub async fn bulk_index(&self, docs: &[EngineDocument]) -> Result<HashMap<String, String>> {
		if docs.is_empty() {
			return Ok(HashMap::new());
		}

		let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(docs.len() * 2);

		for doc in docs {
			body.push(serde_json::json!({ "index": {} }).into());
			body.push(
				serde_json::to_value(doc)
					.map_err(|err| Error::Codec(err.to_string()))?
					.into(),
			);
		}

		let response = self
			.client
			.bulk(BulkParts::Index(&self.index))
			.refresh(Refresh::True)
			.body(body)
			.send()
			.await?;
		let status = response.status_code();

		if !status.is_success() {
			return Err(Error::EngineStatus(format!("bulk request returned {status}")));
		}

		let parsed: Value = response.json().await?;
		let mut ids = HashMap::new();
		let items = parsed["items"].as_array().cloned().unwrap_or_default();

		for (doc, item) in docs.iter().zip(items.iter()) {
			let index = &item["index"];
			let accepted =
				index["status"].as_i64().is_some_and(|code| (200..300).contains(&code));

			if accepted && let Some(engine_id) = index["_id"].as_str() {
				ids.insert(doc.mongo_id.clone(), engine_id.to_string());
			}
		}

		Ok(ids)
	}

	/// Executes a raw query body against the paper index.
	pub async fn search(&self, body: Value) -> Result<Value> {
		let response =
			self.client.search(SearchParts::Index(&[&self.index])).body(body).send().await?;
		let status = response.status_code();

		if !status.is_success() {
			let detail = response.text().await.unwrap_or_default();

			return Err(Error::EngineStatus(format!("search returned {status}: {detail}")));
		}

		let parsed = response.json().await?;

		Ok(parsed)
	}

	pub async fn cluster_status(&self) -> Result<String> {
		let response = self.client.cluster().health(ClusterHealthParts::None).send().await?;
		let parsed: Value = response.json().await?;
		let status = parsed["status"].as_str().unwrap_or("unknown").to_string();

		Ok(status)
	}

	/// Idempotent index creation: a no-op when the index already exists.
	pub async fn create_index(&self) -> Result<bool> {
		let exists = self
			.client
			.indices()
			.exists(IndicesExistsParts::Index(&[&self.index]))
			.send()
			.await?;

		if exists.status_code().is_success() {
			tracing::info!(index = %self.index, "Index already exists.");

			return Ok(false);
		}

		let response = self
			.client
			.indices()
			.create(IndicesCreateParts::Index(&self.index))
			.body(schema::index_mapping())
			.send()
			.await?;
		let status = response.status_code();

		if !status.is_success() {
			let detail = response.text().await.unwrap_or_default();

			return Err(Error::EngineStatus(format!("create index returned {status}: {detail}")));
		}

		tracing::info!(index = %self.index, "Created index.");

		Ok(true)
	}

	pub async fn delete_index(&self) -> Result<()> {
		let response = self
			.client
			.indices()
			.delete(IndicesDeleteParts::Index(&[&self.index]))
			.send()
			.await?;
		let status = response.status_code();

		if !status.is_success() && status.as_u16() != 404 {
			let detail = response.text().await.unwrap_or_default();

			return Err(Error::EngineStatus(format!("delete index returned {status}: {detail}")));
		}

		tracing::info!(index = %self.index, "Deleted index.");

		Ok(())
	}
}
