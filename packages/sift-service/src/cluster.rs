use std::time::Duration;

use reqwest::{Client, header::AUTHORIZATION};
use serde_json::Value;

use crate::{BoxFuture, Error, Result, SearchCluster};

/// One search hit as returned by the cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
	pub id: String,
	pub score: Option<f64>,
	pub source: Value,
	/// Raw sort values, including the sentinels the cluster uses for missing fields.
	pub sort: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHits {
	pub total: Option<u64>,
	pub hits: Vec<Hit>,
}

/// Talks to an Elasticsearch or OpenSearch cluster over its REST API.
pub struct HttpCluster {
	client: Client,
	url: String,
	api_key: Option<String>,
}
impl HttpCluster {
	pub fn new(cfg: &sift_config::Cluster) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, url: cfg.url.clone(), api_key: cfg.api_key.clone() })
	}

	async fn post(&self, index: &str, endpoint: &str, body: &Value) -> Result<Value> {
		let url = format!("{}/{index}/{endpoint}", self.url);
		let mut request = self.client.post(url).json(body);

		if let Some(api_key) = self.api_key.as_deref() {
			request = request.header(AUTHORIZATION, format!("ApiKey {api_key}"));
		}

		let res = request.send().await?;
		let status = res.status();

		if !status.is_success() {
			let text = res.text().await.unwrap_or_default();

			tracing::warn!(%status, index, endpoint, "Cluster rejected the request.");

			return Err(Error::Cluster { message: format!("Cluster returned {status}: {text}") });
		}

		Ok(res.json().await?)
	}
}

impl SearchCluster for HttpCluster {
	fn search<'a>(&'a self, index: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value>> {
		Box::pin(self.post(index, "_search", body))
	}

	fn count<'a>(&'a self, index: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value>> {
		Box::pin(self.post(index, "_count", body))
	}
}

pub fn parse_search_response(json: &Value) -> Result<SearchHits> {
	let hits = json.get("hits").ok_or_else(|| Error::Cluster {
		message: "Search response is missing hits.".to_string(),
	})?;
	let total = match hits.get("total") {
		Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
		Some(other) => other.as_u64(),
		None => None,
	};
	let items = hits.get("hits").and_then(Value::as_array).ok_or_else(|| Error::Cluster {
		message: "Search response is missing the hits array.".to_string(),
	})?;
	let mut parsed = Vec::with_capacity(items.len());

	for item in items {
		let id = match item.get("_id") {
			Some(Value::String(id)) => id.clone(),
			_ => {
				return Err(Error::Cluster { message: "Search hit is missing _id.".to_string() });
			},
		};

		parsed.push(Hit {
			id,
			score: item.get("_score").and_then(Value::as_f64),
			source: item.get("_source").cloned().unwrap_or(Value::Null),
			sort: item.get("sort").and_then(Value::as_array).cloned().unwrap_or_default(),
		});
	}

	Ok(SearchHits { total, hits: parsed })
}

pub fn parse_count_response(json: &Value) -> Result<u64> {
	json.get("count").and_then(Value::as_u64).ok_or_else(|| Error::Cluster {
		message: "Count response is missing count.".to_string(),
	})
}
